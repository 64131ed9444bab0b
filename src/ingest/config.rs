// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PATH: &str = "INGEST_CONFIG_PATH";
const ENV_API_KEY: &str = "CRYPTOCOMPARE_API_KEY";
const ENV_API_KEY_LEGACY: &str = "NEWS_API_KEY";

pub const DEMO_API_KEY: &str = "demo";

/// Runtime settings for the ingestion pipeline and the HTTP surface.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub startup_delay_secs: u64,
    pub cryptocompare_base_url: String,
    pub reddit_base_url: String,
    pub coingecko_base_url: String,
    /// Subreddit polled by the scheduled run.
    pub subreddit: String,
    /// Number of market rows requested from CoinGecko.
    pub market_limit: usize,
    pub news_page_size: usize,
    pub http_timeout_secs: u64,
    /// API key for CryptoCompare; env vars override the file value.
    pub news_api_key: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: 5,
            cryptocompare_base_url: "https://min-api.cryptocompare.com".to_string(),
            reddit_base_url: "https://www.reddit.com".to_string(),
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            subreddit: "CryptoCurrency".to_string(),
            market_limit: 50,
            news_page_size: 20,
            http_timeout_secs: 10,
            news_api_key: DEMO_API_KEY.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn has_news_api_key(&self) -> bool {
        !self.news_api_key.is_empty() && self.news_api_key != DEMO_API_KEY
    }

    /// Apply env overrides: `CRYPTOCOMPARE_API_KEY`, then `NEWS_API_KEY`.
    pub fn with_env_overrides(mut self) -> Self {
        let key = std::env::var(ENV_API_KEY)
            .or_else(|_| std::env::var(ENV_API_KEY_LEGACY))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if let Some(k) = key {
            self.news_api_key = k;
        }
        if self.news_api_key.trim().is_empty() {
            self.news_api_key = DEMO_API_KEY.to_string();
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<IngestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading ingest config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks, then apply env overrides:
/// 1) $INGEST_CONFIG_PATH
/// 2) config/ingest.toml
/// 3) config/ingest.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<IngestConfig> {
    let base = if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("INGEST_CONFIG_PATH points to non-existent path"));
        }
        load_config_from(&pb)?
    } else if Path::new("config/ingest.toml").exists() {
        load_config_from(Path::new("config/ingest.toml"))?
    } else if Path::new("config/ingest.json").exists() {
        load_config_from(Path::new("config/ingest.json"))?
    } else {
        IngestConfig::default()
    };
    Ok(base.with_env_overrides())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<IngestConfig> {
    match hint_ext {
        "json" => serde_json::from_str(s).context("parsing ingest config json"),
        "toml" => toml::from_str(s).context("parsing ingest config toml"),
        _ => toml::from_str(s)
            .or_else(|_| serde_json::from_str(s))
            .map_err(|_| anyhow!("unsupported ingest config format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = parse_config(r#"subreddit = "Bitcoin""#, "toml").unwrap();
        assert_eq!(cfg.subreddit, "Bitcoin");
        assert_eq!(cfg.startup_delay_secs, 5);
        assert_eq!(cfg.news_api_key, DEMO_API_KEY);

        let cfg = parse_config(r#"{"market_limit": 10}"#, "json").unwrap();
        assert_eq!(cfg.market_limit, 10);
        assert_eq!(cfg.news_page_size, 20);
    }

    #[test]
    fn unknown_extension_tries_both_formats() {
        let cfg = parse_config(r#"{"news_page_size": 25}"#, "").unwrap();
        assert_eq!(cfg.news_page_size, 25);
        assert!(parse_config("not = [valid", "").is_err());
    }

    #[test]
    fn demo_key_is_not_a_real_key() {
        let cfg = IngestConfig::default();
        assert!(!cfg.has_news_api_key());
        let cfg = IngestConfig {
            news_api_key: "abc123".into(),
            ..IngestConfig::default()
        };
        assert!(cfg.has_news_api_key());
    }
}
