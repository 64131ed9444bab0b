// src/ingest/providers/mod.rs
pub mod cryptocompare;
pub mod reddit;
pub mod seed;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::ingest::config::IngestConfig;
use crate::ingest::types::SourceProvider;

pub const USER_AGENT: &str = "crypto-news-pipeline/0.1 (news aggregation bot)";

/// Shared outbound client: fixed user agent plus connect/request timeouts.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4).min(timeout))
        .timeout(timeout)
        .build()
        .context("building reqwest client")
}

/// Providers of the scheduled run, in run order.
pub fn default_providers(cfg: &IngestConfig) -> Result<Vec<Box<dyn SourceProvider>>> {
    let timeout = cfg.http_timeout();
    Ok(vec![
        Box::new(cryptocompare::CryptoCompareProvider::from_url(
            &cfg.cryptocompare_base_url,
            &cfg.news_api_key,
            timeout,
        )?),
        Box::new(reddit::RedditProvider::from_url(
            &cfg.reddit_base_url,
            &cfg.subreddit,
            timeout,
        )?),
    ])
}

/// Unix seconds → UTC, falling back to `now` for missing or nonsensical values.
pub(crate) fn epoch_or(secs: Option<i64>, now: DateTime<Utc>) -> DateTime<Utc> {
    secs.filter(|s| *s > 0)
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .unwrap_or(now)
}

pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
