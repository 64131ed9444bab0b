use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use super::{epoch_or, http_client, non_empty};
use crate::ingest::normalize_text;
use crate::ingest::summary::{derive_image_url, derive_summary, truncate_description, DESCRIPTION_MAX_CHARS};
use crate::ingest::types::{Article, Sentiment, SourceProvider};

pub const CATEGORIES: &str = "BTC,ETH,Trading,Blockchain";
pub const EXCLUDE_CATEGORIES: &str = "Sponsored";
pub const MAX_ITEMS: usize = 10;
const LOOKBACK_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Data", default)]
    data: serde_json::Value,
}

/// One item of the `data/v2/news/` response. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct NewsItem {
    pub guid: Option<String>,
    pub published_on: Option<i64>,
    pub imageurl: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub body: Option<String>,
    pub categories: Option<String>,
    pub source: Option<String>,
    pub source_info: Option<SourceInfo>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceInfo {
    pub name: Option<String>,
}

/// Decode the response envelope into at most [`MAX_ITEMS`] items.
pub fn parse_items(body: &str) -> Result<Vec<NewsItem>> {
    let env: Envelope = serde_json::from_str(body).context("parsing cryptocompare json")?;
    if env
        .response
        .as_deref()
        .is_some_and(|r| r.eq_ignore_ascii_case("error"))
    {
        bail!(
            "cryptocompare error: {}",
            env.message.unwrap_or_else(|| "unknown".to_string())
        );
    }
    let mut items: Vec<NewsItem> =
        serde_json::from_value(env.data).context("cryptocompare Data is not a list")?;
    items.truncate(MAX_ITEMS);
    Ok(items)
}

/// Map one provider item to a canonical article. Never fails; gaps get defaults.
pub fn map_item<R: Rng + ?Sized>(item: NewsItem, now: DateTime<Utc>, rng: &mut R) -> Article {
    let title = non_empty(item.title).map(|t| normalize_text(&t)).unwrap_or_default();
    let body = non_empty(item.body).map(|b| normalize_text(&b)).filter(|b| !b.is_empty());
    let url = non_empty(item.url).or(non_empty(item.guid)).unwrap_or_default();
    let source = item
        .source_info
        .and_then(|s| non_empty(s.name))
        .or(non_empty(item.source))
        .unwrap_or_else(|| "CryptoCompare".to_string());
    let image_url = non_empty(item.imageurl)
        .unwrap_or_else(|| derive_image_url(&title, rng).to_string());
    let summary = derive_summary(body.as_deref(), Some(&title));
    let description = truncate_description(body.as_deref().unwrap_or(&summary), DESCRIPTION_MAX_CHARS);
    let category = item
        .categories
        .as_deref()
        .and_then(|c| c.split('|').map(str::trim).find(|c| !c.is_empty()))
        .map(str::to_string);
    let sentiment = item
        .sentiment
        .as_deref()
        .and_then(Sentiment::parse)
        .unwrap_or_default();

    Article {
        title,
        description,
        content: body,
        url,
        source,
        author: None,
        published_at: epoch_or(item.published_on, now),
        image_url,
        sentiment,
        category,
        summary,
    }
}

/// Query string of the news request: English, allow-listed categories, last hour only.
pub fn news_query(now: DateTime<Utc>, api_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("lang", "EN".to_string()),
        ("categories", CATEGORIES.to_string()),
        ("excludeCategories", EXCLUDE_CATEGORIES.to_string()),
        ("lTs", (now.timestamp() - LOOKBACK_SECS).to_string()),
        ("api_key", api_key.to_string()),
    ]
}

pub struct CryptoCompareProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl CryptoCompareProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
                client: http_client(timeout)?,
            },
        })
    }

    fn articles_from_str(s: &str) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let items = parse_items(s)?;
        let now = Utc::now();
        let mut rng = rand::rng();
        let out: Vec<Article> = items
            .into_iter()
            .map(|it| map_item(it, now, &mut rng))
            .collect();

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for CryptoCompareProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => Self::articles_from_str(s),
            Mode::Http {
                base_url,
                api_key,
                client,
            } => {
                let url = format!("{base_url}/data/v2/news/");
                let body = client
                    .get(&url)
                    .query(&news_query(Utc::now(), api_key))
                    .send()
                    .await
                    .context("cryptocompare http get()")?
                    .error_for_status()
                    .context("cryptocompare http status")?
                    .text()
                    .await
                    .context("cryptocompare http .text()")?;
                Self::articles_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "CryptoCompare"
    }
}
