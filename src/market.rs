//! # Market data
//! CoinGecko client used by the price endpoints.
//!
//! - `coins/markets` → [`Cryptocurrency`] rows, minus stablecoins and wrapped tokens.
//! - `coins/{id}/market_chart` → `[{time, price}]` series.
//!
//! Like the news providers, the client runs against live HTTP or a captured
//! payload (fixture), which is what the tests use.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ids never shown on the dashboard: pegged stablecoins and wrapped/staked derivatives.
pub const EXCLUDED_IDS: &[&str] = &[
    "tether",
    "usd-coin",
    "binance-usd",
    "dai",
    "true-usd",
    "first-digital-usd",
    "ethena-usde",
    "usds",
    "paypal-usd",
    "wrapped-bitcoin",
    "weth",
    "staked-ether",
    "wrapped-steth",
    "wrapped-eeth",
    "coinbase-wrapped-btc",
];

pub const DEFAULT_CHART_DAYS: &str = "7";

/// One market row, as stored and served by `/api/cryptocurrencies`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cryptocurrency {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Raw CoinGecko `coins/markets` item (snake_case on the wire).
#[derive(Debug, Deserialize)]
struct MarketItem {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    circulating_supply: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
}

impl From<MarketItem> for Cryptocurrency {
    fn from(m: MarketItem) -> Self {
        Self {
            symbol: m.symbol.to_ascii_uppercase(),
            name: if m.name.is_empty() { m.id.clone() } else { m.name },
            id: m.id,
            image: m.image,
            current_price: m.current_price,
            market_cap: m.market_cap,
            market_cap_rank: m.market_cap_rank,
            total_volume: m.total_volume,
            price_change_percentage_24h: m.price_change_percentage_24h,
            high_24h: m.high_24h,
            low_24h: m.low_24h,
            circulating_supply: m.circulating_supply,
            last_updated: m.last_updated,
        }
    }
}

/// One chart sample: unix milliseconds + USD price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub time: i64,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

pub fn is_excluded(id: &str) -> bool {
    EXCLUDED_IDS.iter().any(|x| x.eq_ignore_ascii_case(id))
}

/// Parse a `coins/markets` body, dropping excluded ids.
pub fn parse_markets(body: &str) -> Result<Vec<Cryptocurrency>> {
    let items: Vec<MarketItem> = serde_json::from_str(body).context("parsing coingecko markets json")?;
    Ok(items
        .into_iter()
        .filter(|m| !is_excluded(&m.id))
        .map(Cryptocurrency::from)
        .collect())
}

/// Parse a `market_chart` body into `{time, price}` points.
pub fn parse_chart(body: &str) -> Result<Vec<PricePoint>> {
    let payload: ChartPayload = serde_json::from_str(body).context("parsing coingecko chart json")?;
    Ok(payload
        .prices
        .into_iter()
        .map(|(t, p)| PricePoint {
            time: t as i64,
            price: p,
        })
        .collect())
}

/// Accept `max` or a positive integer up to 3650.
pub fn validate_days(raw: Option<&str>) -> Result<String> {
    let d = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_CHART_DAYS);
    if d.eq_ignore_ascii_case("max") {
        return Ok("max".to_string());
    }
    match d.parse::<u32>() {
        Ok(n) if (1..=3650).contains(&n) => Ok(n.to_string()),
        _ => bail!("invalid days parameter: {d}"),
    }
}

#[async_trait]
pub trait MarketProvider: Send + Sync {
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<Cryptocurrency>>;
    async fn fetch_chart(&self, id: &str, days: &str) -> Result<Vec<PricePoint>>;
    fn name(&self) -> &'static str {
        "CoinGecko"
    }
}

pub struct CoinGeckoClient {
    mode: Mode,
}

enum Mode {
    Fixture { markets: String, chart: String },
    Http { base_url: String, client: reqwest::Client },
}

impl CoinGeckoClient {
    pub fn from_fixture(markets: &str, chart: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                markets: markets.to_string(),
                chart: chart.to_string(),
            },
        }
    }

    pub fn from_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = crate::ingest::providers::http_client(timeout)?;
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
        })
    }

    async fn get_text(client: &reqwest::Client, url: &str, query: &[(&str, String)]) -> Result<String> {
        let t0 = std::time::Instant::now();
        let resp = client
            .get(url)
            .query(query)
            .send()
            .await
            .context("coingecko http get()")?;
        let resp = resp
            .error_for_status()
            .map_err(|e| anyhow!("coingecko http status: {e}"))?;
        let body = resp.text().await.context("coingecko http .text()")?;
        histogram!("market_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(body)
    }
}

#[async_trait]
impl MarketProvider for CoinGeckoClient {
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<Cryptocurrency>> {
        match &self.mode {
            Mode::Fixture { markets, .. } => {
                let mut rows = parse_markets(markets)?;
                rows.truncate(limit);
                Ok(rows)
            }
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/coins/markets");
                let query = [
                    ("vs_currency", "usd".to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", limit.clamp(1, 250).to_string()),
                    ("page", "1".to_string()),
                    ("sparkline", "false".to_string()),
                    ("price_change_percentage", "24h".to_string()),
                ];
                let body = Self::get_text(client, &url, &query).await?;
                parse_markets(&body)
            }
        }
    }

    async fn fetch_chart(&self, id: &str, days: &str) -> Result<Vec<PricePoint>> {
        match &self.mode {
            Mode::Fixture { chart, .. } => parse_chart(chart),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/coins/{id}/market_chart");
                let query = [
                    ("vs_currency", "usd".to_string()),
                    ("days", days.to_string()),
                ];
                let body = Self::get_text(client, &url, &query).await?;
                parse_chart(&body)
            }
        }
    }
}
