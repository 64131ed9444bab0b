use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::ingest;
use crate::ingest::config::IngestConfig;
use crate::ingest::providers::{reddit::RedditProvider, seed::SeedProvider};
use crate::ingest::types::{Sentiment, SourceProvider};
use crate::market::{self, CoinGeckoClient, Cryptocurrency, MarketProvider, PricePoint};
use crate::storage::{ArticleFilter, MemoryStorage, RedditPost, Storage, StoredArticle};

const MAX_NEWS_PAGE: usize = 30;
const REDDIT_PAGE: usize = 10;
const DEFAULT_SUBREDDIT: &str = "cryptocurrency";

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub market: Arc<dyn MarketProvider>,
    pub reddit: Arc<RedditProvider>,
    pub config: Arc<IngestConfig>,
}

impl AppState {
    /// Live HTTP clients over fresh in-memory storage.
    pub fn from_config(config: IngestConfig) -> anyhow::Result<Self> {
        let timeout = config.http_timeout();
        let market = CoinGeckoClient::from_url(&config.coingecko_base_url, timeout)?;
        let reddit = RedditProvider::from_url(&config.reddit_base_url, &config.subreddit, timeout)?;
        Ok(Self {
            storage: Arc::new(MemoryStorage::new()),
            market: Arc::new(market),
            reddit: Arc::new(reddit),
            config: Arc::new(config),
        })
    }
}

/// JSON error body `{ "message": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(news).fallback(method_not_allowed))
        .route("/api/reddit", get(reddit_posts).fallback(method_not_allowed))
        .route(
            "/api/cryptocurrencies",
            get(cryptocurrencies).fallback(method_not_allowed),
        )
        .route(
            "/api/cryptocurrencies/{id}/chart",
            get(chart).fallback(method_not_allowed),
        )
        .route("/api/status", get(status).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    source: Option<String>,
    category: Option<String>,
    sentiment: Option<String>,
    limit: Option<String>,
}

async fn news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
) -> ApiResult<Vec<StoredArticle>> {
    let any = state
        .storage
        .get_articles(1, &ArticleFilter::default())
        .await
        .map_err(|e| {
            tracing::error!(target: "api", error = ?e, "reading articles failed");
            ApiError::internal("Failed to fetch news")
        })?;
    if any.is_empty() {
        let seed = SeedProvider;
        match seed.fetch_latest().await {
            Ok(articles) => {
                let rows = ingest::persist_articles(seed.name(), articles, state.storage.as_ref()).await;
                tracing::info!(target: "api", seeded = rows.len(), "seeded empty article store");
            }
            Err(e) => tracing::warn!(target: "api", error = ?e, "seed provider failed"),
        }
    }

    let sentiment = match q.sentiment.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(Sentiment::parse(raw).ok_or_else(|| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Unknown sentiment: {raw}"))
        })?),
        None => None,
    };
    let filter = ArticleFilter {
        source: q.source.filter(|s| !s.trim().is_empty()),
        category: q.category.filter(|s| !s.trim().is_empty()),
        sentiment,
    };
    let limit = match q.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid limit: {raw}"))
        })?,
        None => state.config.news_page_size,
    }
    .clamp(1, MAX_NEWS_PAGE);

    let rows = state.storage.get_articles(limit, &filter).await.map_err(|e| {
        tracing::error!(target: "api", error = ?e, "reading articles failed");
        ApiError::internal("Failed to fetch news")
    })?;
    Ok(Json(rows))
}

#[derive(Debug, Default, Deserialize)]
pub struct RedditQuery {
    subreddit: Option<String>,
}

async fn reddit_posts(
    State(state): State<AppState>,
    Query(q): Query<RedditQuery>,
) -> ApiResult<Vec<RedditPost>> {
    let subreddit = q
        .subreddit
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SUBREDDIT.to_string());
    if !subreddit
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid subreddit"));
    }

    let live_ok = match state.reddit.fetch_posts(&subreddit).await {
        Ok(posts) => {
            for p in posts {
                if let Err(e) = state.storage.upsert_reddit_post(p).await {
                    tracing::warn!(target: "api", error = ?e, "storing reddit post failed");
                }
            }
            true
        }
        Err(e) => {
            tracing::warn!(target: "api", error = ?e, %subreddit, "reddit fetch failed; serving stored posts");
            false
        }
    };

    let rows = state
        .storage
        .get_reddit_posts(&subreddit, REDDIT_PAGE)
        .await
        .map_err(|e| {
            tracing::error!(target: "api", error = ?e, "reading reddit posts failed");
            ApiError::internal("Failed to fetch Reddit posts")
        })?;
    if rows.is_empty() && !live_ok {
        return Err(ApiError::internal("Failed to fetch Reddit posts"));
    }
    Ok(Json(rows))
}

async fn cryptocurrencies(State(state): State<AppState>) -> ApiResult<Vec<Cryptocurrency>> {
    match state.market.fetch_markets(state.config.market_limit).await {
        Ok(coins) => {
            for c in coins.into_iter().filter(|c| !market::is_excluded(&c.id)) {
                if let Err(e) = state.storage.upsert_cryptocurrency(c).await {
                    tracing::warn!(target: "api", error = ?e, "storing market row failed");
                }
            }
        }
        Err(e) => {
            tracing::warn!(target: "api", error = ?e, provider = state.market.name(), "market fetch failed; serving stored rows");
            let cached = state.storage.get_cryptocurrencies().await.unwrap_or_else(|e| {
                tracing::error!(target: "api", error = ?e, "reading cached market rows failed");
                Vec::new()
            });
            if cached.is_empty() {
                return Err(ApiError::internal("Failed to fetch cryptocurrency data"));
            }
            return Ok(Json(cached));
        }
    }

    let rows = state.storage.get_cryptocurrencies().await.map_err(|e| {
        tracing::error!(target: "api", error = ?e, "reading market rows failed");
        ApiError::internal("Failed to fetch cryptocurrency data")
    })?;
    Ok(Json(rows))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    days: Option<String>,
}

async fn chart(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ChartQuery>,
) -> ApiResult<Vec<PricePoint>> {
    let days = market::validate_days(q.days.as_deref())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid coin id"));
    }
    let points = state.market.fetch_chart(&id, &days).await.map_err(|e| {
        tracing::warn!(target: "api", error = ?e, %id, %days, "chart fetch failed");
        ApiError::internal("Failed to fetch chart data")
    })?;
    Ok(Json(points))
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cfg = &state.config;
    Json(json!({
        "coingecko": { "connected": true, "baseUrl": cfg.coingecko_base_url },
        "cryptocompare": {
            "connected": true,
            "configured": cfg.has_news_api_key(),
        },
        "reddit": { "connected": true, "subreddit": cfg.subreddit },
        "storage": { "kind": "memory" },
        "timestamp": chrono::Utc::now(),
    }))
}
