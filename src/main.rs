//! Crypto news & market API: binary entrypoint.
//! Boots the Axum HTTP server, the hourly news ingestion, and `/metrics`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_news_pipeline::ingest::config::load_config_default;
use crypto_news_pipeline::metrics::Metrics;
use crypto_news_pipeline::{router, spawn_news_ingestion, AppState};

/// Structured logs: `LOG_FORMAT=json` for JSON lines, compact text otherwise.
/// Filter comes from `RUST_LOG`, defaulting to `ingest=info,api=info,warn`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,api=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may have installed a subscriber already.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = load_config_default()?;
    tracing::info!(
        target: "api",
        subreddit = %cfg.subreddit,
        news_key = cfg.has_news_api_key(),
        "config loaded"
    );

    let metrics = Metrics::init()?;
    let state = AppState::from_config(cfg.clone())?;

    // Detached on drop: the schedule runs for the life of the process.
    let _scheduler = spawn_news_ingestion(&cfg, &state)?;

    let app = router(state).merge(metrics.router());
    Ok(app.into())
}
