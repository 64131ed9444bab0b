// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod ingest;
pub mod market;
pub mod metrics;
pub mod storage;

pub use crate::api::{router, AppState};

use std::sync::Arc;

use crate::ingest::config::IngestConfig;
use crate::ingest::scheduler::{start_scheduler, IngestSchedulerCfg, SchedulerHandle, SystemClock};

/// Start the hourly news ingestion against `state.storage` using live providers.
///
/// Example usage inside the Shuttle entrypoint:
/// ```ignore
/// let state = AppState::from_config(cfg.clone())?;
/// let _scheduler = crypto_news_pipeline::spawn_news_ingestion(&cfg, &state)?;
/// ```
pub fn spawn_news_ingestion(cfg: &IngestConfig, state: &AppState) -> anyhow::Result<SchedulerHandle> {
    let providers = Arc::new(ingest::providers::default_providers(cfg)?);
    let storage = state.storage.clone();
    let handle = start_scheduler(
        move || {
            let providers = providers.clone();
            let storage = storage.clone();
            async move {
                ingest::run_ingestion(&providers, storage.as_ref()).await;
            }
        },
        Arc::new(SystemClock),
        IngestSchedulerCfg {
            startup_delay: cfg.startup_delay(),
        },
    );
    Ok(handle)
}
