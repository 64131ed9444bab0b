// src/ingest/scheduler.rs
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Wall-clock source, injectable for tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct IngestSchedulerCfg {
    /// Delay before the first run after startup.
    pub startup_delay: Duration,
}

impl Default for IngestSchedulerCfg {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(5),
        }
    }
}

/// Next `:00:00` strictly after `now` (cron `0 * * * *`).
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = ChronoDuration::hours(1);
    let floored = now.duration_trunc(hour).unwrap_or(now);
    floored + hour
}

/// Owns the scheduler task. Dropping the handle detaches the task; it keeps
/// firing until the process exits or [`SchedulerHandle::abort`] is called.
#[derive(Debug)]
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the ingestion schedule: one run after `cfg.startup_delay`, then one
/// at the top of every hour as seen by `clock`.
pub fn start_scheduler<F, Fut>(
    ingest: F,
    clock: Arc<dyn Clock>,
    cfg: IngestSchedulerCfg,
) -> SchedulerHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(cfg.startup_delay).await;
        tracing::info!(target: "ingest", "startup ingestion run");
        ingest().await;

        // Targets strictly increase, even when the wall clock lags the timer.
        let mut last_target: Option<DateTime<Utc>> = None;
        loop {
            let now = clock.now();
            let next = next_top_of_hour(last_target.map_or(now, |t| now.max(t)));
            last_target = Some(next);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(target: "ingest", next = %next, wait_secs = wait.as_secs(), "next ingestion scheduled");
            tokio::time::sleep(wait).await;
            tracing::info!(target: "ingest", "scheduled ingestion run");
            ingest().await;
        }
    });
    SchedulerHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_top_of_hour_is_strictly_later() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 59, 30).unwrap();
        assert_eq!(next_top_of_hour(t), Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap());

        let exact = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(next_top_of_hour(exact), Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        let eod = Utc.with_ymd_and_hms(2024, 12, 31, 23, 15, 0).unwrap();
        assert_eq!(next_top_of_hour(eod), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }
}
