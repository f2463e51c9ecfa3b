// Processing-timeout watchdog
//
// An analysis call that never returns would otherwise leave its job in
// Processing forever. The watchdog periodically force-fails jobs whose
// `started_at` is older than the configured maximum. The repository's
// conditional update keeps this race-free against a finishing worker:
// whichever terminal write lands first wins.

use crate::application::worker::constants::{
    DEFAULT_MAX_PROCESSING_MS, DEFAULT_WATCHDOG_SWEEP_INTERVAL,
};
use crate::application::worker::ShutdownToken;
use crate::port::{JobRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub struct Watchdog {
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
    max_processing_ms: i64,
    sweep_interval: Duration,
}

impl Watchdog {
    /// Create a watchdog.
    ///
    /// # Arguments
    /// * `max_processing_ms` - Optional custom processing ceiling (default: 5 minutes)
    /// * `sweep_interval` - Optional custom sweep interval (default: 30 seconds)
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
        max_processing_ms: Option<i64>,
        sweep_interval: Option<Duration>,
    ) -> Self {
        Self {
            job_repo,
            time_provider,
            max_processing_ms: max_processing_ms.unwrap_or(DEFAULT_MAX_PROCESSING_MS),
            sweep_interval: sweep_interval.unwrap_or(DEFAULT_WATCHDOG_SWEEP_INTERVAL),
        }
    }

    /// Run sweep loop (background task)
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            max_processing_ms = self.max_processing_ms,
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            "Watchdog started"
        );

        loop {
            tokio::select! {
                _ = sleep(self.sweep_interval) => {},
                _ = shutdown.wait() => {
                    info!("Watchdog shutting down");
                    break;
                }
            }

            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "Watchdog sweep failed");
            }
        }
    }

    /// Force-fail every over-age Processing job. Returns how many were failed.
    pub async fn sweep_once(&self) -> crate::error::Result<u64> {
        let now = self.time_provider.now_millis();
        let cutoff = now - self.max_processing_ms;

        let failed = self
            .job_repo
            .fail_stuck_processing(
                cutoff,
                now,
                &format!("analysis timed out after {}ms", self.max_processing_ms),
            )
            .await?;

        if failed > 0 {
            warn!(timed_out_jobs = failed, cutoff = cutoff, "Watchdog failed stuck jobs");
        }

        Ok(failed)
    }
}
