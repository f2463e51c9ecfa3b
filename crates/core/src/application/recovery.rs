// Startup recovery
//
// A daemon crash mid-analysis leaves jobs in Processing with no worker
// attached. On boot, those jobs are failed outright: the client polling
// them gets a clear message instead of an eternal "processing". Pending
// jobs survive restarts untouched and are picked up by the worker loop.

use crate::domain::JobStatus;
use crate::port::{JobRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

const RESTART_ERROR_MESSAGE: &str = "analysis interrupted by service restart";

pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RecoveryService {
    pub fn new(job_repo: Arc<dyn JobRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            job_repo,
            time_provider,
        }
    }

    /// Fail every job left in Processing by a previous process.
    ///
    /// # Returns
    /// Number of jobs recovered
    pub async fn recover_interrupted_jobs(&self) -> crate::error::Result<usize> {
        let orphaned = self.job_repo.find_by_status(JobStatus::Processing).await?;
        let now = self.time_provider.now_millis();
        let mut recovered = 0;

        for job in orphaned {
            warn!(
                job_id = %job.id,
                started_at = ?job.started_at,
                "Failing analysis job orphaned by restart"
            );
            self.job_repo
                .fail(&job.id, RESTART_ERROR_MESSAGE, now)
                .await?;
            recovered += 1;
        }

        info!(recovered_jobs = recovered, "Startup recovery complete");
        Ok(recovered)
    }
}
