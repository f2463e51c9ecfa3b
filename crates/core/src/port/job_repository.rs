// Job Repository Port (Interface)

use crate::domain::{AnalysisJob, ClassId, JobId, JobStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for AnalysisJob persistence (the Job Store)
///
/// All writes that change `status` are conditional updates: a job can
/// only move forward through the state machine, and the
/// `pending -> processing` claim happens at most once per job even
/// with concurrent claimers.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new pending job
    async fn insert(&self, job: &AnalysisJob) -> Result<()>;

    /// Find job by ID (unscoped; internal use)
    async fn find_by_id(&self, id: &JobId) -> Result<Option<AnalysisJob>>;

    /// Find job by ID within an owner context (status lookups)
    async fn find_in_class(&self, id: &JobId, class_id: &ClassId) -> Result<Option<AnalysisJob>>;

    /// Atomically claim the oldest pending job, transitioning it to
    /// Processing and recording `started_at`. Returns None when no
    /// pending job exists or another claimer won the race.
    async fn claim_next(&self, now_millis: i64) -> Result<Option<AnalysisJob>>;

    /// Transition a Processing job to Completed, recording the result.
    /// Fails with InvalidState if the job is not Processing.
    async fn complete(&self, id: &JobId, result: &str, finished_at: i64) -> Result<()>;

    /// Transition a Processing job to Failed, recording the error.
    /// Fails with InvalidState if the job is not Processing.
    async fn fail(&self, id: &JobId, error_message: &str, finished_at: i64) -> Result<()>;

    /// Force-fail every Processing job whose `started_at` is older than
    /// the cutoff (watchdog sweep). Returns the number of jobs failed.
    async fn fail_stuck_processing(
        &self,
        started_before: i64,
        finished_at: i64,
        error_message: &str,
    ) -> Result<u64>;

    /// Find all jobs in a given status (startup recovery)
    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<AnalysisJob>>;

    /// Count jobs by status (admin stats)
    async fn count_by_status(&self, status: JobStatus) -> Result<i64>;
}
