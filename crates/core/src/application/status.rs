// Status Use Case
//
// Pure read of a job's current state, scoped by owner context. The
// asynchronous boundary is a hard information barrier: worker-side
// failures surface only here, as a failed status with a message.

use crate::domain::{AnalysisKind, JobStatus};
use crate::error::{AppError, Result};
use crate::port::JobRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Client-observable view of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub kind: AnalysisKind,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    /// Present only when status == completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Present only when status == failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status Service
pub struct StatusService {
    job_repo: Arc<dyn JobRepository>,
}

impl StatusService {
    pub fn new(job_repo: Arc<dyn JobRepository>) -> Self {
        Self { job_repo }
    }

    /// Look up a job's status within the caller's class scope.
    ///
    /// Unknown ids and ids belonging to another class both yield
    /// NotFound; the caller cannot distinguish them.
    pub async fn status(&self, job_id: &str, class_id: &str) -> Result<JobStatusView> {
        let job = self
            .job_repo
            .find_in_class(&job_id.to_string(), &class_id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;

        Ok(JobStatusView {
            job_id: job.id,
            status: job.status,
            kind: job.kind,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            result: if job.status == JobStatus::Completed {
                job.result
            } else {
                None
            },
            error: if job.status == JobStatus::Failed {
                job.error_message
            } else {
                None
            },
        })
    }
}
