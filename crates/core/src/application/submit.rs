// Submit Use Case (Job Enqueuer)
//
// Validates and authorizes an analysis request, inserts a Pending job
// row, and nudges the worker loop. Returns the job id synchronously;
// never waits on analysis work.

use crate::domain::{AnalysisJob, AnalysisKind, JobPayload};
use crate::error::{AppError, Result};
use crate::port::{ClassDirectory, IdProvider, JobRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Submit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub kind: AnalysisKind,
    pub class_id: String,
    pub requested_by: String,
    pub payload: serde_json::Value,
}

/// Submit Service
pub struct SubmitService {
    job_repo: Arc<dyn JobRepository>,
    class_directory: Arc<dyn ClassDirectory>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    /// Wakes the worker loop after an insert; fire-and-forget
    worker_wake: Arc<Notify>,
}

impl SubmitService {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        class_directory: Arc<dyn ClassDirectory>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        worker_wake: Arc<Notify>,
    ) -> Self {
        Self {
            job_repo,
            class_directory,
            id_provider,
            time_provider,
            worker_wake,
        }
    }

    /// Submit a new analysis job.
    ///
    /// Validation and authorization failures are synchronous and create
    /// no job row. On success the worker is triggered out-of-band; the
    /// returned future never awaits the analysis itself.
    pub async fn submit(&self, req: SubmitRequest) -> Result<String> {
        validate_request(&req)?;

        if !self
            .class_directory
            .owns_class(&req.requested_by, &req.class_id)
            .await?
        {
            return Err(AppError::Authorization(format!(
                "teacher {} does not own class {}",
                req.requested_by, req.class_id
            )));
        }

        let job_id = self.id_provider.generate_id();
        let created_at = self.time_provider.now_millis();

        let job = AnalysisJob::new(
            job_id.clone(),
            created_at,
            req.class_id,
            req.requested_by,
            req.kind,
            JobPayload::new(req.payload),
        );

        self.job_repo.insert(&job).await?;

        info!(job_id = %job_id, kind = %job.kind, class_id = %job.class_id, "Analysis job submitted");

        // Wake the worker loop without awaiting it
        self.worker_wake.notify_one();

        Ok(job_id)
    }
}

/// Validate a submit request's payload shape for its kind
pub fn validate_request(req: &SubmitRequest) -> Result<()> {
    let payload = &req.payload;

    if !payload.is_object() {
        return Err(AppError::Validation(
            "payload must be a JSON object".to_string(),
        ));
    }

    if req.class_id.is_empty() {
        return Err(AppError::Validation("class_id must not be empty".to_string()));
    }

    if req.requested_by.is_empty() {
        return Err(AppError::Validation(
            "requested_by must not be empty".to_string(),
        ));
    }

    match req.kind {
        AnalysisKind::Relationship => {
            require_string(payload, "survey_id")?;
        }
        AnalysisKind::StudentGroup => {
            let ids = payload
                .get("student_ids")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    AppError::Validation(
                        "student_group payload requires a student_ids array".to_string(),
                    )
                })?;
            if ids.is_empty() {
                return Err(AppError::Validation(
                    "student_ids must not be empty".to_string(),
                ));
            }
        }
        AnalysisKind::RecordRemark => {
            require_string(payload, "student_id")?;
        }
        AnalysisKind::Test => {
            if let Some(delay) = payload.get("delay_ms") {
                if !delay.is_u64() {
                    return Err(AppError::Validation(
                        "delay_ms must be a non-negative integer".to_string(),
                    ));
                }
            }
            let should_fail = payload
                .get("should_fail")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if should_fail && payload.get("fail_reason").and_then(|v| v.as_str()).is_none() {
                return Err(AppError::Validation(
                    "should_fail requires a fail_reason string".to_string(),
                ));
            }
        }
        // Overview, Announcement and SafetyNotice accept any object
        AnalysisKind::Overview | AnalysisKind::Announcement | AnalysisKind::SafetyNotice => {}
    }

    Ok(())
}

fn require_string(payload: &serde_json::Value, field: &str) -> Result<()> {
    match payload.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => Ok(()),
        _ => Err(AppError::Validation(format!(
            "payload requires a non-empty {} string",
            field
        ))),
    }
}
