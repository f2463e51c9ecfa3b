//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::{code, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{StatsRequest, StatsResponse, StatusRequest, SubmitRequest, SubmitResponse};
use classlens_core::application::{JobStatusView, StatusService, SubmitService};
use classlens_core::domain::{AnalysisKind, JobStatus};
use classlens_core::error::AppError;
use classlens_core::port::JobRepository;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    submit_service: Arc<SubmitService>,
    status_service: Arc<StatusService>,
    job_repo: Arc<dyn JobRepository>,
    rate_limiter: Arc<RateLimiter>,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(
        submit_service: Arc<SubmitService>,
        status_service: Arc<StatusService>,
        job_repo: Arc<dyn JobRepository>,
    ) -> Self {
        // Default: 200 burst, 100 req/sec (configurable via env)
        let max_burst: u32 = std::env::var("CLASSLENS_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);

        let rate_per_sec: u32 = std::env::var("CLASSLENS_RATE_LIMIT_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            submit_service,
            status_service,
            job_repo,
            rate_limiter: Arc::new(RateLimiter::new(max_burst, rate_per_sec)),
            start_time: std::time::Instant::now(),
        }
    }

    /// analysis.submit.v1
    pub async fn submit(&self, params: SubmitRequest) -> Result<SubmitResponse, ErrorObjectOwned> {
        if !self.rate_limiter.check().await {
            return Err(throttled());
        }

        let kind: AnalysisKind = params.kind.parse().map_err(|_| {
            to_rpc_error(AppError::Validation(format!(
                "unknown analysis kind: {}",
                params.kind
            )))
        })?;

        let job_id = self
            .submit_service
            .submit(classlens_core::application::SubmitRequest {
                kind,
                class_id: params.class_id,
                requested_by: params.requested_by,
                payload: params.payload,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(SubmitResponse {
            job_id,
            status: JobStatus::Pending.as_str().to_string(),
        })
    }

    /// analysis.status.v1
    pub async fn status(&self, params: StatusRequest) -> Result<JobStatusView, ErrorObjectOwned> {
        if !self.rate_limiter.check().await {
            return Err(throttled());
        }

        self.status_service
            .status(&params.job_id, &params.class_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let pending = self
            .job_repo
            .count_by_status(JobStatus::Pending)
            .await
            .map_err(to_rpc_error)?;
        let processing = self
            .job_repo
            .count_by_status(JobStatus::Processing)
            .await
            .map_err(to_rpc_error)?;
        let completed = self
            .job_repo
            .count_by_status(JobStatus::Completed)
            .await
            .map_err(to_rpc_error)?;
        let failed = self
            .job_repo
            .count_by_status(JobStatus::Failed)
            .await
            .map_err(to_rpc_error)?;

        Ok(StatsResponse {
            pending_jobs: pending,
            processing_jobs: processing,
            completed_jobs: completed,
            failed_jobs: failed,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }
}

fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}
