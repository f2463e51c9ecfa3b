//! SDK Types
//!
//! Wire-level mirrors of the daemon's RPC request and response shapes.

use serde::{Deserialize, Serialize};

/// analysis.submit.v1 parameters
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub kind: String,
    pub class_id: String,
    pub requested_by: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
}

/// analysis.status.v1 result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub status: String,
    pub kind: String,
    pub created_at: i64,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub finished_at: Option<i64>,
    /// Present only when status == "completed"
    #[serde(default)]
    pub result: Option<String>,
    /// Present only when status == "failed"
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }
}

/// admin.stats.v1 result
#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    pub pending_jobs: i64,
    pub processing_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub uptime_seconds: i64,
}
