//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};

/// analysis.submit.v1 - Submit an analysis job
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub kind: String,
    pub class_id: String,
    pub requested_by: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
}

/// analysis.status.v1 - Poll a job's status
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub job_id: String,
    pub class_id: String,
}

/// admin.stats.v1 - Get queue statistics
#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub pending_jobs: i64,
    pub processing_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub uptime_seconds: i64,
}
