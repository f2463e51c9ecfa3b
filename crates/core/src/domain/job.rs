// Analysis Job Domain Model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (UUID v4)
pub type JobId = String;

/// Class identifier - the owner context for authorization scoping
pub type ClassId = String;

/// Teacher identifier
pub type TeacherId = String;

/// Job status state machine.
///
/// Transitions are monotonic and one-directional:
/// `Pending -> Processing -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis category requested by the teacher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Peer-relationship analysis from survey responses
    Relationship,
    /// Whole-class overview
    Overview,
    /// Analysis of a selected group of students
    StudentGroup,
    /// Weekly journal announcement draft
    Announcement,
    /// Safety notice draft
    SafetyNotice,
    /// School-record remark draft for one student
    RecordRemark,
    /// Diagnostic kind: runs without the LLM, honoring delay/failure
    /// injection from the payload
    Test,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Relationship => "relationship",
            AnalysisKind::Overview => "overview",
            AnalysisKind::StudentGroup => "student_group",
            AnalysisKind::Announcement => "announcement",
            AnalysisKind::SafetyNotice => "safety_notice",
            AnalysisKind::RecordRemark => "record_remark",
            AnalysisKind::Test => "test",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = crate::domain::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relationship" => Ok(AnalysisKind::Relationship),
            "overview" => Ok(AnalysisKind::Overview),
            "student_group" => Ok(AnalysisKind::StudentGroup),
            "announcement" => Ok(AnalysisKind::Announcement),
            "safety_notice" => Ok(AnalysisKind::SafetyNotice),
            "record_remark" => Ok(AnalysisKind::RecordRemark),
            "test" => Ok(AnalysisKind::Test),
            other => Err(crate::domain::error::DomainError::UnknownKind(
                other.to_string(),
            )),
        }
    }
}

/// Job Payload (JSON serializable)
///
/// Captured at submit time; sufficient for the worker to reproduce the
/// request without referring back to the original RPC call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Analysis Job Entity
///
/// Created by the submit path, mutated only by the worker (and the
/// watchdog's timeout sweep), read-only from the status path. Never
/// deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub id: JobId,
    pub class_id: ClassId,
    pub requested_by: TeacherId,
    pub kind: AnalysisKind,
    pub payload: JobPayload,

    pub status: JobStatus,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    /// Present iff status == Completed
    pub result: Option<String>,
    /// Present iff status == Failed
    pub error_message: Option<String>,
}

impl AnalysisJob {
    /// Create a new job in Pending state
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        class_id: impl Into<String>,
        requested_by: impl Into<String>,
        kind: AnalysisKind,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            requested_by: requested_by.into(),
            kind,
            payload,
            status: JobStatus::Pending,
            created_at,
            started_at: None,
            finished_at: None,
            result: None,
            error_message: None,
        }
    }

    /// Create a test job with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for deterministic test IDs (test-1, test-2, ...).
    /// Timestamps start at 1000 and increment by 1000.
    ///
    /// **Note**: This method should only be used in tests. For production code,
    /// always inject ID and time via providers.
    pub fn new_test(
        class_id: impl Into<String>,
        requested_by: impl Into<String>,
        kind: AnalysisKind,
        payload: JobPayload,
    ) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let id = format!("test-{}", counter);
        let created_at = (counter * 1000) as i64;

        Self::new(id, created_at, class_id, requested_by, kind, payload)
    }

    /// Transition to Processing with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> crate::domain::error::Result<()> {
        if self.status != JobStatus::Pending {
            return Err(crate::domain::error::DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: JobStatus::Processing.to_string(),
            });
        }
        self.status = JobStatus::Processing;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Completed, recording the result
    pub fn complete(
        &mut self,
        now_millis: i64,
        result: impl Into<String>,
    ) -> crate::domain::error::Result<()> {
        if self.status != JobStatus::Processing {
            return Err(crate::domain::error::DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: JobStatus::Completed.to_string(),
            });
        }
        self.status = JobStatus::Completed;
        self.finished_at = Some(now_millis);
        self.result = Some(result.into());
        Ok(())
    }

    /// Transition to Failed, recording the error message
    pub fn fail(
        &mut self,
        now_millis: i64,
        error_message: impl Into<String>,
    ) -> crate::domain::error::Result<()> {
        if self.status != JobStatus::Processing {
            return Err(crate::domain::error::DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: JobStatus::Failed.to_string(),
            });
        }
        self.status = JobStatus::Failed;
        self.finished_at = Some(now_millis);
        self.error_message = Some(error_message.into());
        Ok(())
    }
}
