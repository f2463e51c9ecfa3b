// Class Directory Port
// Boundary to the hosted classroom backend (external data store + auth).
// The core uses it for two things: ownership checks at submit time and
// best-effort auxiliary data gathering inside the worker.

use crate::domain::{AnalysisKind, ClassId, TeacherId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One student in a class roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number: Option<i32>,
}

/// One peer-survey answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub student_id: String,
    pub question: String,
    /// Chosen peer student ids
    pub choices: Vec<String>,
}

/// Auxiliary data assembled for an analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassContext {
    pub roster: Vec<StudentRecord>,
    pub survey_responses: Vec<SurveyResponse>,
}

/// Class Directory trait
#[async_trait]
pub trait ClassDirectory: Send + Sync {
    /// Does the teacher own the class? Used by the submit path; a
    /// negative answer rejects the request before any row is created.
    async fn owns_class(&self, teacher_id: &TeacherId, class_id: &ClassId) -> Result<bool>;

    /// Fetch roster and survey responses for an analysis run. Callers
    /// treat failures as non-fatal (degraded input, not a failed job).
    async fn class_context(&self, class_id: &ClassId, kind: AnalysisKind) -> Result<ClassContext>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;

    /// Mock Class Directory for testing
    pub struct MockClassDirectory {
        owns: bool,
        context_fails: bool,
        context: ClassContext,
    }

    impl MockClassDirectory {
        /// Directory where the teacher owns every class
        pub fn new_permissive() -> Self {
            Self {
                owns: true,
                context_fails: false,
                context: ClassContext::default(),
            }
        }

        /// Directory where ownership checks always fail
        pub fn new_denying() -> Self {
            Self {
                owns: false,
                context_fails: false,
                context: ClassContext::default(),
            }
        }

        /// Permissive directory whose context fetch always errors
        /// (exercises the degraded-input path)
        pub fn new_context_failing() -> Self {
            Self {
                owns: true,
                context_fails: true,
                context: ClassContext::default(),
            }
        }
    }

    #[async_trait]
    impl ClassDirectory for MockClassDirectory {
        async fn owns_class(&self, _teacher_id: &TeacherId, _class_id: &ClassId) -> Result<bool> {
            Ok(self.owns)
        }

        async fn class_context(
            &self,
            _class_id: &ClassId,
            _kind: AnalysisKind,
        ) -> Result<ClassContext> {
            if self.context_fails {
                return Err(AppError::Internal(
                    "backend unavailable (mock)".to_string(),
                ));
            }
            Ok(self.context.clone())
        }
    }
}
