// Analysis Provider Port
// Abstraction over the external LLM API that produces analysis text.
// The core only treats this as an opaque async operation that succeeds
// with a text payload or fails with an error message.

use crate::domain::AnalysisKind;
use crate::port::class_directory::ClassContext;
use async_trait::async_trait;
use thiserror::Error;

/// Assembled input for one analysis invocation
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    /// Opaque payload captured at submit time
    pub payload: serde_json::Value,
    /// Auxiliary class data; None when the best-effort fetch failed
    pub context: Option<ClassContext>,
}

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API credential not configured: {0}")]
    MissingCredential(String),

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Analysis Provider trait
///
/// Implementations:
/// - OpenAiAnalysisProvider: calls the chat-completions API (infra-http)
/// - MockAnalysisProvider: scripted behavior for tests
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Generate analysis text for the assembled request.
    ///
    /// This is the single slow step of the job pipeline (seconds to
    /// tens of seconds of wall-clock time).
    ///
    /// # Errors
    /// - ProviderError::MissingCredential if no API key is configured
    /// - ProviderError::Api / Transport on upstream failure
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, ProviderError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock provider behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with the given text
        Success(String),
        /// Fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Analysis Provider for testing
    pub struct MockAnalysisProvider {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockAnalysisProvider {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_success(text: impl Into<String>) -> Self {
            Self::new(MockBehavior::Success(text.into()))
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl AnalysisProvider for MockAnalysisProvider {
        async fn generate(&self, _request: &AnalysisRequest) -> Result<String, ProviderError> {
            *self.call_count.lock().unwrap() += 1;

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success(text) => Ok(text),
                MockBehavior::Fail(msg) => Err(ProviderError::Api {
                    status: 500,
                    message: msg,
                }),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
