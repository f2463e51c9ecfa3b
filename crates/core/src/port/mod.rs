// Port Layer - Interfaces for external dependencies

pub mod analysis_provider;
pub mod class_directory;
pub mod id_provider; // For deterministic testing
pub mod job_repository;
pub mod time_provider;

// Re-exports
pub use analysis_provider::{AnalysisProvider, AnalysisRequest, ProviderError};
pub use class_directory::{ClassContext, ClassDirectory, StudentRecord, SurveyResponse};
pub use id_provider::IdProvider;
pub use job_repository::JobRepository;
pub use time_provider::TimeProvider;
