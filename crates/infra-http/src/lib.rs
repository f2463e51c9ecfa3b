// HTTP Infrastructure Adapters
//
// Outbound adapters for the two external services: the LLM API that
// generates analysis text and the hosted classroom backend that owns
// class and survey data.

mod backend_directory;
mod llm_provider;

pub use backend_directory::HostedClassDirectory;
pub use llm_provider::OpenAiAnalysisProvider;
