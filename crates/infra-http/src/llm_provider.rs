// OpenAI-backed AnalysisProvider

use async_trait::async_trait;
use classlens_core::domain::AnalysisKind;
use classlens_core::port::{AnalysisProvider, AnalysisRequest, ProviderError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Calls the OpenAI chat-completions API to produce analysis text.
///
/// The API key is optional at construction time. A missing key is only
/// an error when a job actually reaches the provider, so the service
/// can run (and handle diagnostic jobs) without one.
pub struct OpenAiAnalysisProvider {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiAnalysisProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Read `CLASSLENS_OPENAI_API_KEY` and `CLASSLENS_OPENAI_MODEL`.
    pub fn from_env() -> Self {
        let mut provider = Self::new(std::env::var("CLASSLENS_OPENAI_API_KEY").ok());
        if let Ok(model) = std::env::var("CLASSLENS_OPENAI_MODEL") {
            provider.model = model;
        }
        provider
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl AnalysisProvider for OpenAiAnalysisProvider {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::MissingCredential("CLASSLENS_OPENAI_API_KEY is not set".to_string())
        })?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(request.kind).to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
        };

        debug!(kind = %request.kind.as_str(), model = %self.model, "Calling chat-completions API");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat-completions request failed");
                ProviderError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Chat-completions API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("response contained no choices".to_string())
            })?;

        Ok(content)
    }
}

fn system_prompt(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Relationship => {
            "You are an assistant for elementary school teachers. Analyze the peer-survey \
             responses of a class and describe the relationship structure: clusters, popular \
             students, and isolated students. Answer in JSON."
        }
        AnalysisKind::Overview => {
            "You are an assistant for elementary school teachers. Summarize the overall \
             social climate of a class from its survey data. Answer in JSON."
        }
        AnalysisKind::StudentGroup => {
            "You are an assistant for elementary school teachers. Propose balanced student \
             groupings based on the survey data and the requested constraints. Answer in JSON."
        }
        AnalysisKind::Announcement => {
            "You are an assistant for elementary school teachers. Draft a short classroom \
             journal announcement from the given notes."
        }
        AnalysisKind::SafetyNotice => {
            "You are an assistant for elementary school teachers. Draft a parent-facing \
             safety notice from the given notes."
        }
        AnalysisKind::RecordRemark => {
            "You are an assistant for elementary school teachers. Draft a school-record \
             remark for the given student, grounded in the observations provided."
        }
        // Diagnostic jobs never reach the provider
        AnalysisKind::Test => "Echo the input.",
    }
}

fn user_prompt(request: &AnalysisRequest) -> String {
    let mut input = serde_json::json!({ "request": request.payload });

    if let Some(context) = &request.context {
        input["roster"] = serde_json::to_value(&context.roster).unwrap_or_default();
        input["survey_responses"] =
            serde_json::to_value(&context.survey_responses).unwrap_or_default();
    }

    input.to_string()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use classlens_core::port::{ClassContext, StudentRecord};
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let provider = OpenAiAnalysisProvider::new(None);
        let request = AnalysisRequest {
            kind: AnalysisKind::Overview,
            payload: json!({"survey_id": "s-1"}),
            context: None,
        };

        let err = provider.generate(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
    }

    #[test]
    fn test_user_prompt_includes_context_when_present() {
        let request = AnalysisRequest {
            kind: AnalysisKind::Relationship,
            payload: json!({"survey_id": "s-1"}),
            context: Some(ClassContext {
                roster: vec![StudentRecord {
                    id: "st-1".to_string(),
                    name: "Mina".to_string(),
                    number: Some(3),
                }],
                survey_responses: vec![],
            }),
        };

        let prompt = user_prompt(&request);
        assert!(prompt.contains("survey_id"));
        assert!(prompt.contains("Mina"));
    }

    #[test]
    fn test_user_prompt_without_context_omits_roster() {
        let request = AnalysisRequest {
            kind: AnalysisKind::Overview,
            payload: json!({"survey_id": "s-1"}),
            context: None,
        };

        assert!(!user_prompt(&request).contains("roster"));
    }
}
