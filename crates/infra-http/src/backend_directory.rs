// Hosted-backend ClassDirectory

use async_trait::async_trait;
use classlens_core::domain::{AnalysisKind, ClassId, TeacherId};
use classlens_core::error::{AppError, Result};
use classlens_core::port::{ClassContext, ClassDirectory, StudentRecord, SurveyResponse};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ClassDirectory backed by the hosted classroom backend's REST API.
///
/// Ownership checks and class data live in the hosted backend; this
/// adapter only reads from it.
pub struct HostedClassDirectory {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedClassDirectory {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Read `CLASSLENS_BACKEND_URL` and `CLASSLENS_BACKEND_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("CLASSLENS_BACKEND_URL")
            .map_err(|_| AppError::Config("CLASSLENS_BACKEND_URL is not set".to_string()))?;
        let api_key = std::env::var("CLASSLENS_BACKEND_KEY")
            .map_err(|_| AppError::Config("CLASSLENS_BACKEND_KEY is not set".to_string()))?;
        Ok(Self::new(base_url, api_key))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        match self.get_json_opt(path).await? {
            Some(value) => Ok(value),
            None => Err(AppError::NotFound(format!(
                "Backend resource not found: {}",
                path
            ))),
        }
    }

    /// GET a backend resource; a 404 becomes Ok(None)
    async fn get_json_opt<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Backend request failed");
                AppError::Internal(format!("Backend request failed: {}", e))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "Backend returned error");
            return Err(AppError::Internal(format!(
                "Backend error ({}): {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| AppError::Internal(format!("Invalid backend response: {}", e)))
    }
}

#[derive(Deserialize)]
struct ClassRecord {
    teacher_id: String,
}

#[async_trait]
impl ClassDirectory for HostedClassDirectory {
    async fn owns_class(&self, teacher_id: &TeacherId, class_id: &ClassId) -> Result<bool> {
        // An unknown class is simply not owned
        let class: Option<ClassRecord> =
            self.get_json_opt(&format!("/classes/{}", class_id)).await?;

        Ok(match class {
            Some(record) => &record.teacher_id == teacher_id,
            None => false,
        })
    }

    async fn class_context(&self, class_id: &ClassId, kind: AnalysisKind) -> Result<ClassContext> {
        let roster: Vec<StudentRecord> = self
            .get_json(&format!("/classes/{}/students", class_id))
            .await?;

        // Survey answers only matter for the survey-driven analyses
        let survey_responses: Vec<SurveyResponse> = match kind {
            AnalysisKind::Relationship | AnalysisKind::Overview | AnalysisKind::StudentGroup => {
                self.get_json(&format!("/classes/{}/survey-responses", class_id))
                    .await?
            }
            _ => Vec::new(),
        };

        debug!(
            class_id = %class_id,
            students = roster.len(),
            responses = survey_responses.len(),
            "Assembled class context"
        );

        Ok(ClassContext {
            roster,
            survey_responses,
        })
    }
}
