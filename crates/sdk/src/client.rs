//! Classlens Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{JobStatus, StatsResponse, SubmitRequest, SubmitResponse};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::traits::ToRpcParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::Serialize;
use serde_json::value::RawValue;
use std::time::Duration;

/// Sends a request struct as a JSON-RPC named-params object
struct ObjectParams<T>(T);

impl<T: Serialize> ToRpcParams for ObjectParams<T> {
    fn to_rpc_params(self) -> std::result::Result<Option<Box<RawValue>>, serde_json::Error> {
        serde_json::value::to_raw_value(&self.0).map(Some)
    }
}

/// Classlens daemon client
///
/// # Example
///
/// ```no_run
/// use classlens_sdk::ClasslensClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClasslensClient::connect("http://127.0.0.1:9641").await?;
/// # Ok(())
/// # }
/// ```
pub struct ClasslensClient {
    client: HttpClient,
}

impl ClasslensClient {
    /// Connect to the Classlens daemon at the given RPC endpoint URL
    /// (e.g. `http://127.0.0.1:9641`).
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url.as_ref())
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self { client })
    }

    /// Submit a new analysis job.
    ///
    /// Returns immediately with the job id; the analysis runs in the
    /// background. Use [`crate::JobPoller`] or [`Self::status`] to
    /// observe its progress.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use classlens_sdk::{ClasslensClient, SubmitRequest};
    /// # use serde_json::json;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = ClasslensClient::connect("http://127.0.0.1:9641").await?;
    /// let response = client.submit(SubmitRequest {
    ///     kind: "relationship".to_string(),
    ///     class_id: "class-5b".to_string(),
    ///     requested_by: "teacher-1".to_string(),
    ///     payload: json!({"survey_id": "survey-3"}),
    /// }).await?;
    ///
    /// println!("Job ID: {}", response.job_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse> {
        let response: SubmitResponse = self
            .client
            .request("analysis.submit.v1", ObjectParams(request))
            .await?;

        Ok(response)
    }

    /// Fetch a job's current status within the given class scope.
    pub async fn status(
        &self,
        job_id: impl Into<String>,
        class_id: impl Into<String>,
    ) -> Result<JobStatus> {
        let response: JobStatus = self
            .client
            .request(
                "analysis.status.v1",
                ObjectParams(serde_json::json!({
                    "job_id": job_id.into(),
                    "class_id": class_id.into(),
                })),
            )
            .await?;

        Ok(response)
    }

    /// Fetch queue statistics.
    pub async fn stats(&self) -> Result<StatsResponse> {
        let response: StatsResponse = self
            .client
            .request("admin.stats.v1", ObjectParams(serde_json::json!({})))
            .await?;

        Ok(response)
    }
}
