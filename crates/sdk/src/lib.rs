//! Classlens SDK - Rust Client Library
//!
//! Client for the Classlens analysis daemon: submit analysis jobs over
//! JSON-RPC and poll them to completion.
//!
//! # Example
//!
//! ```no_run
//! use classlens_sdk::{ClasslensClient, JobPoller, PollOutcome, SubmitRequest};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(ClasslensClient::connect("http://127.0.0.1:9641").await?);
//!
//!     let response = client.submit(SubmitRequest {
//!         kind: "relationship".to_string(),
//!         class_id: "class-5b".to_string(),
//!         requested_by: "teacher-1".to_string(),
//!         payload: json!({"survey_id": "survey-3"}),
//!     }).await?;
//!
//!     let poller = JobPoller::with_default_interval(client.clone());
//!     let handle = poller.start(response.job_id, "class-5b", |outcome| {
//!         match outcome {
//!             PollOutcome::Completed(result) => println!("analysis: {}", result),
//!             PollOutcome::Failed(err) => eprintln!("failed: {}", err),
//!             PollOutcome::Aborted(err) => eprintln!("gave up: {}", err),
//!         }
//!     });
//!
//!     handle.join().await;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod poller;
mod types;

pub use client::ClasslensClient;
pub use error::{Result, SdkError};
pub use poller::{JobPoller, PollHandle, PollOutcome, StatusSource, DEFAULT_POLL_INTERVAL};
pub use types::{JobStatus, StatsResponse, SubmitRequest, SubmitResponse};
