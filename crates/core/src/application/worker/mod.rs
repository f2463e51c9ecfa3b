// Worker - Analysis job execution loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::{AnalysisJob, AnalysisKind};
use crate::error::{AppError, Result};
use crate::port::{AnalysisProvider, AnalysisRequest, ClassDirectory, JobRepository, TimeProvider};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Worker drains the pending-job queue, one job at a time.
///
/// The queue is the jobs table itself: `claim_next` atomically moves a
/// job from Pending to Processing, so a second worker (or a retried
/// trigger) can never start the same analysis twice. Only this
/// component writes `status`, `result`, `error_message`, `started_at`
/// and `finished_at` (the watchdog's timeout sweep uses the same
/// conditional-update rules).
pub struct Worker {
    job_repo: Arc<dyn JobRepository>,
    provider: Arc<dyn AnalysisProvider>,
    class_directory: Arc<dyn ClassDirectory>,
    time_provider: Arc<dyn TimeProvider>,
    wake: Arc<Notify>,
}

impl Worker {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        provider: Arc<dyn AnalysisProvider>,
        class_directory: Arc<dyn ClassDirectory>,
        time_provider: Arc<dyn TimeProvider>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            job_repo,
            provider,
            class_directory,
            time_provider,
            wake,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!("Analysis worker started");
        loop {
            if shutdown.is_shutdown() {
                info!("Analysis worker shutting down");
                break;
            }

            match self.process_next_job().await {
                Ok(processed) => {
                    if !processed {
                        // No pending job; wait for a submit nudge or poll again shortly
                        tokio::select! {
                            _ = self.wake.notified() => {},
                            _ = sleep(IDLE_SLEEP_DURATION) => {},
                            _ = shutdown.wait() => {
                                info!("Analysis worker interrupted during idle");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Worker error: {}", e);
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Analysis worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!("Analysis worker stopped");
        Ok(())
    }

    /// Claim and process the next pending job (returns true if one was processed)
    pub async fn process_next_job(&self) -> Result<bool> {
        let now = self.time_provider.now_millis();

        // Atomic pending -> processing claim; loses races silently
        let job = match self.job_repo.claim_next(now).await? {
            Some(j) => j,
            None => return Ok(false),
        };

        info!(job_id = %job.id, kind = %job.kind, "Processing analysis job");

        // Best-effort auxiliary data fetch; failures degrade input, never fail the job
        let context = if job.kind == AnalysisKind::Test {
            None
        } else {
            match self
                .class_directory
                .class_context(&job.class_id, job.kind)
                .await
            {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    warn!(
                        job_id = %job.id,
                        class_id = %job.class_id,
                        error = %e,
                        "Class context fetch failed, continuing with degraded input"
                    );
                    None
                }
            }
        };

        // Execute with panic isolation: a panicking analysis must not
        // kill the daemon, it fails the job instead
        let job_arc = Arc::new(job);
        let job_for_exec = Arc::clone(&job_arc);
        let provider = Arc::clone(&self.provider);
        let time_provider = Arc::clone(&self.time_provider);

        let handle = tokio::task::spawn(async move {
            Self::run_analysis(&provider, &time_provider, &job_for_exec, context).await
        });

        let outcome = handle.await;
        let finished_at = self.time_provider.now_millis();

        match outcome {
            Ok(Ok(result)) => {
                self.record_terminal(&job_arc.id, Ok(&result), finished_at)
                    .await?;
                info!(job_id = %job_arc.id, "Analysis job completed");
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                error!(job_id = %job_arc.id, error = %message, "Analysis job failed");
                self.record_terminal(&job_arc.id, Err(&message), finished_at)
                    .await?;
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    format!("analysis panicked: {}", join_err)
                } else {
                    format!("analysis cancelled: {}", join_err)
                };
                error!(job_id = %job_arc.id, error = %message, "Analysis task aborted");
                self.record_terminal(&job_arc.id, Err(&message), finished_at)
                    .await?;
            }
        }

        Ok(true)
    }

    /// Persist the terminal transition, tolerating a watchdog race
    async fn record_terminal(
        &self,
        job_id: &str,
        outcome: std::result::Result<&str, &str>,
        finished_at: i64,
    ) -> Result<()> {
        let write = match outcome {
            Ok(result) => {
                self.job_repo
                    .complete(&job_id.to_string(), result, finished_at)
                    .await
            }
            Err(message) => {
                self.job_repo
                    .fail(&job_id.to_string(), message, finished_at)
                    .await
            }
        };

        match write {
            Ok(()) => Ok(()),
            // The watchdog may have timed the job out while we were
            // finishing; the terminal state written first wins
            Err(AppError::InvalidState(msg)) => {
                warn!(job_id = %job_id, "{}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Execute one analysis. Static to avoid moving the Worker into the spawned task.
    async fn run_analysis(
        provider: &Arc<dyn AnalysisProvider>,
        time_provider: &Arc<dyn TimeProvider>,
        job: &Arc<AnalysisJob>,
        context: Option<crate::port::ClassContext>,
    ) -> Result<String> {
        if job.kind == AnalysisKind::Test {
            return Self::run_diagnostic(time_provider, job.payload.as_value()).await;
        }

        let request = AnalysisRequest {
            kind: job.kind,
            payload: job.payload.as_value().clone(),
            context,
        };

        let text = provider.generate(&request).await?;
        Ok(normalize_result(text))
    }

    /// Diagnostic path for the `test` kind: honors delay and failure
    /// injection from the payload without touching the LLM
    async fn run_diagnostic(
        time_provider: &Arc<dyn TimeProvider>,
        payload: &serde_json::Value,
    ) -> Result<String> {
        let delay_ms = payload.get("delay_ms").and_then(|v| v.as_u64()).unwrap_or(0);
        if delay_ms > 0 {
            sleep(std::time::Duration::from_millis(delay_ms)).await;
        }

        let should_fail = payload
            .get("should_fail")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if should_fail {
            let reason = payload
                .get("fail_reason")
                .and_then(|v| v.as_str())
                .unwrap_or("diagnostic failure requested");
            return Err(AppError::Internal(reason.to_string()));
        }

        let result = serde_json::json!({
            "diagnostic": true,
            "delay_ms": delay_ms,
            "generated_at": time_provider.now_millis(),
        });
        Ok(result.to_string())
    }
}

/// Normalize provider output to a persistable structured form: already
/// valid JSON is stored verbatim, plain text is wrapped
fn normalize_result(text: String) -> String {
    if serde_json::from_str::<serde_json::Value>(&text).is_ok() {
        text
    } else {
        serde_json::json!({ "text": text }).to_string()
    }
}

/// Create the wake channel shared by SubmitService and Worker
pub fn wake_channel() -> Arc<Notify> {
    Arc::new(Notify::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_result_passes_json_through() {
        let json = "{\"summary\":\"ok\"}".to_string();
        assert_eq!(normalize_result(json.clone()), json);
    }

    #[test]
    fn test_normalize_result_wraps_plain_text() {
        let normalized = normalize_result("The class gets along well.".to_string());
        let value: serde_json::Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(
            value.get("text").and_then(|v| v.as_str()),
            Some("The class gets along well.")
        );
    }
}
