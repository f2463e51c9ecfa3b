//! Job Poller
//!
//! Polls a submitted job until it reaches a terminal status and fires
//! exactly one callback. The poll loop is owned by the returned
//! [`PollHandle`]; dropping or cancelling the handle stops it. There is
//! no global timer registry.

use crate::error::{Result, SdkError};
use crate::types::JobStatus;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

type TerminalCallback = Box<dyn FnOnce(PollOutcome) + Send>;

/// Default tick interval between status requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Source of job status snapshots. Implemented by [`crate::ClasslensClient`];
/// tests substitute scripted sources.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn fetch_status(&self, job_id: &str, class_id: &str) -> Result<JobStatus>;
}

#[async_trait]
impl StatusSource for crate::ClasslensClient {
    async fn fetch_status(&self, job_id: &str, class_id: &str) -> Result<JobStatus> {
        self.status(job_id, class_id).await
    }
}

/// Outcome delivered to the poll callback
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Job completed; carries the result payload
    Completed(String),
    /// Job failed; carries the error message
    Failed(String),
    /// Polling itself failed (transport error, unknown job)
    Aborted(String),
}

/// Handle to one running poll loop.
///
/// Cancelling is idempotent. After `cancel` returns, the callback will
/// not fire, even if a status request was already in flight.
pub struct PollHandle {
    cancelled: Arc<AtomicBool>,
    callback: Arc<Mutex<Option<TerminalCallback>>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Claim the callback so a dispatch racing with this cancel
        // finds the slot empty
        self.callback.lock().unwrap().take();
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for the poll loop to finish (terminal status or abort)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Polls one job at a fixed interval
pub struct JobPoller<S: StatusSource> {
    source: Arc<S>,
    interval: Duration,
}

impl<S: StatusSource> JobPoller<S> {
    pub fn new(source: Arc<S>, interval: Duration) -> Self {
        Self { source, interval }
    }

    pub fn with_default_interval(source: Arc<S>) -> Self {
        Self::new(source, DEFAULT_POLL_INTERVAL)
    }

    /// Start polling. Fires `on_terminal` at most once, then stops.
    ///
    /// Ticks are serialized: the next status request is scheduled only
    /// after the previous response arrives, so a slow server never
    /// causes overlapping requests.
    pub fn start<F>(
        &self,
        job_id: impl Into<String>,
        class_id: impl Into<String>,
        on_terminal: F,
    ) -> PollHandle
    where
        F: FnOnce(PollOutcome) + Send + 'static,
    {
        let source = self.source.clone();
        let interval = self.interval;
        let job_id = job_id.into();
        let class_id = class_id.into();
        let cancelled = Arc::new(AtomicBool::new(false));
        let callback: Arc<Mutex<Option<TerminalCallback>>> =
            Arc::new(Mutex::new(Some(Box::new(on_terminal))));

        let flag = cancelled.clone();
        let slot = callback.clone();
        let task = tokio::spawn(async move {
            loop {
                if flag.load(Ordering::SeqCst) {
                    return;
                }

                let outcome = match source.fetch_status(&job_id, &class_id).await {
                    Ok(status) if status.status == "completed" => {
                        Some(PollOutcome::Completed(status.result.unwrap_or_default()))
                    }
                    Ok(status) if status.status == "failed" => {
                        Some(PollOutcome::Failed(status.error.unwrap_or_default()))
                    }
                    Ok(_) => None,
                    // A failed status check ends the poll; the caller
                    // cannot tell a dead server from a dead job except
                    // by the message
                    Err(e) => Some(PollOutcome::Aborted(e.to_string())),
                };

                if let Some(outcome) = outcome {
                    // cancel() empties the slot under the same lock,
                    // so a response that was in flight when cancel()
                    // ran is dropped, not delivered
                    if let Some(cb) = slot.lock().unwrap().take() {
                        cb(outcome);
                    }
                    return;
                }

                tokio::time::sleep(interval).await;
            }
        });

        PollHandle {
            cancelled,
            callback,
            task: Some(task),
        }
    }
}
