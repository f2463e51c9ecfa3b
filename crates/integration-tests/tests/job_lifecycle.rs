//! End-to-end job lifecycle tests
//!
//! Drives the real submit service, SQLite repository and worker against
//! mock provider/directory implementations.

use std::sync::Arc;
use std::time::Duration;

use classlens_core::application::worker::{shutdown_channel, wake_channel, Worker};
use classlens_core::application::{StatusService, SubmitRequest, SubmitService};
use classlens_core::domain::{AnalysisKind, JobStatus};
use classlens_core::port::analysis_provider::mocks::MockAnalysisProvider;
use classlens_core::port::class_directory::mocks::MockClassDirectory;
use classlens_core::port::id_provider::UuidProvider;
use classlens_core::port::time_provider::SystemTimeProvider;
use classlens_core::port::JobRepository;
use classlens_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};

struct Harness {
    job_repo: Arc<SqliteJobRepository>,
    submit: SubmitService,
    status: StatusService,
    provider: Arc<MockAnalysisProvider>,
    directory: Arc<MockClassDirectory>,
    wake: Arc<tokio::sync::Notify>,
}

async fn harness(provider: MockAnalysisProvider, directory: MockClassDirectory) -> Harness {
    let pool = create_pool(":memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let job_repo = Arc::new(SqliteJobRepository::new(pool));
    let provider = Arc::new(provider);
    let directory = Arc::new(directory);
    let wake = wake_channel();

    let submit = SubmitService::new(
        job_repo.clone(),
        directory.clone(),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        wake.clone(),
    );
    let status = StatusService::new(job_repo.clone());

    Harness {
        job_repo,
        submit,
        status,
        provider,
        directory,
        wake,
    }
}

impl Harness {
    fn worker(&self) -> Worker {
        Worker::new(
            self.job_repo.clone(),
            self.provider.clone(),
            self.directory.clone(),
            Arc::new(SystemTimeProvider),
            self.wake.clone(),
        )
    }

    fn request(&self, kind: AnalysisKind, payload: serde_json::Value) -> SubmitRequest {
        SubmitRequest {
            kind,
            class_id: "class-5b".to_string(),
            requested_by: "teacher-1".to_string(),
            payload,
        }
    }
}

#[tokio::test]
async fn test_submit_then_worker_completes() {
    let h = harness(
        MockAnalysisProvider::new_success("{\"summary\":\"a calm class\"}"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    // Submission returns before any analysis ran
    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Pending);
    assert!(view.result.is_none());

    let processed = h.worker().process_next_job().await.unwrap();
    assert!(processed);

    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Completed);
    assert!(view.started_at.is_some());
    assert!(view.finished_at.is_some());
    assert_eq!(view.result.as_deref(), Some("{\"summary\":\"a calm class\"}"));
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_provider_failure_marks_job_failed() {
    let h = harness(
        MockAnalysisProvider::new_fail("model overloaded"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    h.worker().process_next_job().await.unwrap();

    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert!(view.error.unwrap().contains("model overloaded"));
    assert!(view.result.is_none());
}

#[tokio::test]
async fn test_worker_survives_panicking_provider() {
    let h = harness(
        MockAnalysisProvider::new_panic_inducing("provider blew up"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    // The panic is contained; process_next_job itself succeeds
    let processed = h.worker().process_next_job().await.unwrap();
    assert!(processed);

    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert!(view.error.unwrap().contains("panicked"));

    // And the worker keeps draining the queue afterwards
    let job2 = h
        .submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();
    h.worker().process_next_job().await.unwrap();
    let view = h.status.status(&job2, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_diagnostic_job_skips_provider() {
    let h = harness(
        MockAnalysisProvider::new_success("never used"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Test, serde_json::json!({"delay_ms": 50})))
        .await
        .unwrap();

    let start = std::time::Instant::now();
    h.worker().process_next_job().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));

    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Completed);

    let result: serde_json::Value = serde_json::from_str(&view.result.unwrap()).unwrap();
    assert_eq!(result["diagnostic"], serde_json::json!(true));
    assert_eq!(result["delay_ms"], serde_json::json!(50));
    assert!(result["generated_at"].as_i64().unwrap() > 0);

    assert_eq!(h.provider.call_count(), 0);
}

#[tokio::test]
async fn test_diagnostic_failure_injection() {
    let h = harness(
        MockAnalysisProvider::new_success("never used"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(
            AnalysisKind::Test,
            serde_json::json!({"should_fail": true, "fail_reason": "injected failure"}),
        ))
        .await
        .unwrap();

    h.worker().process_next_job().await.unwrap();

    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Failed);
    assert!(view.error.unwrap().contains("injected failure"));
}

#[tokio::test]
async fn test_context_failure_degrades_input_only() {
    let h = harness(
        MockAnalysisProvider::new_success("{\"summary\":\"ok\"}"),
        MockClassDirectory::new_context_failing(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    h.worker().process_next_job().await.unwrap();

    // Directory outage at analysis time never fails the job
    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_plain_text_result_is_normalized() {
    let h = harness(
        MockAnalysisProvider::new_success("The class gets along well."),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Announcement, serde_json::json!({"notes": "field trip"})))
        .await
        .unwrap();

    h.worker().process_next_job().await.unwrap();

    let view = h.status.status(&job_id, "class-5b").await.unwrap();
    let result: serde_json::Value = serde_json::from_str(&view.result.unwrap()).unwrap();
    assert_eq!(
        result["text"].as_str(),
        Some("The class gets along well.")
    );
}

#[tokio::test]
async fn test_claim_races_yield_single_winner() {
    let h = harness(
        MockAnalysisProvider::new_success("{}"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    h.submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    let (a, b) = tokio::join!(h.job_repo.claim_next(1000), h.job_repo.claim_next(1000));
    let claims = [a.unwrap(), b.unwrap()];
    assert_eq!(claims.iter().filter(|c| c.is_some()).count(), 1);
}

#[tokio::test]
async fn test_worker_loop_end_to_end() {
    let h = harness(
        MockAnalysisProvider::new_success("{\"summary\":\"done\"}"),
        MockClassDirectory::new_permissive(),
    )
    .await;

    let worker = h.worker();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let job_id = h
        .submit
        .submit(h.request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    // Poll until the background loop finishes the job
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let view = h.status.status(&job_id, "class-5b").await.unwrap();
        if view.status == JobStatus::Completed {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "job not completed within 5s, status: {:?}",
            view.status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown_tx.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(2), worker_handle)
        .await
        .expect("worker did not shut down");
}
