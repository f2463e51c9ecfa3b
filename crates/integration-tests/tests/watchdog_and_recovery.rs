//! Watchdog sweep and startup recovery tests
//!
//! Uses a fixed time provider so processing age is fully controlled.

use std::sync::Arc;

use classlens_core::application::{RecoveryService, Watchdog};
use classlens_core::domain::{AnalysisJob, AnalysisKind, JobPayload, JobStatus};
use classlens_core::error::AppError;
use classlens_core::port::time_provider::mocks::FixedTimeProvider;
use classlens_core::port::{JobRepository, TimeProvider};
use classlens_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};

const MAX_PROCESSING_MS: i64 = 300_000;

async fn setup() -> Arc<SqliteJobRepository> {
    let pool = create_pool(":memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteJobRepository::new(pool))
}

fn job() -> AnalysisJob {
    AnalysisJob::new_test(
        "class-5b",
        "teacher-1",
        AnalysisKind::Overview,
        JobPayload::new(serde_json::json!({})),
    )
}

#[tokio::test]
async fn test_watchdog_fails_only_overdue_processing() {
    let repo = setup().await;
    let time = Arc::new(FixedTimeProvider::new(1_000));

    let stuck = job();
    let fresh = job();
    let pending = job();
    for j in [&stuck, &fresh, &pending] {
        repo.insert(j).await.unwrap();
    }

    // FIFO: stuck inserted first, claimed at t=1000
    repo.claim_next(1_000).await.unwrap().unwrap();
    // fresh claimed much later, still within the ceiling at sweep time
    repo.claim_next(290_000).await.unwrap().unwrap();

    time.set(1_000 + MAX_PROCESSING_MS + 1_000);
    let watchdog = Watchdog::new(repo.clone(), time.clone(), Some(MAX_PROCESSING_MS), None);

    let swept = watchdog.sweep_once().await.unwrap();
    assert_eq!(swept, 1);

    let stuck = repo.find_by_id(&stuck.id).await.unwrap().unwrap();
    assert_eq!(stuck.status, JobStatus::Failed);
    assert!(stuck.error_message.unwrap().contains("timed out"));
    assert_eq!(stuck.finished_at, Some(time.now_millis()));

    let fresh = repo.find_by_id(&fresh.id).await.unwrap().unwrap();
    assert_eq!(fresh.status, JobStatus::Processing);

    let pending = repo.find_by_id(&pending.id).await.unwrap().unwrap();
    assert_eq!(pending.status, JobStatus::Pending);

    // A second sweep finds nothing new
    assert_eq!(watchdog.sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn test_watchdog_timeout_beats_late_worker_write() {
    let repo = setup().await;
    let time = Arc::new(FixedTimeProvider::new(1_000));

    let j = job();
    repo.insert(&j).await.unwrap();
    repo.claim_next(1_000).await.unwrap().unwrap();

    time.set(1_000 + MAX_PROCESSING_MS + 1_000);
    let watchdog = Watchdog::new(repo.clone(), time.clone(), Some(MAX_PROCESSING_MS), None);
    assert_eq!(watchdog.sweep_once().await.unwrap(), 1);

    // The worker finishing afterwards cannot resurrect the job
    let err = repo
        .complete(&j.id, "{\"late\":true}", time.now_millis())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let j = repo.find_by_id(&j.id).await.unwrap().unwrap();
    assert_eq!(j.status, JobStatus::Failed);
    assert!(j.result.is_none());
}

#[tokio::test]
async fn test_recovery_fails_orphaned_processing_jobs() {
    let repo = setup().await;
    let time = Arc::new(FixedTimeProvider::new(5_000));

    let orphaned = job();
    let pending = job();
    repo.insert(&orphaned).await.unwrap();
    repo.insert(&pending).await.unwrap();

    // Simulate a crash mid-analysis: claimed but never finished
    repo.claim_next(1_000).await.unwrap().unwrap();

    let recovery = RecoveryService::new(repo.clone(), time.clone());
    let recovered = recovery.recover_interrupted_jobs().await.unwrap();
    assert_eq!(recovered, 1);

    let orphaned = repo.find_by_id(&orphaned.id).await.unwrap().unwrap();
    assert_eq!(orphaned.status, JobStatus::Failed);
    assert!(orphaned
        .error_message
        .unwrap()
        .contains("interrupted by service restart"));
    assert_eq!(orphaned.finished_at, Some(5_000));

    // Pending jobs survive the restart untouched
    let pending = repo.find_by_id(&pending.id).await.unwrap().unwrap();
    assert_eq!(pending.status, JobStatus::Pending);

    // Running recovery again is a no-op
    assert_eq!(recovery.recover_interrupted_jobs().await.unwrap(), 0);
}

#[tokio::test]
async fn test_pending_job_claimable_after_recovery() {
    let repo = setup().await;
    let time = Arc::new(FixedTimeProvider::new(5_000));

    let orphaned = job();
    let pending = job();
    repo.insert(&orphaned).await.unwrap();
    repo.insert(&pending).await.unwrap();
    repo.claim_next(1_000).await.unwrap().unwrap();

    RecoveryService::new(repo.clone(), time)
        .recover_interrupted_jobs()
        .await
        .unwrap();

    let claimed = repo.claim_next(6_000).await.unwrap().unwrap();
    assert_eq!(claimed.id, pending.id);
}
