//! Submit validation, authorization and status scoping tests
//!
//! Rejected submissions must leave no trace in the database, and status
//! lookups must stay confined to the caller's class.

use std::sync::Arc;

use classlens_core::application::worker::wake_channel;
use classlens_core::application::{StatusService, SubmitRequest, SubmitService};
use classlens_core::domain::{AnalysisKind, JobStatus};
use classlens_core::error::AppError;
use classlens_core::port::class_directory::mocks::MockClassDirectory;
use classlens_core::port::id_provider::UuidProvider;
use classlens_core::port::time_provider::SystemTimeProvider;
use classlens_core::port::JobRepository;
use classlens_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};

async fn setup(directory: MockClassDirectory) -> (Arc<SqliteJobRepository>, SubmitService) {
    let pool = create_pool(":memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let job_repo = Arc::new(SqliteJobRepository::new(pool));
    let submit = SubmitService::new(
        job_repo.clone(),
        Arc::new(directory),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        wake_channel(),
    );
    (job_repo, submit)
}

fn request(kind: AnalysisKind, payload: serde_json::Value) -> SubmitRequest {
    SubmitRequest {
        kind,
        class_id: "class-5b".to_string(),
        requested_by: "teacher-1".to_string(),
        payload,
    }
}

async fn total_jobs(repo: &SqliteJobRepository) -> i64 {
    let mut total = 0;
    for status in [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ] {
        total += repo.count_by_status(status).await.unwrap();
    }
    total
}

#[tokio::test]
async fn test_invalid_payload_creates_no_row() {
    let (repo, submit) = setup(MockClassDirectory::new_permissive()).await;

    // relationship requires a survey_id
    let err = submit
        .submit(request(AnalysisKind::Relationship, serde_json::json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(total_jobs(&repo).await, 0);
}

#[tokio::test]
async fn test_unauthorized_submit_creates_no_row() {
    let (repo, submit) = setup(MockClassDirectory::new_denying()).await;

    let err = submit
        .submit(request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    assert_eq!(total_jobs(&repo).await, 0);
}

#[tokio::test]
async fn test_unknown_job_status_is_not_found() {
    let (repo, _submit) = setup(MockClassDirectory::new_permissive()).await;
    let status = StatusService::new(repo);

    let err = status.status("no-such-job", "class-5b").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_status_is_scoped_to_class() {
    let (repo, submit) = setup(MockClassDirectory::new_permissive()).await;
    let status = StatusService::new(repo);

    let job_id = submit
        .submit(request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    // Visible in its own class
    assert!(status.status(&job_id, "class-5b").await.is_ok());

    // A valid id queried under another class looks like it does not exist
    let err = status.status(&job_id, "class-6a").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_submits_create_independent_jobs() {
    let (repo, submit) = setup(MockClassDirectory::new_permissive()).await;

    let payload = serde_json::json!({"survey_id": "s-1"});
    let first = submit
        .submit(request(AnalysisKind::Relationship, payload.clone()))
        .await
        .unwrap();
    let second = submit
        .submit(request(AnalysisKind::Relationship, payload))
        .await
        .unwrap();

    // No idempotency key: identical requests are separate jobs
    assert_ne!(first, second);
    assert_eq!(repo.count_by_status(JobStatus::Pending).await.unwrap(), 2);
}

#[tokio::test]
async fn test_processing_status_exposes_no_partial_result() {
    let (repo, submit) = setup(MockClassDirectory::new_permissive()).await;
    let status = StatusService::new(repo.clone());

    let job_id = submit
        .submit(request(AnalysisKind::Overview, serde_json::json!({})))
        .await
        .unwrap();

    repo.claim_next(1000).await.unwrap().unwrap();

    let view = status.status(&job_id, "class-5b").await.unwrap();
    assert_eq!(view.status, JobStatus::Processing);
    assert!(view.result.is_none());
    assert!(view.error.is_none());
    assert_eq!(view.started_at, Some(1000));
}
