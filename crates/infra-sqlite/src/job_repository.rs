// SQLite JobRepository Implementation

use async_trait::async_trait;
use classlens_core::domain::{AnalysisJob, AnalysisKind, ClassId, JobId, JobPayload, JobStatus};
use classlens_core::error::{AppError, Result};
use classlens_core::port::JobRepository;
use sqlx::SqlitePool;

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Distinguish "no such job" from "job already terminal" after a
    /// conditional update touched zero rows
    async fn explain_zero_rows(&self, id: &JobId, target: JobStatus) -> AppError {
        let current: std::result::Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM analysis_jobs WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(None) => AppError::NotFound(format!("Job {} not found", id)),
            Ok(Some(status)) => AppError::InvalidState(format!(
                "Cannot transition job {} from {} to {}",
                id, status, target
            )),
            Err(e) => map_sqlx_error(e),
        }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &AnalysisJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analysis_jobs (
                id, class_id, requested_by, kind, payload,
                status, created_at, started_at, finished_at,
                result, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.class_id)
        .bind(&job.requested_by)
        .bind(job.kind.as_str())
        .bind(job.payload.as_value().to_string())
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.result)
        .bind(&job.error_message)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<AnalysisJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM analysis_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn find_in_class(&self, id: &JobId, class_id: &ClassId) -> Result<Option<AnalysisJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM analysis_jobs WHERE id = ? AND class_id = ?",
        )
        .bind(id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn claim_next(&self, now_millis: i64) -> Result<Option<AnalysisJob>> {
        // Atomic pending -> processing claim. The outer status guard
        // makes this a compare-and-swap: if a concurrent claimer won
        // between the subquery and the update, zero rows change and we
        // return None.
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE analysis_jobs
            SET status = 'processing', started_at = ?
            WHERE id = (
                SELECT id FROM analysis_jobs
                WHERE status = 'pending'
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            )
              AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(now_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_job()))
    }

    async fn complete(&self, id: &JobId, result: &str, finished_at: i64) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'completed', result = ?, finished_at = ?
            WHERE id = ? AND status = 'processing'
            "#,
        )
        .bind(result)
        .bind(finished_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(self.explain_zero_rows(id, JobStatus::Completed).await);
        }
        Ok(())
    }

    async fn fail(&self, id: &JobId, error_message: &str, finished_at: i64) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'failed', error_message = ?, finished_at = ?
            WHERE id = ? AND status = 'processing'
            "#,
        )
        .bind(error_message)
        .bind(finished_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(self.explain_zero_rows(id, JobStatus::Failed).await);
        }
        Ok(())
    }

    async fn fail_stuck_processing(
        &self,
        started_before: i64,
        finished_at: i64,
        error_message: &str,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'failed', error_message = ?, finished_at = ?
            WHERE status = 'processing' AND started_at < ?
            "#,
        )
        .bind(error_message)
        .bind(finished_at)
        .bind(started_before)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<AnalysisJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM analysis_jobs
            WHERE status = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|row| row.into_job()).collect())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM analysis_jobs WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    class_id: String,
    requested_by: String,
    kind: String,
    payload: String,
    status: String,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    result: Option<String>,
    error_message: Option<String>,
}

impl JobRow {
    fn into_job(self) -> AnalysisJob {
        let status = match self.status.as_str() {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        };

        let kind = self
            .kind
            .parse::<AnalysisKind>()
            .unwrap_or(AnalysisKind::Test);

        let payload: serde_json::Value =
            serde_json::from_str(&self.payload).unwrap_or(serde_json::json!({}));

        AnalysisJob {
            id: self.id,
            class_id: self.class_id,
            requested_by: self.requested_by,
            kind,
            payload: JobPayload::new(payload),
            status,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            result: self.result,
            error_message: self.error_message,
        }
    }
}
