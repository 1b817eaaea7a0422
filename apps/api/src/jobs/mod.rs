//! Scraped job postings: browsing, search, statistics and cleanup.

pub mod handlers;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobRow;

pub const JOB_STATUSES: &[&str] = &["active", "closed", "paused"];

pub async fn fetch_job(db: &PgPool, job_id: Uuid) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs_raw WHERE id = $1")
        .bind(job_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// Deletes jobs scraped more than `days` ago that no application points at.
pub async fn cleanup_old_jobs(db: &PgPool, days: i64) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM jobs_raw j
        WHERE j.scraped_at < NOW() - make_interval(days => $1::int)
          AND NOT EXISTS (SELECT 1 FROM applications a WHERE a.job_id = j.id)
        "#,
    )
    .bind(days as i32)
    .execute(db)
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        info!("Cleaned up {deleted} jobs older than {days} days");
    }
    Ok(deleted)
}
