//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::{cleanup_old_jobs, fetch_job, JOB_STATUSES};
use crate::models::job::JobRow;
use crate::models::LabelCount;
use crate::routes::default_limit;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<String>,
    pub source: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchJobsQuery {
    pub q: Option<String>,
    pub location: Option<String>,
    pub remote: Option<bool>,
    pub experience_level: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct JobCounts {
    pub total: i64,
    pub active: i64,
    pub remote: i64,
    pub with_salary: i64,
    pub visa_sponsorship: i64,
    pub scraped_24h: i64,
    pub scraped_7d: i64,
}

#[derive(Debug, Serialize)]
pub struct JobStatsResponse {
    #[serde(flatten)]
    pub counts: JobCounts,
    pub by_source: Vec<LabelCount>,
    pub top_companies: Vec<LabelCount>,
    pub by_experience_level: Vec<LabelCount>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
    pub days: i64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs/raw?skip&limit&status&source&company
///
/// Newest scraped first. `company` is a case-insensitive substring filter.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    if let Some(status) = &query.status {
        if !JOB_STATUSES.contains(&status.as_str()) {
            return Err(AppError::Validation(format!(
                "status must be one of {}",
                JOB_STATUSES.join(", ")
            )));
        }
    }

    let jobs = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs_raw
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR source = $2)
          AND ($3::text IS NULL OR company ILIKE '%' || $3 || '%')
        ORDER BY scraped_at DESC
        OFFSET $4 LIMIT $5
        "#,
    )
    .bind(&query.status)
    .bind(&query.source)
    .bind(&query.company)
    .bind(query.skip.max(0))
    .bind(query.limit.clamp(1, 500))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(jobs))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(fetch_job(&state.db, job_id).await?))
}

/// GET /api/jobs/stats
pub async fn handle_job_stats(
    State(state): State<AppState>,
) -> Result<Json<JobStatsResponse>, AppError> {
    let counts = sqlx::query_as::<_, JobCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'active') AS active,
            COUNT(*) FILTER (WHERE remote_work) AS remote,
            COUNT(*) FILTER (WHERE salary_range IS NOT NULL AND salary_range <> '') AS with_salary,
            COUNT(*) FILTER (WHERE visa_sponsorship) AS visa_sponsorship,
            COUNT(*) FILTER (WHERE scraped_at > NOW() - INTERVAL '24 hours') AS scraped_24h,
            COUNT(*) FILTER (WHERE scraped_at > NOW() - INTERVAL '7 days') AS scraped_7d
        FROM jobs_raw
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let by_source = sqlx::query_as::<_, LabelCount>(
        "SELECT source AS label, COUNT(*) AS count FROM jobs_raw GROUP BY source ORDER BY count DESC",
    )
    .fetch_all(&state.db)
    .await?;

    let top_companies = sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT company AS label, COUNT(*) AS count FROM jobs_raw
        GROUP BY company ORDER BY count DESC, company LIMIT 10
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let by_experience_level = sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT COALESCE(experience_level, 'unknown') AS label, COUNT(*) AS count
        FROM jobs_raw GROUP BY 1 ORDER BY count DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(JobStatsResponse {
        counts,
        by_source,
        top_companies,
        by_experience_level,
    }))
}

/// GET /api/jobs/search?q&location&remote&experience_level&skip&limit
///
/// Case-insensitive text search over active jobs.
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Query(query): Query<SearchJobsQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let jobs = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs_raw
        WHERE status = 'active'
          AND ($1::text IS NULL
               OR title ILIKE '%' || $1 || '%'
               OR company ILIKE '%' || $1 || '%'
               OR description ILIKE '%' || $1 || '%')
          AND ($2::text IS NULL OR location ILIKE '%' || $2 || '%')
          AND ($3::bool IS NULL OR remote_work = $3)
          AND ($4::text IS NULL OR experience_level = $4)
        ORDER BY scraped_at DESC
        OFFSET $5 LIMIT $6
        "#,
    )
    .bind(text)
    .bind(&query.location)
    .bind(query.remote)
    .bind(&query.experience_level)
    .bind(query.skip.max(0))
    .bind(query.limit.clamp(1, 500))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(jobs))
}

/// POST /api/jobs/cleanup?days=30
///
/// Removes stale postings that no application references.
pub async fn handle_cleanup_jobs(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, AppError> {
    let days = query.days.unwrap_or(30);
    if days < 1 {
        return Err(AppError::Validation("days must be at least 1".to_string()));
    }

    let deleted = cleanup_old_jobs(&state.db, days).await?;
    Ok(Json(CleanupResponse { deleted, days }))
}
