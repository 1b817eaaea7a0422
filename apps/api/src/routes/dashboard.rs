//! Cross-module dashboard and analytics read models.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::applications::service::{OverallStats, SUBMITTED_STATUSES};
use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::limits::{self, LimitKind};
use crate::models::application::ApplicationRow;
use crate::models::candidate::CandidateRow;
use crate::outreach::service::{message_counts, OutreachStatus};
use crate::state::AppState;
use crate::tailoring::service::{list_versions, summarize_performance, PerformanceSummary};

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, FromRow)]
pub struct DashboardTotals {
    pub total_candidates: i64,
    pub active_candidates: i64,
    pub total_jobs: i64,
    pub total_applications: i64,
    pub total_matches: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub totals: DashboardTotals,
    pub recent_candidates: Vec<CandidateRow>,
    pub recent_applications: Vec<ApplicationRow>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CandidateTotals {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct JobTotals {
    pub total: i64,
    pub active: i64,
    pub scraped_24h: i64,
}

#[derive(Debug, Serialize)]
pub struct ApplicationTotals {
    pub total: i64,
    pub today: i64,
    pub successful: i64,
    pub success_rate: f64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct MatchingTotals {
    pub total: i64,
    pub high_priority: i64,
    pub should_apply: i64,
    pub average_score: f64,
}

#[derive(Debug, Serialize)]
pub struct OutreachTotals {
    pub total: i64,
    pub today: i64,
    pub replied: i64,
    pub response_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct AutomationSummary {
    pub status: &'static str,
    pub uptime_hours: f64,
    pub last_cycle: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MassScaleDashboard {
    pub candidates: CandidateTotals,
    pub jobs: JobTotals,
    pub applications: ApplicationTotals,
    pub matching: MatchingTotals,
    pub outreach: OutreachTotals,
    pub automation: AutomationSummary,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CandidatePerformanceReport {
    pub candidate_id: Uuid,
    pub full_name: String,
    pub applications: OverallStats,
    pub matching: MatchingTotals,
    pub outreach: OutreachStatus,
    pub resume_performance: PerformanceSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

async fn matching_totals(db: &sqlx::PgPool, candidate_id: Option<Uuid>) -> Result<MatchingTotals, AppError> {
    Ok(sqlx::query_as::<_, MatchingTotals>(
        r#"
        SELECT
            COUNT(*)                                    AS total,
            COUNT(*) FILTER (WHERE priority = 'high')   AS high_priority,
            COUNT(*) FILTER (WHERE should_apply)        AS should_apply,
            COALESCE(AVG(match_score), 0)::float8       AS average_score
        FROM job_matches
        WHERE $1::uuid IS NULL OR candidate_id = $1
        "#,
    )
    .bind(candidate_id)
    .fetch_one(db)
    .await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/dashboard/stats
pub async fn handle_dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let totals = sqlx::query_as::<_, DashboardTotals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM candidates)                  AS total_candidates,
            (SELECT COUNT(*) FROM candidates WHERE is_active)  AS active_candidates,
            (SELECT COUNT(*) FROM jobs_raw)                    AS total_jobs,
            (SELECT COUNT(*) FROM applications)                AS total_applications,
            (SELECT COUNT(*) FROM job_matches)                 AS total_matches
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let recent_candidates = sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&state.db)
    .await?;

    let recent_applications = sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DashboardStats {
        totals,
        recent_candidates,
        recent_applications,
    }))
}

/// GET /api/analytics/mass-scale-dashboard
pub async fn handle_mass_scale_dashboard(
    State(state): State<AppState>,
) -> Result<Json<MassScaleDashboard>, AppError> {
    let candidates = sqlx::query_as::<_, CandidateTotals>(
        r#"
        SELECT
            COUNT(*)                                AS total,
            COUNT(*) FILTER (WHERE is_active)       AS active,
            COUNT(*) FILTER (WHERE NOT is_active)   AS inactive
        FROM candidates
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let jobs = sqlx::query_as::<_, JobTotals>(
        r#"
        SELECT
            COUNT(*)                                                        AS total,
            COUNT(*) FILTER (WHERE status = 'active')                       AS active,
            COUNT(*) FILTER (WHERE scraped_at > NOW() - INTERVAL '24 hours') AS scraped_24h
        FROM jobs_raw
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    let (total, today, successful): (i64, i64, i64) = sqlx::query_as(&format!(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE created_at >= CURRENT_DATE),
            COUNT(*) FILTER (WHERE status IN {SUBMITTED_STATUSES})
        FROM applications
        "#
    ))
    .fetch_one(&state.db)
    .await?;
    let overall = OverallStats::new(total, successful, 0);

    let outreach = message_counts(&state.db, None).await?;
    let outreach_status = OutreachStatus::new(&outreach, 0);

    let automation = state.orchestrator.stats().await;

    Ok(Json(MassScaleDashboard {
        candidates,
        jobs,
        applications: ApplicationTotals {
            total,
            today,
            successful,
            success_rate: overall.success_rate,
        },
        matching: matching_totals(&state.db, None).await?,
        outreach: OutreachTotals {
            total: outreach.total_messages,
            today: outreach.today_messages,
            replied: outreach.replies_received,
            response_rate: outreach_status.response_rate,
        },
        automation: AutomationSummary {
            status: if state.orchestrator.is_running() {
                "running"
            } else {
                "stopped"
            },
            uptime_hours: automation.total_runtime_hours,
            last_cycle: automation.last_cycle_time,
        },
        timestamp: Utc::now(),
    }))
}

/// GET /api/analytics/candidate-performance/:id
pub async fn handle_candidate_performance(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidatePerformanceReport>, AppError> {
    let candidate = fetch_candidate(&state.db, candidate_id).await?;

    let (total, successful, responses): (i64, i64, i64) = sqlx::query_as(&format!(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status IN {SUBMITTED_STATUSES}),
            COUNT(*) FILTER (WHERE response_at IS NOT NULL)
        FROM applications
        WHERE candidate_id = $1
        "#
    ))
    .bind(candidate_id)
    .fetch_one(&state.db)
    .await?;

    let counts = message_counts(&state.db, Some(candidate_id)).await?;
    let remaining =
        limits::remaining_today(&state.redis, LimitKind::Connections, candidate_id).await?;
    let versions = list_versions(&state.db, candidate_id, None).await?;

    Ok(Json(CandidatePerformanceReport {
        candidate_id,
        full_name: candidate.full_name,
        applications: OverallStats::new(total, successful, responses),
        matching: matching_totals(&state.db, Some(candidate_id)).await?,
        outreach: OutreachStatus::new(&counts, remaining),
        resume_performance: summarize_performance(candidate_id, &versions).summary,
    }))
}
