//! Axum route handlers for the Automation API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::automation::orchestrator::{AutomationStats, AutomationStatus, CycleSummary};
use crate::errors::AppError;
use crate::models::feedback::AutomationLogRow;
use crate::state::AppState;

const RECENT_LOG_LIMIT: i64 = 20;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: AutomationStatus,
    pub recent_logs: Vec<AutomationLogRow>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: AutomationStats,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CycleResponse {
    pub success: bool,
    pub summary: CycleSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/automation/status
pub async fn handle_automation_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, AppError> {
    let recent_logs = sqlx::query_as::<_, AutomationLogRow>(
        "SELECT * FROM automation_logs ORDER BY created_at DESC LIMIT $1",
    )
    .bind(RECENT_LOG_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(StatusResponse {
        success: true,
        status: state.orchestrator.status().await,
        recent_logs,
    }))
}

/// GET /api/automation/stats
pub async fn handle_automation_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.orchestrator.stats().await,
    })
}

/// POST /api/automation/start
pub async fn handle_start_automation(
    State(state): State<AppState>,
) -> Result<Json<ControlResponse>, AppError> {
    state.orchestrator.start().await?;
    Ok(Json(ControlResponse {
        success: true,
        message: "Automation started",
        timestamp: Utc::now(),
    }))
}

/// POST /api/automation/stop
pub async fn handle_stop_automation(State(state): State<AppState>) -> Json<ControlResponse> {
    let message = if state.orchestrator.stop().await {
        "Automation stopping after the current cycle"
    } else {
        "Automation was not running"
    };
    Json(ControlResponse {
        success: true,
        message,
        timestamp: Utc::now(),
    })
}

/// POST /api/automation/run-cycle
pub async fn handle_run_cycle(
    State(state): State<AppState>,
) -> Result<Json<CycleResponse>, AppError> {
    Ok(Json(CycleResponse {
        success: true,
        summary: state.orchestrator.run_cycle().await?,
    }))
}
