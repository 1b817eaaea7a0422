//! Axum route handlers for the Scraping API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::job::ScrapingLogRow;
use crate::scraping::pipeline::ScrapeOutcome;
use crate::scraping::scheduler::{ScheduleConfig, SchedulePatch, SchedulerStatsResponse};
use crate::scraping::ScrapeQuery;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StartScrapeRequest {
    pub query: Option<String>,
    pub location: Option<String>,
    pub max_pages: Option<u32>,
    /// Run a named schedule instead of an ad-hoc query.
    pub schedule: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub name: String,
    #[serde(default = "default_source")]
    pub source: String,
    pub query: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_source() -> String {
    "indeed".to_string()
}

fn default_location() -> String {
    "Remote".to_string()
}

fn default_max_pages() -> u32 {
    3
}

fn default_interval_hours() -> u32 {
    6
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ScrapingStatusResponse {
    pub is_running: bool,
    pub schedules: Vec<ScheduleConfig>,
    pub stats: SchedulerStatsResponse,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/scraping/start
///
/// Runs a scrape now and waits for it. With `schedule`, that schedule's parameters are used.
pub async fn handle_start_scrape(
    State(state): State<AppState>,
    Json(request): Json<StartScrapeRequest>,
) -> Result<Json<ScrapeOutcome>, AppError> {
    if let Some(name) = &request.schedule {
        return Ok(Json(state.scheduler.run_schedule(name).await?));
    }

    let max_pages = request.max_pages.unwrap_or(3);
    if !(1..=10).contains(&max_pages) {
        return Err(AppError::Validation(
            "max_pages must be between 1 and 10".to_string(),
        ));
    }

    let query = ScrapeQuery {
        query: request
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| "Software Developer".to_string()),
        location: request
            .location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "Remote".to_string()),
    };

    Ok(Json(state.scheduler.run_manual(&query, max_pages).await?))
}

/// POST /api/scraping/scheduler/:action
///
/// `start`, `stop` or `restart` the interval scheduler.
pub async fn handle_scheduler_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Json<Value>, AppError> {
    match action.as_str() {
        "start" => state.scheduler.start().await,
        "stop" => state.scheduler.stop().await,
        "restart" => state.scheduler.restart().await,
        other => {
            return Err(AppError::Validation(format!(
                "Unknown scheduler action '{other}', expected start, stop or restart"
            )))
        }
    }

    Ok(Json(json!({
        "success": true,
        "action": action,
        "is_running": state.scheduler.is_running(),
    })))
}

/// GET /api/scraping/status
pub async fn handle_scraping_status(
    State(state): State<AppState>,
) -> Result<Json<ScrapingStatusResponse>, AppError> {
    Ok(Json(ScrapingStatusResponse {
        is_running: state.scheduler.is_running(),
        schedules: state.scheduler.schedules().await,
        stats: state.scheduler.stats().await?,
    }))
}

/// GET /api/scraping/logs?limit=50
pub async fn handle_scraping_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<ScrapingLogRow>>, AppError> {
    let logs = sqlx::query_as::<_, ScrapingLogRow>(
        "SELECT * FROM scraping_logs ORDER BY started_at DESC LIMIT $1",
    )
    .bind(query.limit.unwrap_or(50).clamp(1, 500))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}

/// POST /api/scraping/schedules
pub async fn handle_create_schedule(
    State(state): State<AppState>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleConfig>), AppError> {
    let schedule = state
        .scheduler
        .add(ScheduleConfig {
            name: request.name.trim().to_string(),
            source: request.source,
            query: request.query,
            location: request.location,
            max_pages: request.max_pages,
            interval_hours: request.interval_hours,
            enabled: request.enabled,
            last_run: None,
            next_run: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

/// PUT /api/scraping/schedules/:name
pub async fn handle_update_schedule(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(patch): Json<SchedulePatch>,
) -> Result<Json<ScheduleConfig>, AppError> {
    Ok(Json(state.scheduler.update(&name, patch).await?))
}

/// DELETE /api/scraping/schedules/:name
pub async fn handle_delete_schedule(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.scheduler.remove(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
