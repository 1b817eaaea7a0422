//! Axum route handlers for the Applications API.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::applications::service::{
    analytics, auto_submit, list_for_candidate, record_pixel_view, submission_stats,
    submit_application, update_status, ApplicationAnalytics, ApplicationPackage,
    AutoSubmitSummary, SubmissionStatistics,
};
use crate::applications::tracking::{ApplicationMethod, TRACKING_PIXEL_PNG};
use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::models::application::ApplicationRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub method: Option<ApplicationMethod>,
}

#[derive(Debug, Deserialize)]
pub struct AutoSubmitRequest {
    pub candidate_id: Uuid,
    #[serde(default = "default_max_applications")]
    pub max_applications: usize,
    pub min_match_score: Option<f64>,
}

fn default_max_applications() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct AutoSubmitResponse {
    pub success: bool,
    pub candidate_id: Uuid,
    #[serde(flatten)]
    pub summary: AutoSubmitSummary,
}

#[derive(Debug, Serialize)]
pub struct SubmissionStatusResponse {
    pub success: bool,
    pub statistics: SubmissionStatistics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/applications/submit
///
/// Prepares one application package now.
pub async fn handle_submit_application(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<ApplicationPackage>), AppError> {
    let package = submit_application(
        &state.db,
        &state.redis,
        &state.config,
        &state.queue,
        request.candidate_id,
        request.job_id,
        request.method,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

/// POST /api/applications/auto-submit
pub async fn handle_auto_submit(
    State(state): State<AppState>,
    Json(request): Json<AutoSubmitRequest>,
) -> Result<Json<AutoSubmitResponse>, AppError> {
    let summary = auto_submit(
        &state.db,
        &state.redis,
        &state.config,
        &state.queue,
        request.candidate_id,
        request.max_applications,
        request.min_match_score,
    )
    .await?;
    Ok(Json(AutoSubmitResponse {
        success: true,
        candidate_id: request.candidate_id,
        summary,
    }))
}

/// GET /api/applications/status
pub async fn handle_submission_status(
    State(state): State<AppState>,
) -> Result<Json<SubmissionStatusResponse>, AppError> {
    Ok(Json(SubmissionStatusResponse {
        success: true,
        statistics: submission_stats(&state.db, &state.queue).await?,
        timestamp: Utc::now(),
    }))
}

/// GET /api/applications/analytics
pub async fn handle_application_analytics(
    State(state): State<AppState>,
) -> Result<Json<ApplicationAnalytics>, AppError> {
    Ok(Json(analytics(&state.db).await?))
}

/// GET /api/candidates/:id/applications
pub async fn handle_candidate_applications(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    fetch_candidate(&state.db, candidate_id).await?;
    Ok(Json(list_for_candidate(&state.db, candidate_id).await?))
}

/// PUT /api/applications/:id/status
pub async fn handle_update_application_status(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    Ok(Json(
        update_status(
            &state.db,
            application_id,
            &request.status,
            request.notes.as_deref(),
        )
        .await?,
    ))
}

/// GET /api/track/pixel/:file
///
/// `file` is `{pixel_id}.png`. Always answers with the pixel so mail clients render it.
pub async fn handle_tracking_pixel(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> impl IntoResponse {
    let pixel_id = file.strip_suffix(".png").unwrap_or(&file);
    match record_pixel_view(&state.db, pixel_id).await {
        Ok(true) => debug!("Tracking pixel {pixel_id} viewed"),
        Ok(false) => {}
        Err(e) => debug!("Tracking pixel {pixel_id} not recorded: {e}"),
    }
    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        TRACKING_PIXEL_PNG,
    )
}
