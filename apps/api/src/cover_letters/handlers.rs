//! Axum route handlers for the Cover Letter API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::cover_letters::generator::{
    fetch_letter, generate_cover_letter, generate_versions, record_usage, GeneratedCoverLetter,
    LetterVersion, UsageOutcome,
};
use crate::cover_letters::personalization::Tone;
use crate::cover_letters::stats::{letter_performance, letter_stats, LetterPerformance, LetterStats};
use crate::errors::AppError;
use crate::models::documents::CoverLetterRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateLetterRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    #[serde(default)]
    pub tone: Tone,
    pub company_domain: Option<String>,
    pub hiring_manager: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateMultipleRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    #[serde(default = "default_versions")]
    pub versions: usize,
    pub company_domain: Option<String>,
}

fn default_versions() -> usize {
    3
}

#[derive(Debug, Serialize)]
pub struct MultipleLettersResponse {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub versions_created: usize,
    pub versions: Vec<LetterVersion>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackUsageRequest {
    pub outcome: Option<UsageOutcome>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/cover-letters/generate
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Json(request): Json<GenerateLetterRequest>,
) -> Result<(StatusCode, Json<GeneratedCoverLetter>), AppError> {
    let letter = generate_cover_letter(
        &state.db,
        &state.llm,
        &state.http,
        request.candidate_id,
        request.job_id,
        request.tone,
        request.company_domain.as_deref(),
        request.hiring_manager.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(letter)))
}

/// POST /api/cover-letters/generate-multiple
///
/// One letter per tone: formal, warm, curious, strategic, bold.
pub async fn handle_generate_multiple(
    State(state): State<AppState>,
    Json(request): Json<GenerateMultipleRequest>,
) -> Result<(StatusCode, Json<MultipleLettersResponse>), AppError> {
    let versions = generate_versions(
        &state.db,
        &state.llm,
        &state.http,
        request.candidate_id,
        request.job_id,
        request.versions,
        request.company_domain.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MultipleLettersResponse {
            candidate_id: request.candidate_id,
            job_id: request.job_id,
            versions_created: versions.len(),
            versions,
        }),
    ))
}

/// GET /api/candidates/:id/cover-letters
pub async fn handle_candidate_cover_letters(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<CoverLetterRow>>, AppError> {
    fetch_candidate(&state.db, candidate_id).await?;
    let letters = sqlx::query_as::<_, CoverLetterRow>(
        "SELECT * FROM cover_letters WHERE candidate_id = $1 ORDER BY created_at DESC",
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(letters))
}

/// GET /api/cover-letters/:id
pub async fn handle_get_cover_letter(
    State(state): State<AppState>,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<CoverLetterRow>, AppError> {
    Ok(Json(fetch_letter(&state.db, letter_id).await?))
}

/// GET /api/cover-letters/:id/performance
pub async fn handle_cover_letter_performance(
    State(state): State<AppState>,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<LetterPerformance>, AppError> {
    fetch_letter(&state.db, letter_id).await?;
    Ok(Json(letter_performance(&state.db, letter_id).await?))
}

/// POST /api/cover-letters/:id/track-usage
///
/// Counts one use, plus a response or interview when `outcome` is given.
pub async fn handle_track_usage(
    State(state): State<AppState>,
    Path(letter_id): Path<Uuid>,
    body: Option<Json<TrackUsageRequest>>,
) -> Result<Json<CoverLetterRow>, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(
        record_usage(&state.db, letter_id, true, request.outcome).await?,
    ))
}

/// GET /api/cover-letters/stats/overview
pub async fn handle_cover_letter_stats(
    State(state): State<AppState>,
) -> Result<Json<LetterStats>, AppError> {
    Ok(Json(letter_stats(&state.db).await?))
}
