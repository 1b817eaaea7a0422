//! Axum route handlers for the Resume Tailoring API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::models::documents::ResumeVersionRow;
use crate::state::AppState;
use crate::tailoring::ats::{score_resume, AtsAnalysis};
use crate::tailoring::service::{
    fetch_version, generate_variants, list_versions, summarize_performance, tailor_resume,
    tailoring_stats, update_performance, CandidatePerformance, OptimizationLevel,
    PerformanceUpdate, TailorOptions, TailoringMethod, TailoringStats, TailoringStrategy,
    VersionPerformance,
};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    pub job_id: Uuid,
    pub strategy: Option<TailoringStrategy>,
    pub optimization_level: Option<OptimizationLevel>,
    pub method: Option<TailoringMethod>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateVariantsRequest {
    pub count: Option<usize>,
    #[serde(default)]
    pub strategies: Vec<TailoringStrategy>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct VariantsResponse {
    pub resume_id: Uuid,
    pub variants_created: usize,
    pub variants: Vec<ResumeVersionRow>,
}

#[derive(Debug, Deserialize)]
pub struct AtsScoreRequest {
    pub resume_text: String,
    pub job_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionsQuery {
    pub job_id: Option<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/resumes/:resume_id/tailor
///
/// Tailors the resume for one job with the optimizer (default) or the LLM.
pub async fn handle_tailor_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(request): Json<TailorRequest>,
) -> Result<(StatusCode, Json<ResumeVersionRow>), AppError> {
    let options = TailorOptions {
        strategy: request.strategy,
        level: request.optimization_level.unwrap_or_default(),
        method: request.method.unwrap_or_default(),
    };
    let version = tailor_resume(&state.db, &state.llm, resume_id, request.job_id, options).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// POST /api/resumes/:resume_id/generate-variants
pub async fn handle_generate_variants(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    body: Option<Json<GenerateVariantsRequest>>,
) -> Result<(StatusCode, Json<VariantsResponse>), AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let variants = generate_variants(
        &state.db,
        &state.llm,
        resume_id,
        request.count.unwrap_or(5),
        &request.strategies,
        request.job_id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(VariantsResponse {
            resume_id,
            variants_created: variants.len(),
            variants,
        }),
    ))
}

/// POST /api/resumes/ats-score
///
/// Scores free text without touching the database.
pub async fn handle_ats_score(
    Json(request): Json<AtsScoreRequest>,
) -> Result<Json<AtsAnalysis>, AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    Ok(Json(score_resume(
        &request.resume_text,
        request.job_description.as_deref(),
    )))
}

/// GET /api/candidates/:id/resume-versions?job_id
pub async fn handle_list_versions(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(query): Query<VersionsQuery>,
) -> Result<Json<Vec<ResumeVersionRow>>, AppError> {
    fetch_candidate(&state.db, candidate_id).await?;
    let versions = list_versions(&state.db, candidate_id, query.job_id).await?;
    Ok(Json(versions))
}

/// GET /api/resume-versions/:id/performance
pub async fn handle_get_version_performance(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> Result<Json<VersionPerformance>, AppError> {
    let version = fetch_version(&state.db, version_id).await?;
    Ok(Json(VersionPerformance::from(&version)))
}

/// POST /api/resume-versions/:id/performance
///
/// Overwrites the counters present in the body.
pub async fn handle_update_version_performance(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
    Json(update): Json<PerformanceUpdate>,
) -> Result<Json<VersionPerformance>, AppError> {
    let performance = update_performance(&state.db, version_id, &update).await?;
    Ok(Json(performance))
}

/// GET /api/candidates/:id/resume-performance
pub async fn handle_candidate_resume_performance(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidatePerformance>, AppError> {
    fetch_candidate(&state.db, candidate_id).await?;
    let versions = list_versions(&state.db, candidate_id, None).await?;
    Ok(Json(summarize_performance(candidate_id, &versions)))
}

/// GET /api/resume-tailoring/stats
pub async fn handle_tailoring_stats(
    State(state): State<AppState>,
) -> Result<Json<TailoringStats>, AppError> {
    Ok(Json(tailoring_stats(&state.db).await?))
}
