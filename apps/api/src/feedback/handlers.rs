//! Axum route handlers for the Feedback API.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::analyzer::{Prediction, Recommendation, SuccessPatterns};
use crate::feedback::service::{
    analyze_performance, apply_optimizations, performance_trends, predict_success,
    success_patterns, AppliedOptimizations, PerformanceData, SuccessPatternsView, TrendPoint,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub report_id: Uuid,
    pub performance_data: PerformanceData,
    pub patterns: SuccessPatterns,
    pub recommendations: Vec<Recommendation>,
    pub key_insights: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplyOptimizationsResponse {
    pub success: bool,
    pub optimizations_applied: AppliedOptimizations,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub success: bool,
    pub days: i64,
    pub trends: Vec<TrendPoint>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub prediction: Prediction,
    pub predicted_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/feedback/analyze-performance
pub async fn handle_analyze_performance(
    State(state): State<AppState>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let report = analyze_performance(&state.db, &state.llm).await?;
    Ok(Json(AnalyzeResponse {
        success: true,
        report_id: report.report_id,
        performance_data: report.performance_data,
        patterns: report.patterns,
        recommendations: report.recommendations,
        key_insights: report.key_insights,
    }))
}

/// POST /api/feedback/apply-optimizations
pub async fn handle_apply_optimizations(
    State(state): State<AppState>,
) -> Result<Json<ApplyOptimizationsResponse>, AppError> {
    Ok(Json(ApplyOptimizationsResponse {
        success: true,
        optimizations_applied: apply_optimizations(&state.db, &state.llm).await?,
    }))
}

/// GET /api/feedback/success-patterns
pub async fn handle_success_patterns(
    State(state): State<AppState>,
) -> Result<Json<SuccessPatternsView>, AppError> {
    Ok(Json(success_patterns(&state.db, &state.llm).await?))
}

/// GET /api/feedback/trends?days=30
pub async fn handle_performance_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendsResponse>, AppError> {
    if query.days < 1 {
        return Err(AppError::Validation("days must be at least 1".to_string()));
    }
    Ok(Json(TrendsResponse {
        success: true,
        days: query.days,
        trends: performance_trends(&state.db, query.days).await?,
    }))
}

/// POST /api/feedback/predict
pub async fn handle_predict_success(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    let prediction = predict_success(&state.db, request.candidate_id, request.job_id).await?;
    Ok(Json(PredictResponse {
        success: true,
        candidate_id: request.candidate_id,
        job_id: request.job_id,
        prediction,
        predicted_at: Utc::now(),
    }))
}
