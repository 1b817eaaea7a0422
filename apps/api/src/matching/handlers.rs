//! Axum route handlers for the Matching API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::jobs::fetch_job;
use crate::matching::engine::{
    evaluate_match, process_all, process_candidate, CandidateMatchCount, MatchResult,
};
use crate::models::job::JobMatchRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListMatchesQuery {
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessMatchesRequest {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProcessMatchesResponse {
    pub candidate_id: Uuid,
    pub matches_found: usize,
    pub matches: Vec<JobMatchRow>,
}

#[derive(Debug, Serialize)]
pub struct ProcessAllResponse {
    pub candidates_processed: usize,
    pub total_matches: usize,
    pub results: Vec<CandidateMatchCount>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct MatchingStats {
    pub total: i64,
    pub high_priority: i64,
    pub should_apply: i64,
    pub recent_24h: i64,
    pub average_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct TestMatchRequest {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/candidates/:id/matches?min_score&limit
///
/// Stored matches, best first.
pub async fn handle_list_matches(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<Vec<JobMatchRow>>, AppError> {
    fetch_candidate(&state.db, candidate_id).await?;

    let matches = sqlx::query_as::<_, JobMatchRow>(
        r#"
        SELECT * FROM job_matches
        WHERE candidate_id = $1 AND match_score >= $2
        ORDER BY match_score DESC
        LIMIT $3
        "#,
    )
    .bind(candidate_id)
    .bind(query.min_score.unwrap_or(0.0))
    .bind(query.limit.unwrap_or(50).clamp(1, 500))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(matches))
}

/// POST /api/candidates/:id/matches
///
/// Matches the candidate against unseen active jobs and returns the stored matches.
pub async fn handle_process_matches(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    body: Option<Json<ProcessMatchesRequest>>,
) -> Result<Json<ProcessMatchesResponse>, AppError> {
    let limit = body.and_then(|Json(b)| b.limit).unwrap_or(100);
    let matches = process_candidate(
        &state.db,
        &state.llm,
        state.scorer.as_ref(),
        candidate_id,
        limit,
    )
    .await?;

    Ok(Json(ProcessMatchesResponse {
        candidate_id,
        matches_found: matches.len(),
        matches,
    }))
}

/// POST /api/matching/process-all
pub async fn handle_process_all(
    State(state): State<AppState>,
) -> Result<Json<ProcessAllResponse>, AppError> {
    let results = process_all(&state.db, &state.llm, state.scorer.as_ref(), 100).await?;
    Ok(Json(ProcessAllResponse {
        candidates_processed: results.len(),
        total_matches: results.iter().map(|r| r.matches_found).sum(),
        results,
    }))
}

/// GET /api/matching/stats
pub async fn handle_matching_stats(
    State(state): State<AppState>,
) -> Result<Json<MatchingStats>, AppError> {
    let stats = sqlx::query_as::<_, MatchingStats>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE priority = 'high') AS high_priority,
            COUNT(*) FILTER (WHERE should_apply) AS should_apply,
            COUNT(*) FILTER (WHERE created_at > NOW() - INTERVAL '24 hours') AS recent_24h,
            COALESCE(ROUND(AVG(match_score)::numeric, 2), 0)::float8 AS average_score
        FROM job_matches
        "#,
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(stats))
}

/// POST /api/matching/test
///
/// Scores one candidate/job pair without storing the result.
pub async fn handle_test_match(
    State(state): State<AppState>,
    Json(request): Json<TestMatchRequest>,
) -> Result<Json<MatchResult>, AppError> {
    let candidate = fetch_candidate(&state.db, request.candidate_id).await?;
    let job = fetch_job(&state.db, request.job_id).await?;
    let result = evaluate_match(&state.llm, state.scorer.as_ref(), &candidate, &job).await?;
    Ok(Json(result))
}
