//! Axum route handlers for the LinkedIn outreach API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::outreach::{OutreachCampaignRow, OutreachMessageRow, RecruiterContactRow};
use crate::outreach::campaign::CampaignAction;
use crate::outreach::service::{
    apply_campaign_action, campaign_analytics, create_campaign, create_contact, list_campaigns,
    list_contacts, list_messages, outreach_status, process_follow_ups, start_outreach,
    update_message_status, CampaignActionResult, CampaignAnalytics, FollowUpRun, NewCampaign,
    NewContact, OutreachRequest, OutreachRun, OutreachStatus,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContactsQuery {
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartOutreachQuery {
    pub candidate_id: Uuid,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub job_id: Option<Uuid>,
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartOutreachResponse {
    pub success: bool,
    #[serde(flatten)]
    pub run: OutreachRun,
}

#[derive(Debug, Serialize)]
pub struct OutreachStatusResponse {
    pub success: bool,
    pub candidate_id: Uuid,
    pub status: OutreachStatus,
}

#[derive(Debug, Deserialize)]
pub struct MessageStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CandidateFilter {
    pub candidate_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub candidate_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/linkedin/contacts
pub async fn handle_create_contact(
    State(state): State<AppState>,
    Json(contact): Json<NewContact>,
) -> Result<(StatusCode, Json<RecruiterContactRow>), AppError> {
    let contact = create_contact(&state.db, contact).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// GET /api/linkedin/contacts?company
pub async fn handle_list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ContactsQuery>,
) -> Result<Json<Vec<RecruiterContactRow>>, AppError> {
    Ok(Json(list_contacts(&state.db, query.company.as_deref()).await?))
}

/// POST /api/linkedin/start-outreach?candidate_id&company&job_title&job_id
pub async fn handle_start_outreach(
    State(state): State<AppState>,
    Query(query): Query<StartOutreachQuery>,
) -> Result<Json<StartOutreachResponse>, AppError> {
    let mut request = OutreachRequest::for_candidate(query.candidate_id);
    request.company = query.company;
    request.job_title = query.job_title;
    request.job_id = query.job_id;
    if let Some(tone) = query.tone {
        request.tone = tone;
    }

    let run = start_outreach(&state.db, &state.redis, &state.llm, request).await?;
    Ok(Json(StartOutreachResponse { success: true, run }))
}

/// GET /api/linkedin/outreach-status/:candidate_id
pub async fn handle_outreach_status(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<OutreachStatusResponse>, AppError> {
    let status = outreach_status(&state.db, &state.redis, candidate_id).await?;
    Ok(Json(OutreachStatusResponse {
        success: true,
        candidate_id,
        status,
    }))
}

/// GET /api/linkedin/messages?candidate_id
pub async fn handle_list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<OutreachMessageRow>>, AppError> {
    Ok(Json(list_messages(&state.db, query.candidate_id).await?))
}

/// PUT /api/linkedin/messages/:id/status
pub async fn handle_update_message_status(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(request): Json<MessageStatusRequest>,
) -> Result<Json<OutreachMessageRow>, AppError> {
    Ok(Json(
        update_message_status(&state.db, message_id, &request.status).await?,
    ))
}

/// GET /api/linkedin/campaigns?candidate_id
pub async fn handle_list_campaigns(
    State(state): State<AppState>,
    Query(filter): Query<CandidateFilter>,
) -> Result<Json<Vec<OutreachCampaignRow>>, AppError> {
    Ok(Json(list_campaigns(&state.db, filter.candidate_id).await?))
}

/// POST /api/linkedin/campaigns
pub async fn handle_create_campaign(
    State(state): State<AppState>,
    Json(campaign): Json<NewCampaign>,
) -> Result<(StatusCode, Json<OutreachCampaignRow>), AppError> {
    let campaign = create_campaign(&state.db, campaign).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// POST /api/linkedin/campaigns/:id/:action
pub async fn handle_campaign_action(
    State(state): State<AppState>,
    Path((campaign_id, action)): Path<(Uuid, String)>,
) -> Result<Json<CampaignActionResult>, AppError> {
    let action = CampaignAction::parse(&action).ok_or_else(|| {
        AppError::Validation(format!(
            "unknown action '{action}', expected start, pause, resume or stop"
        ))
    })?;
    Ok(Json(
        apply_campaign_action(&state.db, &state.redis, &state.llm, campaign_id, action).await?,
    ))
}

/// GET /api/linkedin/campaigns/:id/analytics
pub async fn handle_campaign_analytics(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignAnalytics>, AppError> {
    Ok(Json(campaign_analytics(&state.db, campaign_id).await?))
}

/// POST /api/linkedin/follow-ups/process
pub async fn handle_process_follow_ups(
    State(state): State<AppState>,
) -> Result<Json<FollowUpRun>, AppError> {
    Ok(Json(
        process_follow_ups(&state.db, &state.redis, &state.llm).await?,
    ))
}
