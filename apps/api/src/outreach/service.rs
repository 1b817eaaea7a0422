//! Recruiter outreach drafts: contact selection, message drafting within daily quotas,
//! delivery status, campaigns and follow-ups.
//!
//! Nothing is sent from here. Drafts carry a recommended `send_after_secs` and the
//! operator reports delivery back through the status endpoint.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::limits::{self, LimitKind};
use crate::llm_client::{LlmClient, LlmError, LlmTask};
use crate::models::candidate::CandidateRow;
use crate::models::outreach::{OutreachCampaignRow, OutreachMessageRow, RecruiterContactRow};
use crate::outreach::campaign::{transition, CampaignAction, CampaignStatus};
use crate::outreach::messages::{
    accept_generated, follow_up_text, rank_contacts, spaced_send_after, template_connection_message,
    truncate_message, MessageStatus, MessageType, RankedContact, FOLLOW_UP_AFTER_HOURS,
    MAX_FOLLOW_UPS,
};
use crate::outreach::prompts::{build_connection_prompt, build_follow_up_prompt, OUTREACH_SYSTEM};

pub const DEFAULT_TONE: &str = "professional";
const MATCH_COMPANIES: i64 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Contacts
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewContact {
    pub company: String,
    pub name: String,
    pub title: String,
    pub profile_url: Option<String>,
    pub email: Option<String>,
}

pub async fn create_contact(db: &PgPool, contact: NewContact) -> Result<RecruiterContactRow, AppError> {
    if contact.company.trim().is_empty() || contact.name.trim().is_empty() {
        return Err(AppError::Validation("company and name are required".to_string()));
    }
    Ok(sqlx::query_as::<_, RecruiterContactRow>(
        r#"
        INSERT INTO recruiter_contacts (id, company, name, title, profile_url, email)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(contact.company.trim())
    .bind(contact.name.trim())
    .bind(contact.title.trim())
    .bind(&contact.profile_url)
    .bind(&contact.email)
    .fetch_one(db)
    .await?)
}

pub async fn list_contacts(
    db: &PgPool,
    company: Option<&str>,
) -> Result<Vec<RecruiterContactRow>, AppError> {
    Ok(sqlx::query_as::<_, RecruiterContactRow>(
        r#"
        SELECT * FROM recruiter_contacts
        WHERE $1::text IS NULL OR LOWER(company) = LOWER($1)
        ORDER BY company, name
        "#,
    )
    .bind(company)
    .fetch_all(db)
    .await?)
}

async fn contacts_for_companies(
    db: &PgPool,
    companies: &[String],
) -> Result<Vec<RecruiterContactRow>, AppError> {
    let lowered: Vec<String> = companies.iter().map(|c| c.trim().to_lowercase()).collect();
    Ok(sqlx::query_as::<_, RecruiterContactRow>(
        "SELECT * FROM recruiter_contacts WHERE LOWER(company) = ANY($1) ORDER BY created_at",
    )
    .bind(&lowered)
    .fetch_all(db)
    .await?)
}

/// Companies of the candidate's best `should_apply` matches.
async fn matched_companies(db: &PgPool, candidate_id: Uuid) -> Result<Vec<String>, AppError> {
    Ok(sqlx::query_scalar::<_, String>(
        r#"
        SELECT j.company FROM job_matches m
        JOIN jobs_raw j ON j.id = m.job_id
        WHERE m.candidate_id = $1 AND m.should_apply
        GROUP BY j.company
        ORDER BY MAX(m.match_score) DESC
        LIMIT $2
        "#,
    )
    .bind(candidate_id)
    .bind(MATCH_COMPANIES)
    .fetch_all(db)
    .await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Drafting
// ────────────────────────────────────────────────────────────────────────────

/// A stored draft and how long to wait after the previous send before sending it.
#[derive(Debug, Serialize)]
pub struct PreparedDraft {
    #[serde(flatten)]
    pub message: OutreachMessageRow,
    pub send_after_secs: u64,
}

#[derive(Debug)]
pub struct OutreachRequest {
    pub candidate_id: Uuid,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub job_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub tone: String,
    pub max_drafts: usize,
    /// Fixed spacing between drafts; random 5–15 s when unset.
    pub spacing_secs: Option<u64>,
    /// Drafts already prepared earlier in the same batch (campaigns span companies).
    pub batch_offset: usize,
    /// Daily counters each draft consumes, all or none.
    pub quotas: Vec<LimitKind>,
}

impl OutreachRequest {
    pub fn for_candidate(candidate_id: Uuid) -> Self {
        Self {
            candidate_id,
            company: None,
            job_title: None,
            job_id: None,
            campaign_id: None,
            tone: DEFAULT_TONE.to_string(),
            max_drafts: LimitKind::Connections.daily_limit() as usize,
            spacing_secs: None,
            batch_offset: 0,
            quotas: vec![LimitKind::Connections],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutreachRun {
    pub candidate_id: Uuid,
    pub drafts: Vec<PreparedDraft>,
    pub contacts_considered: usize,
    pub daily_limit_remaining: i64,
}

/// LLM connection request, or one of the fixed texts when the LLM is unavailable or
/// its reply is too long.
pub async fn draft_connection_message(
    llm: &LlmClient,
    candidate: &CandidateRow,
    contact: &RecruiterContactRow,
    job_title: &str,
    tone: &str,
    rng: &mut StdRng,
) -> String {
    let prompt = build_connection_prompt(
        candidate,
        &contact.name,
        &contact.title,
        &contact.company,
        job_title,
        tone,
    );
    match llm.call_text(&prompt, OUTREACH_SYSTEM, LlmTask::Outreach).await {
        Ok(text) => match accept_generated(&text) {
            Some(message) => return message,
            None => warn!("LLM outreach message for {} was empty or too long", contact.name),
        },
        Err(LlmError::NotConfigured) => {}
        Err(e) => warn!("LLM outreach message failed for {}: {e}", contact.name),
    }
    template_connection_message(&contact.name, job_title, &contact.company, rng)
}

async fn acquire_all(
    redis: &redis::Client,
    kinds: &[LimitKind],
    candidate_id: Uuid,
) -> Result<bool, AppError> {
    for (idx, kind) in kinds.iter().enumerate() {
        if !limits::try_acquire(redis, *kind, candidate_id).await? {
            for taken in &kinds[..idx] {
                limits::release(redis, *taken, candidate_id).await?;
            }
            return Ok(false);
        }
    }
    Ok(true)
}

/// Hands back the quota reserved for a draft when storing it failed, then returns the
/// original result. Release failures are only logged.
async fn settle_quota<T>(
    redis: &redis::Client,
    kinds: &[LimitKind],
    candidate_id: Uuid,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if result.is_err() {
        for kind in kinds {
            if let Err(e) = limits::release(redis, *kind, candidate_id).await {
                warn!("Failed to release {kind:?} quota for candidate {candidate_id}: {e}");
            }
        }
    }
    result
}

async fn remaining_quota(
    redis: &redis::Client,
    kinds: &[LimitKind],
    candidate_id: Uuid,
) -> Result<i64, AppError> {
    let mut remaining = i64::MAX;
    for kind in kinds {
        remaining = remaining.min(limits::remaining_today(redis, *kind, candidate_id).await?);
    }
    Ok(if kinds.is_empty() { 0 } else { remaining })
}

#[allow(clippy::too_many_arguments)]
async fn insert_message(
    db: &PgPool,
    candidate_id: Uuid,
    contact: &RankedContact,
    campaign_id: Option<Uuid>,
    job_id: Option<Uuid>,
    message_type: MessageType,
    tone: &str,
    content: &str,
    sequence: i32,
) -> Result<OutreachMessageRow, AppError> {
    Ok(sqlx::query_as::<_, OutreachMessageRow>(
        r#"
        INSERT INTO outreach_messages
            (id, candidate_id, campaign_id, contact_id, job_id, company, recipient_name,
             recipient_title, relevance_score, message_type, tone, content, status, sequence)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'drafted', $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(campaign_id)
    .bind(contact.contact.id)
    .bind(job_id)
    .bind(&contact.contact.company)
    .bind(&contact.contact.name)
    .bind(&contact.contact.title)
    .bind(contact.relevance)
    .bind(message_type.as_str())
    .bind(tone)
    .bind(truncate_message(content))
    .bind(sequence)
    .fetch_one(db)
    .await?)
}

/// Drafts connection requests to the most relevant contacts the candidate has not
/// messaged yet, within the daily quota.
pub async fn start_outreach(
    db: &PgPool,
    redis: &redis::Client,
    llm: &LlmClient,
    request: OutreachRequest,
) -> Result<OutreachRun, AppError> {
    let candidate = fetch_candidate(db, request.candidate_id).await?;

    let companies = match request.company.as_deref().map(str::trim) {
        Some(company) if !company.is_empty() => vec![company.to_string()],
        _ => matched_companies(db, candidate.id).await?,
    };
    let contacts = contacts_for_companies(db, &companies).await?;
    let contacts_considered = contacts.len();

    let already: Vec<Uuid> = sqlx::query_scalar(
        "SELECT DISTINCT contact_id FROM outreach_messages WHERE candidate_id = $1 AND contact_id IS NOT NULL",
    )
    .bind(candidate.id)
    .fetch_all(db)
    .await?;

    let ranked: Vec<RankedContact> = rank_contacts(contacts)
        .into_iter()
        .filter(|r| !already.contains(&r.contact.id))
        .collect();

    let job_title = request
        .job_title
        .clone()
        .or_else(|| candidate.target_roles.first().cloned())
        .unwrap_or_else(|| "engineering".to_string());

    let mut rng = StdRng::from_entropy();
    let mut drafts = Vec::new();
    for contact in ranked.iter().take(request.max_drafts) {
        if !acquire_all(redis, &request.quotas, candidate.id).await? {
            info!("Outreach quota reached for candidate {}", candidate.id);
            break;
        }
        let content =
            draft_connection_message(llm, &candidate, &contact.contact, &job_title, &request.tone, &mut rng)
                .await;
        let inserted = insert_message(
            db,
            candidate.id,
            contact,
            request.campaign_id,
            request.job_id,
            MessageType::ConnectionRequest,
            &request.tone,
            &content,
            0,
        )
        .await;
        let message = settle_quota(redis, &request.quotas, candidate.id, inserted).await?;
        let send_after_secs = spaced_send_after(
            request.spacing_secs,
            request.batch_offset + drafts.len(),
            &mut rng,
        );
        drafts.push(PreparedDraft {
            message,
            send_after_secs,
        });
    }

    info!(
        "Prepared {} outreach drafts for candidate {} ({} contacts considered)",
        drafts.len(),
        candidate.id,
        contacts_considered
    );

    Ok(OutreachRun {
        candidate_id: candidate.id,
        drafts,
        contacts_considered,
        daily_limit_remaining: remaining_quota(redis, &request.quotas, candidate.id).await?,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Status
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, FromRow)]
pub struct MessageCounts {
    pub today_messages: i64,
    pub total_messages: i64,
    pub sent_messages: i64,
    pub connections_made: i64,
    pub replies_received: i64,
}

#[derive(Debug, Serialize)]
pub struct OutreachStatus {
    pub today_messages: i64,
    pub total_messages: i64,
    pub connections_made: i64,
    pub replies_received: i64,
    pub response_rate: f64,
    pub daily_limit_remaining: i64,
}

impl OutreachStatus {
    pub fn new(counts: &MessageCounts, daily_limit_remaining: i64) -> Self {
        let response_rate = if counts.sent_messages > 0 {
            counts.replies_received as f64 / counts.sent_messages as f64 * 100.0
        } else {
            0.0
        };
        Self {
            today_messages: counts.today_messages,
            total_messages: counts.total_messages,
            connections_made: counts.connections_made,
            replies_received: counts.replies_received,
            response_rate,
            daily_limit_remaining,
        }
    }
}

pub async fn message_counts(db: &PgPool, candidate_id: Option<Uuid>) -> Result<MessageCounts, AppError> {
    Ok(sqlx::query_as::<_, MessageCounts>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE created_at >= CURRENT_DATE)                  AS today_messages,
            COUNT(*)                                                            AS total_messages,
            COUNT(*) FILTER (WHERE status <> 'drafted')                         AS sent_messages,
            COUNT(*) FILTER (WHERE status IN ('connected','replied'))           AS connections_made,
            COUNT(*) FILTER (WHERE status = 'replied')                          AS replies_received
        FROM outreach_messages
        WHERE $1::uuid IS NULL OR candidate_id = $1
        "#,
    )
    .bind(candidate_id)
    .fetch_one(db)
    .await?)
}

pub async fn outreach_status(
    db: &PgPool,
    redis: &redis::Client,
    candidate_id: Uuid,
) -> Result<OutreachStatus, AppError> {
    fetch_candidate(db, candidate_id).await?;
    let counts = message_counts(db, Some(candidate_id)).await?;
    let remaining = limits::remaining_today(redis, LimitKind::Connections, candidate_id).await?;
    Ok(OutreachStatus::new(&counts, remaining))
}

pub async fn list_messages(db: &PgPool, candidate_id: Uuid) -> Result<Vec<OutreachMessageRow>, AppError> {
    Ok(sqlx::query_as::<_, OutreachMessageRow>(
        "SELECT * FROM outreach_messages WHERE candidate_id = $1 ORDER BY created_at DESC",
    )
    .bind(candidate_id)
    .fetch_all(db)
    .await?)
}

/// Records what happened to a draft. `sent` schedules a follow-up 24 h out unless the
/// sequence is exhausted; `replied` and `declined` cancel pending follow-ups.
pub async fn update_message_status(
    db: &PgPool,
    message_id: Uuid,
    status: &str,
) -> Result<OutreachMessageRow, AppError> {
    let status = MessageStatus::parse(status)
        .filter(|s| *s != MessageStatus::Drafted)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "invalid status '{status}', expected sent, connected, replied or declined"
            ))
        })?;

    let query = match status {
        MessageStatus::Sent => sqlx::query_as::<_, OutreachMessageRow>(
            r#"
            UPDATE outreach_messages SET
                status = 'sent',
                sent_at = COALESCE(sent_at, NOW()),
                follow_up_due_at = CASE
                    WHEN sequence < $2 THEN NOW() + make_interval(hours => $3)
                    ELSE NULL
                END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(MAX_FOLLOW_UPS)
        .bind(FOLLOW_UP_AFTER_HOURS as i32),
        MessageStatus::Replied => sqlx::query_as::<_, OutreachMessageRow>(
            r#"
            UPDATE outreach_messages SET
                status = 'replied',
                replied_at = COALESCE(replied_at, NOW()),
                follow_up_due_at = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(message_id),
        MessageStatus::Declined => sqlx::query_as::<_, OutreachMessageRow>(
            "UPDATE outreach_messages SET status = 'declined', follow_up_due_at = NULL \
             WHERE id = $1 RETURNING *",
        )
        .bind(message_id),
        MessageStatus::Connected | MessageStatus::Drafted => {
            sqlx::query_as::<_, OutreachMessageRow>(
                "UPDATE outreach_messages SET status = 'connected' WHERE id = $1 RETURNING *",
            )
            .bind(message_id)
        }
    };

    query
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Outreach message {message_id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Campaigns
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewCampaign {
    pub candidate_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub target_companies: Vec<String>,
    #[serde(default)]
    pub target_roles: Vec<String>,
    pub tone: Option<String>,
    pub daily_limit: Option<i32>,
    pub delay_between_messages_secs: Option<i32>,
}

pub async fn create_campaign(db: &PgPool, campaign: NewCampaign) -> Result<OutreachCampaignRow, AppError> {
    if campaign.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let daily_limit = campaign.daily_limit.unwrap_or(10);
    if !(1..=LimitKind::Connections.daily_limit() as i32).contains(&daily_limit) {
        return Err(AppError::Validation(format!(
            "daily_limit must be between 1 and {}",
            LimitKind::Connections.daily_limit()
        )));
    }
    let delay = campaign.delay_between_messages_secs.unwrap_or(300);
    if delay < 0 {
        return Err(AppError::Validation(
            "delay_between_messages_secs cannot be negative".to_string(),
        ));
    }
    fetch_candidate(db, campaign.candidate_id).await?;

    Ok(sqlx::query_as::<_, OutreachCampaignRow>(
        r#"
        INSERT INTO outreach_campaigns
            (id, candidate_id, name, target_companies, target_roles, tone, status,
             daily_limit, delay_between_messages_secs)
        VALUES ($1, $2, $3, $4, $5, $6, 'draft', $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(campaign.candidate_id)
    .bind(campaign.name.trim())
    .bind(&campaign.target_companies)
    .bind(&campaign.target_roles)
    .bind(campaign.tone.as_deref().unwrap_or(DEFAULT_TONE))
    .bind(daily_limit)
    .bind(delay)
    .fetch_one(db)
    .await?)
}

pub async fn list_campaigns(
    db: &PgPool,
    candidate_id: Option<Uuid>,
) -> Result<Vec<OutreachCampaignRow>, AppError> {
    Ok(sqlx::query_as::<_, OutreachCampaignRow>(
        r#"
        SELECT * FROM outreach_campaigns
        WHERE $1::uuid IS NULL OR candidate_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(candidate_id)
    .fetch_all(db)
    .await?)
}

pub async fn fetch_campaign(db: &PgPool, campaign_id: Uuid) -> Result<OutreachCampaignRow, AppError> {
    sqlx::query_as::<_, OutreachCampaignRow>("SELECT * FROM outreach_campaigns WHERE id = $1")
        .bind(campaign_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {campaign_id} not found")))
}

#[derive(Debug, Serialize)]
pub struct CampaignActionResult {
    pub campaign: OutreachCampaignRow,
    pub drafts_prepared: usize,
    pub drafts: Vec<PreparedDraft>,
}

/// Applies `action` if the transition table allows it. Start and resume prepare
/// drafts for the target companies, at most `daily_limit` per run.
pub async fn apply_campaign_action(
    db: &PgPool,
    redis: &redis::Client,
    llm: &LlmClient,
    campaign_id: Uuid,
    action: CampaignAction,
) -> Result<CampaignActionResult, AppError> {
    let campaign = fetch_campaign(db, campaign_id).await?;
    let current = CampaignStatus::parse(&campaign.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "campaign {campaign_id} has unknown status '{}'",
            campaign.status
        ))
    })?;
    let next = transition(current, action).ok_or_else(|| {
        AppError::Conflict(format!(
            "Cannot {} a campaign that is {}",
            action.as_str(),
            current.as_str()
        ))
    })?;

    sqlx::query(
        r#"
        UPDATE outreach_campaigns SET
            status = $2,
            started_at = CASE WHEN $2 = 'active' THEN COALESCE(started_at, NOW()) ELSE started_at END,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(campaign_id)
    .bind(next.as_str())
    .execute(db)
    .await?;

    let mut drafts = Vec::new();
    if action.prepares_drafts() {
        let budget = campaign.daily_limit.max(0) as usize;
        for company in &campaign.target_companies {
            if drafts.len() >= budget {
                break;
            }
            let run = start_outreach(
                db,
                redis,
                llm,
                OutreachRequest {
                    company: Some(company.clone()),
                    job_title: campaign.target_roles.first().cloned(),
                    campaign_id: Some(campaign.id),
                    tone: campaign.tone.clone(),
                    max_drafts: budget - drafts.len(),
                    spacing_secs: Some(campaign.delay_between_messages_secs.max(0) as u64),
                    batch_offset: drafts.len(),
                    ..OutreachRequest::for_candidate(campaign.candidate_id)
                },
            )
            .await?;
            drafts.extend(run.drafts);
        }
    }

    let campaign = sqlx::query_as::<_, OutreachCampaignRow>(
        r#"
        UPDATE outreach_campaigns SET messages_prepared = messages_prepared + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(campaign_id)
    .bind(drafts.len() as i32)
    .fetch_one(db)
    .await?;

    info!(
        "Campaign {campaign_id}: {} -> {} ({} drafts)",
        current.as_str(),
        next.as_str(),
        drafts.len()
    );
    Ok(CampaignActionResult {
        campaign,
        drafts_prepared: drafts.len(),
        drafts,
    })
}

#[derive(Debug, Serialize, FromRow)]
pub struct CompanyBreakdown {
    pub company: String,
    pub total: i64,
    pub sent: i64,
    pub replied: i64,
}

#[derive(Debug, Serialize)]
pub struct CampaignAnalytics {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub status: String,
    pub total_messages: i64,
    pub sent_messages: i64,
    pub connected_messages: i64,
    pub replied_messages: i64,
    pub send_rate: f64,
    pub connection_rate: f64,
    pub response_rate: f64,
    pub by_company: Vec<CompanyBreakdown>,
}

fn rate(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64 * 10_000.0).round() / 100.0
    } else {
        0.0
    }
}

pub async fn campaign_analytics(db: &PgPool, campaign_id: Uuid) -> Result<CampaignAnalytics, AppError> {
    let campaign = fetch_campaign(db, campaign_id).await?;

    let (total, sent, connected, replied): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status <> 'drafted'),
            COUNT(*) FILTER (WHERE status IN ('connected','replied')),
            COUNT(*) FILTER (WHERE status = 'replied')
        FROM outreach_messages
        WHERE campaign_id = $1
        "#,
    )
    .bind(campaign_id)
    .fetch_one(db)
    .await?;

    let by_company = sqlx::query_as::<_, CompanyBreakdown>(
        r#"
        SELECT
            company,
            COUNT(*)                                   AS total,
            COUNT(*) FILTER (WHERE status <> 'drafted') AS sent,
            COUNT(*) FILTER (WHERE status = 'replied')  AS replied
        FROM outreach_messages
        WHERE campaign_id = $1
        GROUP BY company
        ORDER BY total DESC
        "#,
    )
    .bind(campaign_id)
    .fetch_all(db)
    .await?;

    Ok(CampaignAnalytics {
        campaign_id,
        campaign_name: campaign.name,
        status: campaign.status,
        total_messages: total,
        sent_messages: sent,
        connected_messages: connected,
        replied_messages: replied,
        send_rate: rate(sent, total),
        connection_rate: rate(connected, sent),
        response_rate: rate(replied, sent),
        by_company,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Follow-ups
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
pub struct FollowUpRun {
    pub due: usize,
    pub drafted: usize,
    pub skipped: usize,
    pub follow_ups: Vec<OutreachMessageRow>,
}

async fn draft_follow_up(
    llm: &LlmClient,
    candidate: &CandidateRow,
    original: &OutreachMessageRow,
    sequence: i32,
) -> String {
    let days_since = original
        .sent_at
        .map_or(0, |sent| (Utc::now() - sent).num_days());
    let prompt = build_follow_up_prompt(
        candidate,
        &original.recipient_name,
        &original.company,
        &original.content,
        sequence,
        days_since,
    );
    match llm.call_text(&prompt, OUTREACH_SYSTEM, LlmTask::Outreach).await {
        Ok(text) => {
            if let Some(message) = accept_generated(&text) {
                return message;
            }
        }
        Err(LlmError::NotConfigured) => {}
        Err(e) => warn!("LLM follow-up failed for message {}: {e}", original.id),
    }
    follow_up_text(&original.recipient_name, sequence)
}

/// Drafts the next follow-up for every sent message whose follow-up is due.
pub async fn process_follow_ups(
    db: &PgPool,
    redis: &redis::Client,
    llm: &LlmClient,
) -> Result<FollowUpRun, AppError> {
    let due = sqlx::query_as::<_, OutreachMessageRow>(
        r#"
        SELECT * FROM outreach_messages
        WHERE status = 'sent' AND follow_up_due_at <= NOW() AND sequence < $1
        ORDER BY follow_up_due_at
        "#,
    )
    .bind(MAX_FOLLOW_UPS)
    .fetch_all(db)
    .await?;

    let mut run = FollowUpRun {
        due: due.len(),
        ..Default::default()
    };

    for original in due {
        if !limits::try_acquire(redis, LimitKind::Messages, original.candidate_id).await? {
            run.skipped += 1;
            continue;
        }
        let candidate = match fetch_candidate(db, original.candidate_id).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("Skipping follow-up for message {}: {e}", original.id);
                limits::release(redis, LimitKind::Messages, original.candidate_id).await?;
                run.skipped += 1;
                continue;
            }
        };

        let sequence = original.sequence + 1;
        let content = draft_follow_up(llm, &candidate, &original, sequence).await;
        let inserted = sqlx::query_as::<_, OutreachMessageRow>(
            r#"
            INSERT INTO outreach_messages
                (id, candidate_id, campaign_id, contact_id, job_id, company, recipient_name,
                 recipient_title, relevance_score, message_type, tone, content, status, sequence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'drafted', $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(original.candidate_id)
        .bind(original.campaign_id)
        .bind(original.contact_id)
        .bind(original.job_id)
        .bind(&original.company)
        .bind(&original.recipient_name)
        .bind(&original.recipient_title)
        .bind(original.relevance_score)
        .bind(MessageType::FollowUp.as_str())
        .bind(&original.tone)
        .bind(truncate_message(&content))
        .bind(sequence)
        .fetch_one(db)
        .await
        .map_err(AppError::from);
        let follow_up =
            settle_quota(redis, &[LimitKind::Messages], original.candidate_id, inserted).await?;

        sqlx::query("UPDATE outreach_messages SET follow_up_due_at = NULL WHERE id = $1")
            .bind(original.id)
            .execute(db)
            .await?;

        run.drafted += 1;
        run.follow_ups.push(follow_up);
    }

    if run.due > 0 {
        info!(
            "Follow-ups: {} due, {} drafted, {} skipped",
            run.due, run.drafted, run.skipped
        );
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outreach_status_response_rate() {
        let counts = MessageCounts {
            today_messages: 2,
            total_messages: 10,
            sent_messages: 8,
            connections_made: 4,
            replies_received: 2,
        };
        let status = OutreachStatus::new(&counts, 13);
        assert_eq!(status.response_rate, 25.0);
        assert_eq!(status.daily_limit_remaining, 13);

        let empty = OutreachStatus::new(&MessageCounts::default(), 15);
        assert_eq!(empty.response_rate, 0.0);
    }

    #[test]
    fn test_rate_rounding() {
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(0, 0), 0.0);
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_its_error_after_release() {
        // nothing listens here, so the release itself fails and is only logged
        let redis = redis::Client::open("redis://127.0.0.1:1/").unwrap();
        let kinds = [LimitKind::Connections, LimitKind::Outreach];

        let failed: Result<(), AppError> = Err(AppError::Database(sqlx::Error::RowNotFound));
        let settled = settle_quota(&redis, &kinds, Uuid::nil(), failed).await;
        assert!(
            matches!(settled, Err(AppError::Database(_))),
            "Expected the insert error back, got {settled:?}"
        );

        let stored = settle_quota(&redis, &kinds, Uuid::nil(), Ok(7)).await;
        assert_eq!(stored.unwrap(), 7);
    }

    #[test]
    fn test_outreach_request_defaults() {
        let request = OutreachRequest::for_candidate(Uuid::nil());
        assert_eq!(request.tone, DEFAULT_TONE);
        assert_eq!(request.max_drafts, 15);
        assert_eq!(request.quotas, vec![LimitKind::Connections]);
        assert_eq!(request.batch_offset, 0);
    }
}
