use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecruiterContactRow {
    pub id: Uuid,
    pub company: String,
    pub name: String,
    pub title: String,
    pub profile_url: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutreachMessageRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub company: String,
    pub recipient_name: String,
    pub recipient_title: String,
    pub relevance_score: f64,
    pub message_type: String,
    pub tone: String,
    pub content: String,
    pub status: String,
    pub sequence: i32,
    pub follow_up_due_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutreachCampaignRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub name: String,
    pub target_companies: Vec<String>,
    pub target_roles: Vec<String>,
    pub tone: String,
    pub status: String,
    pub daily_limit: i32,
    pub delay_between_messages_secs: i32,
    pub messages_prepared: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
