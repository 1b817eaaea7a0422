use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeVersionRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub resume_id: Uuid,
    pub job_id: Option<Uuid>,
    pub version_name: String,
    pub strategy: String,
    pub optimization_level: String,
    pub method: String,
    pub tailored_content: String,
    pub keywords_injected: Vec<String>,
    pub original_ats_score: f64,
    pub ats_score: f64,
    pub ats_improvement: f64,
    pub ats_breakdown: Value,
    pub content_fingerprint: String,
    pub generation_params: Value,
    pub applications_sent: i32,
    pub responses_received: i32,
    pub interviews_scheduled: i32,
    pub offers_received: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoverLetterRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub tone: String,
    pub content: String,
    pub ats_keywords: Vec<String>,
    pub personalization_hooks: Vec<String>,
    pub reasoning: String,
    pub generation_method: String,
    pub word_count: i32,
    pub used_count: i32,
    pub response_count: i32,
    pub interview_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
