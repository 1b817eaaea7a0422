use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub source: String,
    pub source_job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_range: Option<String>,
    pub description: String,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub visa_sponsorship: bool,
    pub remote_work: bool,
    pub apply_url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub status: String,
}

impl JobRow {
    /// Title, company and description joined for keyword and similarity work.
    pub fn full_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.company,
            self.description,
            self.requirements.join(" ")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobMatchRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub match_score: f64,
    pub semantic_score: f64,
    pub ai_score: f64,
    pub explanation: String,
    pub keywords_matched: Vec<String>,
    pub salary_match: bool,
    pub location_match: bool,
    pub visa_match: bool,
    pub skills_match_score: f64,
    pub experience_match: bool,
    pub priority: String,
    pub should_apply: bool,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScrapingLogRow {
    pub id: Uuid,
    pub schedule_name: String,
    pub source: String,
    pub status: String,
    pub jobs_found: i32,
    pub jobs_saved: i32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
