use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub target_roles: Vec<String>,
    pub target_companies: Vec<String>,
    pub target_locations: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub visa_sponsorship_required: bool,
    pub work_authorization: Option<String>,
    pub years_experience: Option<i32>,
    pub skills: Vec<String>,
    pub is_active: bool,
    pub automation_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRow {
    /// Free-text profile used for similarity scoring against job text.
    pub fn profile_text(&self) -> String {
        let mut parts = vec![self.full_name.clone()];
        parts.extend(self.target_roles.iter().cloned());
        parts.extend(self.skills.iter().cloned());
        if let Some(years) = self.years_experience {
            parts.push(format!("{years} years of experience"));
        }
        if let Some(location) = &self.location {
            parts.push(location.clone());
        }
        parts.join(" ")
    }

    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub version_name: String,
    pub file_name: String,
    pub file_key: String,
    pub extracted_text: String,
    pub skills: Vec<String>,
    pub experience_years: Option<i32>,
    pub is_primary: bool,
    pub ats_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}
