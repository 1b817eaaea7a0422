//! Candidate profiles and their uploaded resumes.

pub mod extract;
pub mod handlers;
pub mod parser;

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, ResumeRow};
use handlers::CreateCandidateRequest;

pub async fn fetch_candidate(db: &PgPool, candidate_id: Uuid) -> Result<CandidateRow, AppError> {
    sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
        .bind(candidate_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// The candidate's primary resume, falling back to the newest upload.
pub async fn fetch_primary_resume(
    db: &PgPool,
    candidate_id: Uuid,
) -> Result<Option<ResumeRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE candidate_id = $1 ORDER BY is_primary DESC, created_at DESC LIMIT 1",
    )
    .bind(candidate_id)
    .fetch_optional(db)
    .await?)
}

/// Active candidates with automation switched on.
pub async fn fetch_automated_candidates(db: &PgPool) -> Result<Vec<CandidateRow>, AppError> {
    Ok(sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates WHERE is_active AND automation_enabled ORDER BY created_at",
    )
    .fetch_all(db)
    .await?)
}

pub fn validate_new_candidate(request: &CreateCandidateRequest) -> Result<(), AppError> {
    if request.full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name cannot be empty".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("email must be a valid address".to_string()));
    }
    if let (Some(min), Some(max)) = (request.salary_min, request.salary_max) {
        if min > max {
            return Err(AppError::Validation(
                "salary_min cannot exceed salary_max".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> CreateCandidateRequest {
        CreateCandidateRequest {
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_minimal_candidate() {
        assert!(validate_new_candidate(&make_request()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let request = CreateCandidateRequest {
            full_name: "   ".to_string(),
            ..make_request()
        };
        assert!(matches!(
            validate_new_candidate(&request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_email_without_at() {
        let request = CreateCandidateRequest {
            email: "ada.example.com".to_string(),
            ..make_request()
        };
        assert!(validate_new_candidate(&request).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_salary_range() {
        let request = CreateCandidateRequest {
            salary_min: Some(150_000),
            salary_max: Some(100_000),
            ..make_request()
        };
        assert!(validate_new_candidate(&request).is_err());

        let request = CreateCandidateRequest {
            salary_min: Some(100_000),
            salary_max: Some(100_000),
            ..make_request()
        };
        assert!(validate_new_candidate(&request).is_ok());
    }
}
