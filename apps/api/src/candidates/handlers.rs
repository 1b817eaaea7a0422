//! Axum route handlers for the Candidates API.

use aws_sdk_s3::primitives::ByteStream;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::candidates::extract::{extract_text, ResumeFormat, MAX_UPLOAD_BYTES};
use crate::candidates::parser::{assess_quality, parse_resume, ParsedResume, ResumeQuality};
use crate::candidates::{fetch_candidate, validate_new_candidate};
use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, ResumeRow};
use crate::routes::Pagination;
use crate::state::AppState;
use crate::tailoring::ats::score_resume;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCandidateRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub target_companies: Vec<String>,
    #[serde(default)]
    pub target_locations: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    #[serde(default)]
    pub visa_sponsorship_required: bool,
    pub work_authorization: Option<String>,
    pub years_experience: Option<i32>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub automation_enabled: Option<bool>,
}

/// Every field optional; only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCandidateRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub target_roles: Option<Vec<String>>,
    pub target_companies: Option<Vec<String>>,
    pub target_locations: Option<Vec<String>>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub visa_sponsorship_required: Option<bool>,
    pub work_authorization: Option<String>,
    pub years_experience: Option<i32>,
    pub skills: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub automation_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ResumeUploadResponse {
    pub resume_id: Uuid,
    pub file_key: String,
    pub parsed: ParsedResume,
    pub quality: ResumeQuality,
    pub ats_score: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/candidates
///
/// Creates a candidate profile. Email must be unique.
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<(StatusCode, Json<CandidateRow>), AppError> {
    validate_new_candidate(&request)?;

    let candidate = sqlx::query_as::<_, CandidateRow>(
        r#"
        INSERT INTO candidates
            (id, full_name, email, phone, location, linkedin_url, github_url, portfolio_url,
             target_roles, target_companies, target_locations, salary_min, salary_max,
             visa_sponsorship_required, work_authorization, years_experience, skills,
             automation_enabled)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.full_name.trim())
    .bind(request.email.trim().to_lowercase())
    .bind(&request.phone)
    .bind(&request.location)
    .bind(&request.linkedin_url)
    .bind(&request.github_url)
    .bind(&request.portfolio_url)
    .bind(&request.target_roles)
    .bind(&request.target_companies)
    .bind(&request.target_locations)
    .bind(request.salary_min)
    .bind(request.salary_max)
    .bind(request.visa_sponsorship_required)
    .bind(&request.work_authorization)
    .bind(request.years_experience)
    .bind(&request.skills)
    .bind(request.automation_enabled.unwrap_or(true))
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::from_insert(e, "Candidate with this email"))?;

    info!("Created candidate {} ({})", candidate.id, candidate.email);
    Ok((StatusCode::CREATED, Json(candidate)))
}

/// GET /api/candidates?skip&limit
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<CandidateRow>>, AppError> {
    let candidates = sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates ORDER BY created_at DESC OFFSET $1 LIMIT $2",
    )
    .bind(page.offset())
    .bind(page.capped_limit())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(candidates))
}

/// GET /api/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateRow>, AppError> {
    Ok(Json(fetch_candidate(&state.db, candidate_id).await?))
}

/// PUT /api/candidates/:id
///
/// Partial update. Fields left out of the body keep their current value.
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(request): Json<UpdateCandidateRequest>,
) -> Result<Json<CandidateRow>, AppError> {
    let existing = fetch_candidate(&state.db, candidate_id).await?;

    if let Some(name) = &request.full_name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("full_name cannot be empty".to_string()));
        }
    }
    if let Some(email) = &request.email {
        if !email.contains('@') {
            return Err(AppError::Validation("email must be a valid address".to_string()));
        }
    }
    let salary_min = request.salary_min.or(existing.salary_min);
    let salary_max = request.salary_max.or(existing.salary_max);
    if let (Some(min), Some(max)) = (salary_min, salary_max) {
        if min > max {
            return Err(AppError::Validation(
                "salary_min cannot exceed salary_max".to_string(),
            ));
        }
    }

    let candidate = sqlx::query_as::<_, CandidateRow>(
        r#"
        UPDATE candidates SET
            full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            location = COALESCE($5, location),
            linkedin_url = COALESCE($6, linkedin_url),
            github_url = COALESCE($7, github_url),
            portfolio_url = COALESCE($8, portfolio_url),
            target_roles = COALESCE($9, target_roles),
            target_companies = COALESCE($10, target_companies),
            target_locations = COALESCE($11, target_locations),
            salary_min = COALESCE($12, salary_min),
            salary_max = COALESCE($13, salary_max),
            visa_sponsorship_required = COALESCE($14, visa_sponsorship_required),
            work_authorization = COALESCE($15, work_authorization),
            years_experience = COALESCE($16, years_experience),
            skills = COALESCE($17, skills),
            is_active = COALESCE($18, is_active),
            automation_enabled = COALESCE($19, automation_enabled),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(candidate_id)
    .bind(request.full_name.as_deref().map(str::trim))
    .bind(request.email.as_deref().map(|e| e.trim().to_lowercase()))
    .bind(&request.phone)
    .bind(&request.location)
    .bind(&request.linkedin_url)
    .bind(&request.github_url)
    .bind(&request.portfolio_url)
    .bind(&request.target_roles)
    .bind(&request.target_companies)
    .bind(&request.target_locations)
    .bind(request.salary_min)
    .bind(request.salary_max)
    .bind(request.visa_sponsorship_required)
    .bind(&request.work_authorization)
    .bind(request.years_experience)
    .bind(&request.skills)
    .bind(request.is_active)
    .bind(request.automation_enabled)
    .fetch_one(&state.db)
    .await
    .map_err(|e| AppError::from_insert(e, "Candidate with this email"))?;

    Ok(Json(candidate))
}

/// POST /api/candidates/:id/resume/upload
///
/// Multipart upload (field `file`). Stores the original in S3, parses the text,
/// records it as the candidate's primary resume and fills empty profile fields.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeUploadResponse>), AppError> {
    let candidate = fetch_candidate(&state.db, candidate_id).await?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("resume").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            upload = Some((file_name, data));
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;

    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::UnprocessableEntity(
            "File too large. Maximum size is 10MB".to_string(),
        ));
    }

    let format = ResumeFormat::from_file_name(&file_name)?;

    let text = {
        let data = data.clone();
        tokio::task::spawn_blocking(move || extract_text(format, &data))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Extraction task failed: {e}")))??
    };

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No text could be extracted from the file".to_string(),
        ));
    }

    let resume_id = Uuid::new_v4();
    let file_key = format!(
        "resumes/{}/{}.{}",
        candidate_id,
        resume_id,
        format.extension()
    );

    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&file_key)
        .body(ByteStream::from(data.to_vec()))
        .content_type(format.content_type())
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Resume upload failed: {e}")))?;

    info!("Uploaded resume to s3://{}/{}", state.config.s3_bucket, file_key);

    let parsed = parse_resume(&text);
    let quality = assess_quality(&parsed);
    let ats_score = score_resume(&text, None).overall;

    let mut tx = state.db.begin().await?;

    sqlx::query("UPDATE resumes SET is_primary = FALSE WHERE candidate_id = $1")
        .bind(candidate_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO resumes
            (id, candidate_id, version_name, file_name, file_key, extracted_text,
             skills, experience_years, is_primary, ats_score)
        VALUES ($1, $2, 'Original', $3, $4, $5, $6, $7, TRUE, $8)
        "#,
    )
    .bind(resume_id)
    .bind(candidate_id)
    .bind(&file_name)
    .bind(&file_key)
    .bind(&text)
    .bind(&parsed.skills)
    .bind(parsed.years_experience)
    .bind(ats_score)
    .execute(&mut *tx)
    .await?;

    let fill_skills = candidate.skills.is_empty() && !parsed.skills.is_empty();
    sqlx::query(
        r#"
        UPDATE candidates SET
            phone = COALESCE(phone, $2),
            location = COALESCE(location, $3),
            linkedin_url = COALESCE(linkedin_url, $4),
            github_url = COALESCE(github_url, $5),
            skills = CASE WHEN $6 THEN $7 ELSE skills END,
            years_experience = COALESCE(years_experience, $8),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(candidate_id)
    .bind(&parsed.phone)
    .bind(&parsed.location)
    .bind(&parsed.linkedin_url)
    .bind(&parsed.github_url)
    .bind(fill_skills)
    .bind(&parsed.skills)
    .bind(parsed.years_experience)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Parsed resume {resume_id} for candidate {candidate_id}: {} skills, quality {}",
        parsed.skills.len(),
        quality.score
    );

    Ok((
        StatusCode::CREATED,
        Json(ResumeUploadResponse {
            resume_id,
            file_key,
            parsed,
            quality,
            ats_score,
        }),
    ))
}

/// GET /api/candidates/:id/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    fetch_candidate(&state.db, candidate_id).await?;

    let resumes = sqlx::query_as::<_, ResumeRow>(
        "SELECT * FROM resumes WHERE candidate_id = $1 ORDER BY created_at DESC",
    )
    .bind(candidate_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(resumes))
}
