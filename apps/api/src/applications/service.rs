//! Application packages: creation with quota and duplicate checks, document
//! attachment, status tracking and submission statistics.
//!
//! A package is prepared for the operator, who completes the submission on the
//! employer's site and reports it back with a status update.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::applications::queue::{QueueSnapshot, SubmissionQueue};
use crate::applications::status::{ApplicationStatus, OutcomeChange};
use crate::applications::tracking::{
    detect_method, email_alias, email_draft, new_pixel_id, pixel_url, tracked_url,
    ApplicationMethod, EmailDraft, EmailParts, UtmParams,
};
use crate::candidates::fetch_candidate;
use crate::config::Config;
use crate::cover_letters::generator::{latest_letter_for_job, record_usage, UsageOutcome};
use crate::errors::AppError;
use crate::jobs::fetch_job;
use crate::limits::{self, LimitKind};
use crate::models::application::ApplicationRow;
use crate::models::candidate::CandidateRow;
use crate::models::job::{JobMatchRow, JobRow};
use crate::models::LabelCount;
use crate::tailoring::service::{bump_counter, latest_version_for_job, VersionCounter};

pub const MAX_AUTO_SUBMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct ApplicationPackage {
    pub application: ApplicationRow,
    pub tracking_pixel_url: String,
    pub email: Option<EmailDraft>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct AutoSubmitSummary {
    pub queued: usize,
    pub skipped: usize,
    pub application_ids: Vec<Uuid>,
}

pub async fn fetch_application(db: &PgPool, application_id: Uuid) -> Result<ApplicationRow, AppError> {
    sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = $1")
        .bind(application_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))
}

/// Inserts a `pending` application with its alias, pixel id and tracked URL.
///
/// Fails with `Conflict` when the candidate already has an application for the job and
/// with `RateLimited` when today's quota is spent.
pub async fn create_application(
    db: &PgPool,
    redis: &redis::Client,
    config: &Config,
    candidate: &CandidateRow,
    job: &JobRow,
    method: Option<ApplicationMethod>,
) -> Result<ApplicationRow, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM applications WHERE candidate_id = $1 AND job_id = $2)",
    )
    .bind(candidate.id)
    .bind(job.id)
    .fetch_one(db)
    .await?;
    if exists {
        return Err(AppError::Conflict(format!(
            "Application for job {} already exists",
            job.id
        )));
    }

    limits::acquire_or_reject(redis, LimitKind::Applications, candidate.id).await?;

    let id = Uuid::new_v4();
    let method = method.unwrap_or_else(|| detect_method(&job.apply_url));
    let utm = UtmParams::new(&job.source, id);

    let inserted = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications
            (id, candidate_id, job_id, company, position, method, application_url,
             email_alias, tracking_pixel_id, utm_params, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(candidate.id)
    .bind(job.id)
    .bind(&job.company)
    .bind(&job.title)
    .bind(method.as_str())
    .bind(tracked_url(&job.apply_url, &utm))
    .bind(email_alias(&candidate.email, id, &config.application_email_domain))
    .bind(new_pixel_id())
    .bind(json!(utm))
    .fetch_one(db)
    .await;

    match inserted {
        Ok(row) => Ok(row),
        Err(e) => {
            if let Err(release_err) =
                limits::release(redis, LimitKind::Applications, candidate.id).await
            {
                warn!("Failed to release application quota: {release_err}");
            }
            Err(AppError::from_insert(e, "Application for this job"))
        }
    }
}

/// Attaches the newest resume version and cover letter for the job, marks the match
/// applied and moves the application to `prepared`.
pub async fn prepare_package(
    db: &PgPool,
    tracking_base_url: &str,
    application: &ApplicationRow,
) -> Result<ApplicationPackage, AppError> {
    let candidate = fetch_candidate(db, application.candidate_id).await?;
    let version = latest_version_for_job(db, application.candidate_id, application.job_id).await?;
    let letter = latest_letter_for_job(db, application.candidate_id, application.job_id).await?;

    let prepared = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET
            resume_version_id = $2,
            cover_letter_id   = $3,
            status            = 'prepared',
            error_message     = NULL,
            updated_at        = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(application.id)
    .bind(version.as_ref().map(|v| v.id))
    .bind(letter.as_ref().map(|l| l.id))
    .fetch_one(db)
    .await?;

    mark_match_applied(db, application.candidate_id, application.job_id).await?;
    if let Some(version) = &version {
        bump_counter(db, version.id, VersionCounter::ApplicationSent).await?;
    }
    if let Some(letter) = &letter {
        record_usage(db, letter.id, true, None).await?;
    }

    let tracking_pixel_url = pixel_url(tracking_base_url, &prepared.tracking_pixel_id);
    let email = (prepared.method == ApplicationMethod::EmailApply.as_str())
        .then(|| {
            email_draft(&EmailParts {
                apply_url: &prepared.application_url,
                position: &prepared.position,
                company: &prepared.company,
                candidate_name: &candidate.full_name,
                candidate_phone: candidate.phone.as_deref(),
                alias: &prepared.email_alias,
                cover_letter: letter.as_ref().map(|l| l.content.as_str()),
                pixel_url: &tracking_pixel_url,
            })
        })
        .flatten();

    info!(
        "Prepared application {} for {} at {} ({})",
        prepared.id, candidate.full_name, prepared.company, prepared.method
    );

    Ok(ApplicationPackage {
        application: prepared,
        tracking_pixel_url,
        email,
    })
}

async fn mark_failed(db: &PgPool, application_id: Uuid, error: &str) {
    let result = sqlx::query(
        "UPDATE applications SET status = 'failed', error_message = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(application_id)
    .bind(error)
    .execute(db)
    .await;
    if let Err(e) = result {
        warn!("Failed to mark application {application_id} as failed: {e}");
    }
}

async fn mark_match_applied(db: &PgPool, candidate_id: Uuid, job_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE job_matches SET applied = TRUE WHERE candidate_id = $1 AND job_id = $2")
        .bind(candidate_id)
        .bind(job_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Creates and prepares one package through the submission queue.
pub async fn submit_application(
    db: &PgPool,
    redis: &redis::Client,
    config: &Config,
    queue: &SubmissionQueue,
    candidate_id: Uuid,
    job_id: Uuid,
    method: Option<ApplicationMethod>,
) -> Result<ApplicationPackage, AppError> {
    let candidate = fetch_candidate(db, candidate_id).await?;
    let job = fetch_job(db, job_id).await?;
    let application = create_application(db, redis, config, &candidate, &job, method).await?;

    let prepared = queue
        .run(prepare_package(db, &config.tracking_base_url, &application))
        .await;
    if let Err(e) = &prepared {
        mark_failed(db, application.id, &e.to_string()).await;
    }
    prepared
}

/// Queues packages for the candidate's best unapplied matches.
///
/// Duplicates are skipped; once the daily quota runs out the remaining matches are
/// skipped too. Preparation runs in the background through the queue.
pub async fn auto_submit(
    db: &PgPool,
    redis: &redis::Client,
    config: &Config,
    queue: &SubmissionQueue,
    candidate_id: Uuid,
    max_applications: usize,
    min_match_score: Option<f64>,
) -> Result<AutoSubmitSummary, AppError> {
    if !(1..=MAX_AUTO_SUBMIT).contains(&max_applications) {
        return Err(AppError::Validation(format!(
            "max_applications must be between 1 and {MAX_AUTO_SUBMIT}"
        )));
    }
    let candidate = fetch_candidate(db, candidate_id).await?;

    let matches = sqlx::query_as::<_, JobMatchRow>(
        r#"
        SELECT * FROM job_matches
        WHERE candidate_id = $1 AND should_apply AND NOT applied AND match_score >= $2
        ORDER BY match_score DESC
        LIMIT $3
        "#,
    )
    .bind(candidate_id)
    .bind(min_match_score.unwrap_or(0.0))
    .bind(max_applications as i64)
    .fetch_all(db)
    .await?;

    let mut summary = AutoSubmitSummary::default();
    for (idx, job_match) in matches.iter().enumerate() {
        let job = match fetch_job(db, job_match.job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!("Skipping match {}: {e}", job_match.id);
                summary.skipped += 1;
                continue;
            }
        };

        match create_application(db, redis, config, &candidate, &job, None).await {
            Ok(application) => {
                mark_match_applied(db, candidate_id, job.id).await?;
                summary.application_ids.push(application.id);
                summary.queued += 1;

                let pool = db.clone();
                let base_url = config.tracking_base_url.clone();
                queue.spawn(async move {
                    if let Err(e) = prepare_package(&pool, &base_url, &application).await {
                        warn!("Preparing application {} failed: {e}", application.id);
                        mark_failed(&pool, application.id, &e.to_string()).await;
                    }
                });
            }
            Err(AppError::Conflict(_)) => {
                mark_match_applied(db, candidate_id, job.id).await?;
                summary.skipped += 1;
            }
            Err(AppError::RateLimited(msg)) => {
                info!("{msg}; skipping remaining matches");
                summary.skipped += matches.len() - idx;
                break;
            }
            Err(e) => {
                warn!("Could not create application for job {}: {e}", job.id);
                summary.skipped += 1;
            }
        }
    }

    info!(
        "Auto-submit for candidate {candidate_id}: {} queued, {} skipped",
        summary.queued, summary.skipped
    );
    Ok(summary)
}

/// Moves an application to `status`, stamping `applied_at` / `response_at` and bumping
/// the attached documents' performance counters once per milestone.
pub async fn update_status(
    db: &PgPool,
    application_id: Uuid,
    status: &str,
    notes: Option<&str>,
) -> Result<ApplicationRow, AppError> {
    let next = ApplicationStatus::parse(status).ok_or_else(|| {
        let allowed: Vec<&str> = ApplicationStatus::ALL.iter().map(|s| s.as_str()).collect();
        AppError::Validation(format!(
            "invalid status '{status}', expected one of: {}",
            allowed.join(", ")
        ))
    })?;
    let current = fetch_application(db, application_id).await?;
    let change = OutcomeChange::between(
        ApplicationStatus::parse(&current.status),
        next,
        current.response_at.is_some(),
    );

    let updated = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET
            status      = $2,
            notes       = COALESCE($3, notes),
            applied_at  = CASE WHEN $2 = 'applied' THEN COALESCE(applied_at, NOW()) ELSE applied_at END,
            response_at = CASE WHEN $4 THEN COALESCE(response_at, NOW()) ELSE response_at END,
            updated_at  = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(application_id)
    .bind(next.as_str())
    .bind(notes)
    .bind(next.is_response())
    .fetch_one(db)
    .await?;

    if let Some(version_id) = updated.resume_version_id {
        let bumps = [
            (change.response, VersionCounter::Response),
            (change.interview, VersionCounter::Interview),
            (change.offer, VersionCounter::Offer),
        ];
        for (_, counter) in bumps.into_iter().filter(|(due, _)| *due) {
            bump_counter(db, version_id, counter).await?;
        }
    }
    if let Some(letter_id) = updated.cover_letter_id {
        if change.response {
            record_usage(db, letter_id, false, Some(UsageOutcome::Response)).await?;
        }
        if change.interview {
            record_usage(db, letter_id, false, Some(UsageOutcome::Interview)).await?;
        }
    }

    info!(
        "Application {application_id}: {} -> {}",
        current.status,
        next.as_str()
    );
    Ok(updated)
}

/// Stamps `viewed_at` the first time a pixel is loaded. Unknown pixels are ignored.
pub async fn record_pixel_view(db: &PgPool, pixel_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE applications SET viewed_at = NOW(), updated_at = NOW()
        WHERE tracking_pixel_id = $1 AND viewed_at IS NULL
        "#,
    )
    .bind(pixel_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_for_candidate(db: &PgPool, candidate_id: Uuid) -> Result<Vec<ApplicationRow>, AppError> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE candidate_id = $1 ORDER BY created_at DESC",
    )
    .bind(candidate_id)
    .fetch_all(db)
    .await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Statistics
// ────────────────────────────────────────────────────────────────────────────

/// Statuses counted as a completed submission.
pub const SUBMITTED_STATUSES: &str = "('applied','reviewing','interviewed','offered','accepted','rejected')";

#[derive(Debug, Default, Serialize, FromRow)]
pub struct ApplicationCounts {
    pub total_applications: i64,
    pub successful_applications: i64,
    pub pending_applications: i64,
    pub failed_applications: i64,
    pub applications_today: i64,
}

#[derive(Debug, Serialize)]
pub struct SubmissionStatistics {
    #[serde(flatten)]
    pub counts: ApplicationCounts,
    #[serde(flatten)]
    pub queue: QueueSnapshot,
}

pub async fn submission_stats(
    db: &PgPool,
    queue: &SubmissionQueue,
) -> Result<SubmissionStatistics, AppError> {
    let counts = sqlx::query_as::<_, ApplicationCounts>(&format!(
        r#"
        SELECT
            COUNT(*)                                                  AS total_applications,
            COUNT(*) FILTER (WHERE status IN {SUBMITTED_STATUSES})    AS successful_applications,
            COUNT(*) FILTER (WHERE status IN ('pending','prepared'))  AS pending_applications,
            COUNT(*) FILTER (WHERE status = 'failed')                 AS failed_applications,
            COUNT(*) FILTER (WHERE created_at >= CURRENT_DATE)        AS applications_today
        FROM applications
        "#
    ))
    .fetch_one(db)
    .await?;

    Ok(SubmissionStatistics {
        counts,
        queue: queue.snapshot(),
    })
}

#[derive(Debug, Serialize)]
pub struct OverallStats {
    pub total_applications: i64,
    pub successful_applications: i64,
    pub success_rate: f64,
    pub response_rate: f64,
}

impl OverallStats {
    pub fn new(total: i64, successful: i64, responses: i64) -> Self {
        let pct = |n: i64| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };
        Self {
            total_applications: total,
            successful_applications: successful,
            success_rate: pct(successful),
            response_rate: pct(responses),
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ApplicationAnalytics {
    pub overall_stats: OverallStats,
    pub applications_by_method: Vec<LabelCount>,
    pub daily_applications: Vec<DailyCount>,
    pub top_companies: Vec<LabelCount>,
    pub status_breakdown: Vec<LabelCount>,
}

pub async fn analytics(db: &PgPool) -> Result<ApplicationAnalytics, AppError> {
    let (total, successful, responses): (i64, i64, i64) = sqlx::query_as(&format!(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status IN {SUBMITTED_STATUSES}),
            COUNT(*) FILTER (WHERE response_at IS NOT NULL)
        FROM applications
        "#
    ))
    .fetch_one(db)
    .await?;

    let applications_by_method = sqlx::query_as::<_, LabelCount>(
        "SELECT method AS label, COUNT(*) AS count FROM applications GROUP BY method ORDER BY count DESC",
    )
    .fetch_all(db)
    .await?;

    let daily_applications = sqlx::query_as::<_, DailyCount>(
        r#"
        SELECT created_at::date AS date, COUNT(*) AS count
        FROM applications
        WHERE created_at > NOW() - INTERVAL '30 days'
        GROUP BY created_at::date
        ORDER BY date
        "#,
    )
    .fetch_all(db)
    .await?;

    let top_companies = sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT company AS label, COUNT(*) AS count
        FROM applications
        GROUP BY company
        ORDER BY count DESC
        LIMIT 10
        "#,
    )
    .fetch_all(db)
    .await?;

    let status_breakdown = sqlx::query_as::<_, LabelCount>(
        "SELECT status AS label, COUNT(*) AS count FROM applications GROUP BY status ORDER BY count DESC",
    )
    .fetch_all(db)
    .await?;

    Ok(ApplicationAnalytics {
        overall_stats: OverallStats::new(total, successful, responses),
        applications_by_method,
        daily_applications,
        top_companies,
        status_breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_stats_rates() {
        let stats = OverallStats::new(8, 6, 2);
        assert_eq!(stats.success_rate, 75.0);
        assert_eq!(stats.response_rate, 25.0);

        let empty = OverallStats::new(0, 0, 0);
        assert_eq!(empty.success_rate, 0.0);
    }

    #[test]
    fn test_submission_statistics_shape() {
        let stats = SubmissionStatistics {
            counts: ApplicationCounts {
                total_applications: 3,
                ..Default::default()
            },
            queue: SubmissionQueue::default().snapshot(),
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["total_applications"], 3);
        assert_eq!(value["queue_size"], 0);
        assert_eq!(value["active_submissions"], 0);
    }
}
