//! One scrape run: search pages, fetch details for unseen cards, enrich, store, log.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::scraping::enrich::{enrich, EnrichedJob};
use crate::scraping::source::JobSource;
use crate::scraping::{ScrapeError, ScrapeQuery};

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub log_id: Uuid,
    pub schedule_name: String,
    pub status: String,
    pub jobs_found: u32,
    pub jobs_saved: u32,
    pub pages_scraped: u32,
    pub blocked: bool,
    pub error: Option<String>,
}

/// Runs a scrape and records it in `scraping_logs`. Blocks and source errors end the run
/// early but still produce an outcome; only database failures are returned as `Err`.
pub async fn run_scrape(
    db: &PgPool,
    source: &dyn JobSource,
    schedule_name: &str,
    query: &ScrapeQuery,
    max_pages: u32,
    delay: Duration,
) -> Result<ScrapeOutcome, AppError> {
    let log_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO scraping_logs (id, schedule_name, source, status) VALUES ($1, $2, $3, 'running')",
    )
    .bind(log_id)
    .bind(schedule_name)
    .bind(source.name())
    .execute(db)
    .await?;

    info!(
        "Scrape '{}' started: '{}' in '{}' ({} pages)",
        schedule_name, query.query, query.location, max_pages
    );

    let mut outcome = ScrapeOutcome {
        log_id,
        schedule_name: schedule_name.to_string(),
        status: "running".to_string(),
        jobs_found: 0,
        jobs_saved: 0,
        pages_scraped: 0,
        blocked: false,
        error: None,
    };

    let result = scrape_pages(db, source, query, max_pages, delay, &mut outcome).await;

    match result {
        Ok(()) => outcome.status = "completed".to_string(),
        Err(PipelineError::Source(ScrapeError::Blocked { url, reason })) => {
            warn!("Scrape '{schedule_name}' stopped: blocked at {url} ({reason})");
            outcome.blocked = true;
            outcome.status = "blocked".to_string();
            outcome.error = Some(format!("Blocked at {url}: {reason}"));
        }
        Err(PipelineError::Source(e)) => {
            warn!("Scrape '{schedule_name}' failed: {e}");
            outcome.status = "error".to_string();
            outcome.error = Some(e.to_string());
        }
        Err(PipelineError::App(e)) => {
            outcome.status = "error".to_string();
            outcome.error = Some(e.to_string());
            finish_log(db, &outcome).await?;
            return Err(e);
        }
    }

    finish_log(db, &outcome).await?;

    info!(
        "Scrape '{}' {}: {} found, {} saved over {} pages",
        schedule_name, outcome.status, outcome.jobs_found, outcome.jobs_saved, outcome.pages_scraped
    );
    Ok(outcome)
}

enum PipelineError {
    Source(ScrapeError),
    App(AppError),
}

impl From<ScrapeError> for PipelineError {
    fn from(err: ScrapeError) -> Self {
        PipelineError::Source(err)
    }
}

impl From<AppError> for PipelineError {
    fn from(err: AppError) -> Self {
        PipelineError::App(err)
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::App(AppError::Database(err))
    }
}

async fn scrape_pages(
    db: &PgPool,
    source: &dyn JobSource,
    query: &ScrapeQuery,
    max_pages: u32,
    delay: Duration,
    outcome: &mut ScrapeOutcome,
) -> Result<(), PipelineError> {
    for page in 0..max_pages {
        if page > 0 {
            tokio::time::sleep(delay).await;
        }

        let cards = source.search(query, page).await?;
        outcome.pages_scraped += 1;
        if cards.is_empty() {
            break;
        }
        outcome.jobs_found += cards.len() as u32;

        for card in cards {
            let known: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs_raw WHERE apply_url = $1)")
                    .bind(&card.apply_url)
                    .fetch_one(db)
                    .await?;
            if known {
                continue;
            }

            tokio::time::sleep(delay).await;
            let detailed = match source.fetch_details(card.clone()).await {
                Ok(job) => job,
                Err(e @ ScrapeError::Blocked { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!("Details fetch failed for {}: {e}", card.apply_url);
                    card
                }
            };

            if insert_job(db, &enrich(detailed, Utc::now())).await? {
                outcome.jobs_saved += 1;
            }
        }
    }
    Ok(())
}

/// Inserts a job, ignoring duplicates on `apply_url`. Returns whether a row was written.
pub async fn insert_job(db: &PgPool, job: &EnrichedJob) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO jobs_raw
            (id, source, source_job_id, title, company, location, job_type, experience_level,
             salary_range, description, skills, requirements, benefits, visa_sponsorship,
             remote_work, apply_url, posted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        ON CONFLICT (apply_url) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&job.source)
    .bind(&job.source_job_id)
    .bind(&job.title)
    .bind(&job.company)
    .bind(&job.location)
    .bind(&job.job_type)
    .bind(&job.experience_level)
    .bind(&job.salary_range)
    .bind(&job.description)
    .bind(&job.skills)
    .bind(&job.requirements)
    .bind(&job.benefits)
    .bind(job.visa_sponsorship)
    .bind(job.remote_work)
    .bind(&job.apply_url)
    .bind(job.posted_at)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn finish_log(db: &PgPool, outcome: &ScrapeOutcome) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE scraping_logs
        SET status = $2, jobs_found = $3, jobs_saved = $4, error = $5, completed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(outcome.log_id)
    .bind(&outcome.status)
    .bind(outcome.jobs_found as i32)
    .bind(outcome.jobs_saved as i32)
    .bind(&outcome.error)
    .execute(db)
    .await?;
    Ok(())
}
