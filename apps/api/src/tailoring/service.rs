//! Resume tailoring service: turns a stored resume into job-targeted versions, scores them
//! and tracks how each version performs.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::jobs::fetch_job;
use crate::keywords::mentions_skill;
use crate::llm_client::{LlmClient, LlmError, LlmTask};
use crate::models::candidate::ResumeRow;
use crate::models::documents::ResumeVersionRow;
use crate::models::feedback::OptimizationSettingRow;
use crate::models::job::JobRow;
use crate::models::LabelCount;
use crate::tailoring::ats::{score_resume, AtsAnalysis};
use crate::tailoring::genetic::{GaConfig, GaOutcome, GeneticOptimizer, KeywordTargets};
use crate::tailoring::prompts::{build_tailor_prompt, build_variant_prompt, TAILOR_SYSTEM};
use crate::tailoring::sections::{ResumeDocument, EXPERIENCE_KEYS, SKILL_KEYS};

pub const MAX_VARIANTS: usize = 10;
const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailoringStrategy {
    #[default]
    JobSpecific,
    CompanySpecific,
    RoleSpecific,
    IndustrySpecific,
    SkillFocused,
    ExperienceFocused,
}

impl TailoringStrategy {
    pub const ALL: [TailoringStrategy; 6] = [
        TailoringStrategy::JobSpecific,
        TailoringStrategy::CompanySpecific,
        TailoringStrategy::RoleSpecific,
        TailoringStrategy::IndustrySpecific,
        TailoringStrategy::SkillFocused,
        TailoringStrategy::ExperienceFocused,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TailoringStrategy::JobSpecific => "job_specific",
            TailoringStrategy::CompanySpecific => "company_specific",
            TailoringStrategy::RoleSpecific => "role_specific",
            TailoringStrategy::IndustrySpecific => "industry_specific",
            TailoringStrategy::SkillFocused => "skill_focused",
            TailoringStrategy::ExperienceFocused => "experience_focused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Section moved directly under the contact block for this strategy, if any.
    fn lead_section(self) -> Option<&'static [&'static str]> {
        match self {
            TailoringStrategy::SkillFocused => Some(SKILL_KEYS),
            TailoringStrategy::ExperienceFocused => Some(EXPERIENCE_KEYS),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    Basic,
    #[default]
    Advanced,
    Aggressive,
}

impl OptimizationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationLevel::Basic => "basic",
            OptimizationLevel::Advanced => "advanced",
            OptimizationLevel::Aggressive => "aggressive",
        }
    }

    pub fn ga_config(self) -> GaConfig {
        GaConfig::for_level(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailoringMethod {
    #[default]
    Genetic,
    Ai,
}

impl TailoringMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            TailoringMethod::Genetic => "genetic",
            TailoringMethod::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TailorOptions {
    pub strategy: Option<TailoringStrategy>,
    pub level: OptimizationLevel,
    pub method: TailoringMethod,
}

/// First 16 hex chars of sha256(content + timestamp). Distinguishes otherwise identical
/// versions generated at different times.
pub fn content_fingerprint(content: &str, at: DateTime<Utc>) -> String {
    let digest = Sha256::digest(format!("{content}{}", at.timestamp_micros()).as_bytes());
    hex::encode(digest)[..FINGERPRINT_LEN].to_string()
}

/// Text the tailoring keyword targets are drawn from.
pub fn job_text(job: &JobRow) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        job.title,
        job.description,
        job.skills.join(", "),
        job.requirements.join("\n")
    )
}

/// Moves the strategy's lead section under the contact block. Scores are order-independent,
/// so this never changes the ATS result.
pub fn apply_strategy_layout(content: &str, strategy: TailoringStrategy) -> String {
    let Some(keys) = strategy.lead_section() else {
        return content.to_string();
    };
    let mut doc = ResumeDocument::parse(content);
    let first_slot = usize::from(doc.sections.first().is_some_and(|s| s.key.is_none()));
    match doc.find(keys) {
        Some(index) if index > first_slot => {
            let section = doc.sections.remove(index);
            doc.sections.insert(first_slot, section);
            let last = doc.sections.len() - 1;
            for section in doc.sections.iter_mut().take(last) {
                if section.lines.last().map_or(true, |l| !l.trim().is_empty()) {
                    section.lines.push(String::new());
                }
            }
            doc.render()
        }
        _ => content.to_string(),
    }
}

/// Job keywords that appear in `tailored` but not in `original`.
fn new_keywords(original: &str, tailored: &str, keywords: &[String]) -> Vec<String> {
    let before = original.to_lowercase();
    let after = tailored.to_lowercase();
    keywords
        .iter()
        .filter(|k| !mentions_skill(&before, k) && mentions_skill(&after, k))
        .cloned()
        .collect()
}

pub async fn fetch_resume(db: &PgPool, resume_id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

pub async fn fetch_version(db: &PgPool, version_id: Uuid) -> Result<ResumeVersionRow, AppError> {
    sqlx::query_as::<_, ResumeVersionRow>("SELECT * FROM resume_versions WHERE id = $1")
        .bind(version_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume version {version_id} not found")))
}

/// Strategy from the `resume_strategy` optimization setting, or `job_specific`.
pub async fn default_strategy(db: &PgPool) -> Result<TailoringStrategy, AppError> {
    let setting = sqlx::query_as::<_, OptimizationSettingRow>(
        "SELECT * FROM optimization_settings WHERE strategy = 'resume_strategy'",
    )
    .fetch_optional(db)
    .await?;

    Ok(setting
        .and_then(|s| strategy_from_setting(&s.settings))
        .unwrap_or_default())
}

fn strategy_from_setting(settings: &Value) -> Option<TailoringStrategy> {
    settings
        .get("strategies")
        .and_then(Value::as_array)
        .and_then(|list| list.iter().filter_map(Value::as_str).find_map(TailoringStrategy::parse))
        .or_else(|| {
            settings
                .get("strategy")
                .and_then(Value::as_str)
                .and_then(TailoringStrategy::parse)
        })
}

/// Runs the optimizer on the blocking pool.
pub async fn run_genetic(
    resume: String,
    job_description: String,
    skills: Vec<String>,
    config: GaConfig,
) -> Result<GaOutcome, AppError> {
    tokio::task::spawn_blocking(move || {
        GeneticOptimizer::new(config).optimize(&resume, &job_description, &skills)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("Resume optimizer task failed: {e}")))
}

struct NewVersion<'a> {
    candidate_id: Uuid,
    resume_id: Uuid,
    job_id: Option<Uuid>,
    version_name: String,
    strategy: TailoringStrategy,
    level: OptimizationLevel,
    method: &'static str,
    content: String,
    keywords_injected: Vec<String>,
    original: &'a AtsAnalysis,
    tailored: &'a AtsAnalysis,
    generation_params: Value,
}

async fn insert_version(db: &PgPool, version: NewVersion<'_>) -> Result<ResumeVersionRow, AppError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, ResumeVersionRow>(
        r#"
        INSERT INTO resume_versions
            (id, candidate_id, resume_id, job_id, version_name, strategy, optimization_level,
             method, tailored_content, keywords_injected, original_ats_score, ats_score,
             ats_improvement, ats_breakdown, content_fingerprint, generation_params, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(version.candidate_id)
    .bind(version.resume_id)
    .bind(version.job_id)
    .bind(&version.version_name)
    .bind(version.strategy.as_str())
    .bind(version.level.as_str())
    .bind(version.method)
    .bind(&version.content)
    .bind(&version.keywords_injected)
    .bind(version.original.overall)
    .bind(version.tailored.overall)
    .bind(version.tailored.overall - version.original.overall)
    .bind(version.tailored.breakdown())
    .bind(content_fingerprint(&version.content, now))
    .bind(&version.generation_params)
    .bind(now)
    .fetch_one(db)
    .await?;

    info!(
        "Stored resume version {} ({}, ATS {:.1} -> {:.1})",
        row.id, row.version_name, row.original_ats_score, row.ats_score
    );
    Ok(row)
}

/// Tailors a resume for a job and stores the result as a new version.
pub async fn tailor_resume(
    db: &PgPool,
    llm: &LlmClient,
    resume_id: Uuid,
    job_id: Uuid,
    options: TailorOptions,
) -> Result<ResumeVersionRow, AppError> {
    let resume = fetch_resume(db, resume_id).await?;
    let candidate = fetch_candidate(db, resume.candidate_id).await?;
    let job = fetch_job(db, job_id).await?;
    let strategy = match options.strategy {
        Some(strategy) => strategy,
        None => default_strategy(db).await?,
    };
    let jd = job_text(&job);

    if options.method == TailoringMethod::Ai {
        let targets = KeywordTargets::new(&resume.extracted_text, &jd, &candidate.skills);
        let prompt = build_tailor_prompt(
            &resume.extracted_text,
            &jd,
            &targets.allowed,
            strategy,
            options.level,
        );
        match llm.call_text(&prompt, TAILOR_SYSTEM, LlmTask::Tailoring).await {
            Ok(text) if !text.is_empty() => {
                let content = apply_strategy_layout(&text, strategy);
                let original = score_resume(&resume.extracted_text, Some(&jd));
                let tailored = score_resume(&content, Some(&jd));
                let keywords_injected =
                    new_keywords(&resume.extracted_text, &content, &targets.job_keywords);
                return insert_version(
                    db,
                    NewVersion {
                        candidate_id: candidate.id,
                        resume_id,
                        job_id: Some(job.id),
                        version_name: format!(
                            "AI_Tailored_{}_{}",
                            strategy.as_str(),
                            options.level.as_str()
                        ),
                        strategy,
                        level: options.level,
                        method: TailoringMethod::Ai.as_str(),
                        content,
                        keywords_injected,
                        original: &original,
                        tailored: &tailored,
                        generation_params: json!({
                            "method": "ai",
                            "strategy": strategy.as_str(),
                            "optimization_level": options.level.as_str(),
                        }),
                    },
                )
                .await;
            }
            Ok(_) => warn!("LLM returned an empty resume for {resume_id}, using optimizer"),
            Err(LlmError::NotConfigured) => {}
            Err(e) => warn!("AI tailoring failed for resume {resume_id}, using optimizer: {e}"),
        }
    }

    let outcome = run_genetic(
        resume.extracted_text.clone(),
        jd,
        candidate.skills.clone(),
        options.level.ga_config(),
    )
    .await?;

    insert_genetic_version(
        db,
        &resume,
        Some(job.id),
        format!(
            "GA_Optimized_{}_{}",
            strategy.as_str(),
            options.level.as_str()
        ),
        strategy,
        options.level,
        TailoringMethod::Genetic.as_str(),
        outcome,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn insert_genetic_version(
    db: &PgPool,
    resume: &ResumeRow,
    job_id: Option<Uuid>,
    version_name: String,
    strategy: TailoringStrategy,
    level: OptimizationLevel,
    method: &'static str,
    outcome: GaOutcome,
) -> Result<ResumeVersionRow, AppError> {
    let content = apply_strategy_layout(&outcome.content, strategy);
    let generation_params = json!({
        "method": "genetic",
        "strategy": strategy.as_str(),
        "optimization_level": level.as_str(),
        "generations_run": outcome.generations_run,
        "fitness": outcome.fitness,
        "original_fitness": outcome.original_fitness,
        "fitness_history": outcome.fitness_history,
        "mutations": outcome.mutations_applied,
    });

    insert_version(
        db,
        NewVersion {
            candidate_id: resume.candidate_id,
            resume_id: resume.id,
            job_id,
            version_name,
            strategy,
            level,
            method,
            content,
            keywords_injected: outcome.keywords_injected,
            original: &outcome.original_analysis,
            tailored: &outcome.analysis,
            generation_params,
        },
    )
    .await
}

/// Generates `count` versions cycling through `strategies`. Uses the LLM when it answers,
/// otherwise the optimizer with the same strategy.
pub async fn generate_variants(
    db: &PgPool,
    llm: &LlmClient,
    resume_id: Uuid,
    count: usize,
    strategies: &[TailoringStrategy],
    job_id: Option<Uuid>,
) -> Result<Vec<ResumeVersionRow>, AppError> {
    if !(1..=MAX_VARIANTS).contains(&count) {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_VARIANTS}"
        )));
    }
    let strategies = if strategies.is_empty() {
        &[
            TailoringStrategy::JobSpecific,
            TailoringStrategy::SkillFocused,
            TailoringStrategy::ExperienceFocused,
        ][..]
    } else {
        strategies
    };

    let resume = fetch_resume(db, resume_id).await?;
    let candidate = fetch_candidate(db, resume.candidate_id).await?;
    let job = match job_id {
        Some(id) => Some(fetch_job(db, id).await?),
        None => None,
    };
    let jd = job.as_ref().map(job_text);
    let level = OptimizationLevel::Advanced;

    let mut variants = Vec::with_capacity(count);
    for i in 0..count {
        let strategy = strategies[i % strategies.len()];
        let version_name = format!("Variant_{}_{}", i + 1, strategy.as_str());

        if llm.is_configured() {
            let prompt = build_variant_prompt(&resume.extracted_text, jd.as_deref(), strategy);
            match llm.call_text(&prompt, TAILOR_SYSTEM, LlmTask::Tailoring).await {
                Ok(text) if !text.is_empty() => {
                    let content = apply_strategy_layout(&text, strategy);
                    let original = score_resume(&resume.extracted_text, jd.as_deref());
                    let tailored = score_resume(&content, jd.as_deref());
                    let keywords = tailored.job_keywords.clone();
                    variants.push(
                        insert_version(
                            db,
                            NewVersion {
                                candidate_id: resume.candidate_id,
                                resume_id,
                                job_id,
                                version_name,
                                strategy,
                                level,
                                method: "variant",
                                keywords_injected: new_keywords(
                                    &resume.extracted_text,
                                    &content,
                                    &keywords,
                                ),
                                content,
                                original: &original,
                                tailored: &tailored,
                                generation_params: json!({
                                    "method": "ai",
                                    "strategy": strategy.as_str(),
                                    "variant": i + 1,
                                }),
                            },
                        )
                        .await?,
                    );
                    continue;
                }
                Ok(_) => warn!("LLM returned an empty variant, using optimizer"),
                Err(e) => warn!("Variant generation via LLM failed, using optimizer: {e}"),
            }
        }

        let outcome = run_genetic(
            resume.extracted_text.clone(),
            jd.clone().unwrap_or_default(),
            candidate.skills.clone(),
            level.ga_config(),
        )
        .await?;
        variants.push(
            insert_genetic_version(
                db,
                &resume,
                job_id,
                version_name,
                strategy,
                level,
                "variant",
                outcome,
            )
            .await?,
        );
    }

    Ok(variants)
}

// ────────────────────────────────────────────────────────────────────────────
// Performance tracking
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCounter {
    ApplicationSent,
    Response,
    Interview,
    Offer,
}

impl VersionCounter {
    fn column(self) -> &'static str {
        match self {
            VersionCounter::ApplicationSent => "applications_sent",
            VersionCounter::Response => "responses_received",
            VersionCounter::Interview => "interviews_scheduled",
            VersionCounter::Offer => "offers_received",
        }
    }
}

/// Adds one to a performance counter of a version.
pub async fn bump_counter(
    db: &PgPool,
    version_id: Uuid,
    counter: VersionCounter,
) -> Result<(), AppError> {
    let column = counter.column();
    sqlx::query(&format!(
        "UPDATE resume_versions SET {column} = {column} + 1 WHERE id = $1"
    ))
    .bind(version_id)
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct PerformanceUpdate {
    pub applications_sent: Option<i32>,
    pub responses_received: Option<i32>,
    pub interviews_scheduled: Option<i32>,
    pub offers_received: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionPerformance {
    pub resume_version_id: Uuid,
    pub version_name: String,
    pub strategy: String,
    pub method: String,
    pub ats_score: f64,
    pub applications_sent: i32,
    pub responses_received: i32,
    pub interviews_scheduled: i32,
    pub offers_received: i32,
    pub response_rate: f64,
    pub interview_rate: f64,
    pub offer_rate: f64,
}

fn rate(count: i32, applications: i32) -> f64 {
    count as f64 / applications.max(1) as f64
}

impl From<&ResumeVersionRow> for VersionPerformance {
    fn from(row: &ResumeVersionRow) -> Self {
        Self {
            resume_version_id: row.id,
            version_name: row.version_name.clone(),
            strategy: row.strategy.clone(),
            method: row.method.clone(),
            ats_score: row.ats_score,
            applications_sent: row.applications_sent,
            responses_received: row.responses_received,
            interviews_scheduled: row.interviews_scheduled,
            offers_received: row.offers_received,
            response_rate: rate(row.responses_received, row.applications_sent),
            interview_rate: rate(row.interviews_scheduled, row.applications_sent),
            offer_rate: rate(row.offers_received, row.applications_sent),
        }
    }
}

/// Overwrites the given counters with absolute values.
pub async fn update_performance(
    db: &PgPool,
    version_id: Uuid,
    update: &PerformanceUpdate,
) -> Result<VersionPerformance, AppError> {
    for value in [
        update.applications_sent,
        update.responses_received,
        update.interviews_scheduled,
        update.offers_received,
    ]
    .into_iter()
    .flatten()
    {
        if value < 0 {
            return Err(AppError::Validation(
                "performance counts cannot be negative".to_string(),
            ));
        }
    }

    let row = sqlx::query_as::<_, ResumeVersionRow>(
        r#"
        UPDATE resume_versions SET
            applications_sent    = COALESCE($2, applications_sent),
            responses_received   = COALESCE($3, responses_received),
            interviews_scheduled = COALESCE($4, interviews_scheduled),
            offers_received      = COALESCE($5, offers_received)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(version_id)
    .bind(update.applications_sent)
    .bind(update.responses_received)
    .bind(update.interviews_scheduled)
    .bind(update.offers_received)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Resume version {version_id} not found")))?;

    Ok(VersionPerformance::from(&row))
}

#[derive(Debug, Default, Serialize)]
pub struct PerformanceSummary {
    pub total_versions: usize,
    pub total_applications: i64,
    pub total_responses: i64,
    pub total_interviews: i64,
    pub total_offers: i64,
    pub overall_response_rate: f64,
    pub overall_interview_rate: f64,
    pub overall_offer_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct BestPerformer {
    pub resume_version_id: Uuid,
    pub version_name: String,
    pub response_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CandidatePerformance {
    pub candidate_id: Uuid,
    pub summary: PerformanceSummary,
    pub best_performer: Option<BestPerformer>,
    pub versions: Vec<VersionPerformance>,
}

pub fn summarize_performance(candidate_id: Uuid, rows: &[ResumeVersionRow]) -> CandidatePerformance {
    let versions: Vec<VersionPerformance> = rows.iter().map(VersionPerformance::from).collect();

    let total_applications: i64 = versions.iter().map(|v| i64::from(v.applications_sent)).sum();
    let total_responses: i64 = versions.iter().map(|v| i64::from(v.responses_received)).sum();
    let total_interviews: i64 = versions.iter().map(|v| i64::from(v.interviews_scheduled)).sum();
    let total_offers: i64 = versions.iter().map(|v| i64::from(v.offers_received)).sum();
    let denominator = total_applications.max(1) as f64;

    let best_performer = versions
        .iter()
        .filter(|v| v.applications_sent > 0)
        .reduce(|best, v| if v.response_rate > best.response_rate { v } else { best })
        .map(|v| BestPerformer {
            resume_version_id: v.resume_version_id,
            version_name: v.version_name.clone(),
            response_rate: v.response_rate,
        });

    CandidatePerformance {
        candidate_id,
        summary: PerformanceSummary {
            total_versions: versions.len(),
            total_applications,
            total_responses,
            total_interviews,
            total_offers,
            overall_response_rate: total_responses as f64 / denominator,
            overall_interview_rate: total_interviews as f64 / denominator,
            overall_offer_rate: total_offers as f64 / denominator,
        },
        best_performer,
        versions,
    }
}

pub async fn list_versions(
    db: &PgPool,
    candidate_id: Uuid,
    job_id: Option<Uuid>,
) -> Result<Vec<ResumeVersionRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeVersionRow>(
        r#"
        SELECT * FROM resume_versions
        WHERE candidate_id = $1 AND ($2::uuid IS NULL OR job_id = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(candidate_id)
    .bind(job_id)
    .fetch_all(db)
    .await?)
}

#[derive(Debug, Serialize, FromRow)]
pub struct TailoringTotals {
    pub total_versions: i64,
    pub average_ats_score: f64,
    pub average_improvement: f64,
}

#[derive(Debug, Serialize)]
pub struct TailoringStats {
    #[serde(flatten)]
    pub totals: TailoringTotals,
    pub by_strategy: Vec<LabelCount>,
    pub by_method: Vec<LabelCount>,
}

pub async fn tailoring_stats(db: &PgPool) -> Result<TailoringStats, AppError> {
    let totals = sqlx::query_as::<_, TailoringTotals>(
        r#"
        SELECT
            COUNT(*) AS total_versions,
            COALESCE(ROUND(AVG(ats_score)::numeric, 2), 0)::float8 AS average_ats_score,
            COALESCE(ROUND(AVG(ats_improvement)::numeric, 2), 0)::float8 AS average_improvement
        FROM resume_versions
        "#,
    )
    .fetch_one(db)
    .await?;

    let by_strategy = sqlx::query_as::<_, LabelCount>(
        "SELECT strategy AS label, COUNT(*) AS count FROM resume_versions GROUP BY strategy ORDER BY count DESC",
    )
    .fetch_all(db)
    .await?;

    let by_method = sqlx::query_as::<_, LabelCount>(
        "SELECT method AS label, COUNT(*) AS count FROM resume_versions GROUP BY method ORDER BY count DESC",
    )
    .fetch_all(db)
    .await?;

    Ok(TailoringStats {
        totals,
        by_strategy,
        by_method,
    })
}

/// Newest version tailored for this job, else the newest version of the primary resume.
pub async fn latest_version_for_job(
    db: &PgPool,
    candidate_id: Uuid,
    job_id: Uuid,
) -> Result<Option<ResumeVersionRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeVersionRow>(
        r#"
        SELECT v.* FROM resume_versions v
        JOIN resumes r ON r.id = v.resume_id
        WHERE v.candidate_id = $1 AND (v.job_id = $2 OR r.is_primary)
        ORDER BY (v.job_id = $2) DESC NULLS LAST, v.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(candidate_id)
    .bind(job_id)
    .fetch_optional(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_version(name: &str, sent: i32, responses: i32) -> ResumeVersionRow {
        ResumeVersionRow {
            id: Uuid::new_v4(),
            candidate_id: Uuid::nil(),
            resume_id: Uuid::nil(),
            job_id: None,
            version_name: name.to_string(),
            strategy: "job_specific".to_string(),
            optimization_level: "advanced".to_string(),
            method: "genetic".to_string(),
            tailored_content: String::new(),
            keywords_injected: vec![],
            original_ats_score: 60.0,
            ats_score: 70.0,
            ats_improvement: 10.0,
            ats_breakdown: json!({}),
            content_fingerprint: "0123456789abcdef".to_string(),
            generation_params: json!({}),
            applications_sent: sent,
            responses_received: responses,
            interviews_scheduled: 0,
            offers_received: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_strategy_round_trips_through_str() {
        for strategy in TailoringStrategy::ALL {
            assert_eq!(TailoringStrategy::parse(strategy.as_str()), Some(strategy));
        }
        assert_eq!(TailoringStrategy::parse("stealth"), None);
    }

    #[test]
    fn test_strategy_from_setting() {
        let list = json!({"strategies": ["unknown", "skill_focused", "role_specific"]});
        assert_eq!(
            strategy_from_setting(&list),
            Some(TailoringStrategy::SkillFocused)
        );
        let single = json!({"strategy": "experience_focused"});
        assert_eq!(
            strategy_from_setting(&single),
            Some(TailoringStrategy::ExperienceFocused)
        );
        assert_eq!(strategy_from_setting(&json!({})), None);
    }

    #[test]
    fn test_fingerprint_is_16_hex_and_time_dependent() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        let a = content_fingerprint("resume", t1);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, content_fingerprint("resume", t1));
        assert_ne!(a, content_fingerprint("resume", t2));
    }

    #[test]
    fn test_skill_focused_layout_moves_skills_up() {
        let resume = "Jane Doe\n\nEXPERIENCE\n- Built APIs\n\nSKILLS\nRust, Go";
        let laid_out = apply_strategy_layout(resume, TailoringStrategy::SkillFocused);
        assert_eq!(laid_out, "Jane Doe\n\nSKILLS\nRust, Go\n\nEXPERIENCE\n- Built APIs\n");
        assert_eq!(
            apply_strategy_layout(resume, TailoringStrategy::JobSpecific),
            resume
        );
    }

    #[test]
    fn test_new_keywords_only_counts_additions() {
        let keywords = vec!["rust".to_string(), "kubernetes".to_string()];
        let added = new_keywords("Rust developer", "Rust developer, Kubernetes", &keywords);
        assert_eq!(added, vec!["kubernetes".to_string()]);
    }

    #[test]
    fn test_summarize_performance() {
        let rows = vec![
            make_version("A", 10, 2),
            make_version("B", 4, 2),
            make_version("C", 0, 0),
        ];
        let perf = summarize_performance(Uuid::nil(), &rows);

        assert_eq!(perf.summary.total_versions, 3);
        assert_eq!(perf.summary.total_applications, 14);
        assert_eq!(perf.summary.total_responses, 4);
        assert!((perf.summary.overall_response_rate - 4.0 / 14.0).abs() < 1e-9);
        let best = perf.best_performer.expect("Expected a best performer");
        assert_eq!(best.version_name, "B");
        assert!((best.response_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rates_guard_zero_applications() {
        let perf = VersionPerformance::from(&make_version("C", 0, 0));
        assert_eq!(perf.response_rate, 0.0);
        let empty = summarize_performance(Uuid::nil(), &[]);
        assert!(empty.best_performer.is_none());
        assert_eq!(empty.summary.overall_offer_rate, 0.0);
    }
}
