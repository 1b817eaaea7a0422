//! Candidate/job match evaluation and persistence.
//!
//! A match blends the semantic scorer with an AI assessment (or a heuristic when the LLM
//! is unavailable), then applies the hard-requirement penalties from `rules`.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::keywords::dedupe_case_insensitive;
use crate::llm_client::{LlmClient, LlmError, LlmTask};
use crate::matching::prompts::{build_match_prompt, MATCH_SYSTEM};
use crate::matching::rules::{
    check_rules, final_score, priority_for, RuleChecks, MIN_MATCH_SCORE,
};
use crate::matching::similarity::SemanticScorer;
use crate::models::candidate::CandidateRow;
use crate::models::job::{JobMatchRow, JobRow};

/// The AI (or heuristic) half of a match. `match_score` is 0-100.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiAnalysis {
    pub match_score: f64,
    pub should_apply: bool,
    pub priority: String,
    pub explanation: String,
    pub strengths: Vec<String>,
    pub missing_requirements: Vec<String>,
    pub keywords_matched: Vec<String>,
    pub reasoning: String,
    #[serde(skip_deserializing)]
    pub source: String,
}

impl Default for AiAnalysis {
    fn default() -> Self {
        Self {
            match_score: 0.0,
            should_apply: false,
            priority: "low".to_string(),
            explanation: String::new(),
            strengths: Vec::new(),
            missing_requirements: Vec::new(),
            keywords_matched: Vec::new(),
            reasoning: String::new(),
            source: "ai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub company: String,
    pub match_score: f64,
    pub semantic_score: f64,
    pub ai_score: f64,
    pub explanation: String,
    pub keywords_matched: Vec<String>,
    pub rules: RuleChecks,
    pub priority: String,
    pub should_apply: bool,
    pub scorer: String,
    pub analysis_source: String,
}

#[derive(Debug, Serialize)]
pub struct CandidateMatchCount {
    pub candidate_id: Uuid,
    pub full_name: String,
    pub matches_found: usize,
    pub error: Option<String>,
}

/// Deterministic stand-in for the AI assessment.
pub fn heuristic_analysis(rules: &RuleChecks) -> AiAnalysis {
    let score = rules.skills_score * 70.0
        + if rules.experience { 15.0 } else { 0.0 }
        + if rules.location { 15.0 } else { 0.0 };

    let mut strengths = Vec::new();
    if !rules.matched_skills.is_empty() {
        strengths.push(format!("Skills: {}", rules.matched_skills.join(", ")));
    }
    if rules.experience {
        strengths.push("Experience level fits".to_string());
    }
    if rules.location {
        strengths.push("Location fits".to_string());
    }

    AiAnalysis {
        match_score: score,
        should_apply: score >= 60.0,
        priority: priority_for(score / 100.0).to_string(),
        explanation: format!(
            "Heuristic assessment: {:.0}% skills overlap, experience {}, location {}",
            rules.skills_score * 100.0,
            if rules.experience { "fits" } else { "below level" },
            if rules.location { "fits" } else { "outside targets" },
        ),
        strengths,
        keywords_matched: rules.matched_skills.clone(),
        reasoning: "Computed from skills, experience and location checks".to_string(),
        source: "heuristic".to_string(),
        ..Default::default()
    }
}

/// Used when the model answered but not with parseable JSON.
pub fn unparseable_analysis() -> AiAnalysis {
    AiAnalysis {
        match_score: 50.0,
        should_apply: false,
        priority: "low".to_string(),
        explanation: "Failed to analyze match".to_string(),
        reasoning: "AI response could not be parsed".to_string(),
        source: "fallback".to_string(),
        ..Default::default()
    }
}

async fn analyze(
    llm: &LlmClient,
    candidate: &CandidateRow,
    job: &JobRow,
    rules: &RuleChecks,
) -> AiAnalysis {
    let prompt = build_match_prompt(candidate, job);
    match llm
        .call_json::<AiAnalysis>(&prompt, MATCH_SYSTEM, LlmTask::Matching)
        .await
    {
        Ok(mut analysis) => {
            analysis.match_score = analysis.match_score.clamp(0.0, 100.0);
            analysis.source = "ai".to_string();
            analysis
        }
        Err(LlmError::NotConfigured) => heuristic_analysis(rules),
        Err(LlmError::Parse(e)) => {
            warn!("Unparseable match analysis for job {}: {e}", job.id);
            unparseable_analysis()
        }
        Err(e) => {
            warn!("Match analysis failed for job {}, using heuristic: {e}", job.id);
            heuristic_analysis(rules)
        }
    }
}

/// Scores one candidate against one job without storing anything.
pub async fn evaluate_match(
    llm: &LlmClient,
    scorer: &dyn SemanticScorer,
    candidate: &CandidateRow,
    job: &JobRow,
) -> Result<MatchResult, AppError> {
    let rules = check_rules(candidate, job);
    let semantic = scorer
        .similarity(&candidate.profile_text(), &job.full_text())
        .await?;
    let ai = analyze(llm, candidate, job, &rules).await;

    let score = final_score(semantic, ai.match_score, rules.visa, rules.location);
    let should_apply = score >= MIN_MATCH_SCORE && rules.visa && ai.should_apply;

    Ok(MatchResult {
        candidate_id: candidate.id,
        job_id: job.id,
        job_title: job.title.clone(),
        company: job.company.clone(),
        match_score: score,
        semantic_score: semantic,
        ai_score: ai.match_score,
        explanation: ai.explanation.clone(),
        keywords_matched: dedupe_case_insensitive(
            ai.keywords_matched
                .iter()
                .chain(rules.matched_skills.iter())
                .cloned(),
        ),
        priority: priority_for(score).to_string(),
        should_apply,
        scorer: scorer.name().to_string(),
        analysis_source: ai.source,
        rules,
    })
}

async fn insert_match(db: &PgPool, result: &MatchResult) -> Result<Option<JobMatchRow>, AppError> {
    Ok(sqlx::query_as::<_, JobMatchRow>(
        r#"
        INSERT INTO job_matches
            (id, candidate_id, job_id, match_score, semantic_score, ai_score, explanation,
             keywords_matched, salary_match, location_match, visa_match, skills_match_score,
             experience_match, priority, should_apply)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (candidate_id, job_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(result.candidate_id)
    .bind(result.job_id)
    .bind(result.match_score)
    .bind(result.semantic_score)
    .bind(result.ai_score)
    .bind(&result.explanation)
    .bind(&result.keywords_matched)
    .bind(result.rules.salary)
    .bind(result.rules.location)
    .bind(result.rules.visa)
    .bind(result.rules.skills_score)
    .bind(result.rules.experience)
    .bind(&result.priority)
    .bind(result.should_apply)
    .fetch_optional(db)
    .await?)
}

/// Matches a candidate against active jobs they have not been matched with yet, newest
/// first. Stores and returns the matches at or above the minimum score, best first.
pub async fn process_candidate(
    db: &PgPool,
    llm: &LlmClient,
    scorer: &dyn SemanticScorer,
    candidate_id: Uuid,
    limit: i64,
) -> Result<Vec<JobMatchRow>, AppError> {
    let candidate = fetch_candidate(db, candidate_id).await?;

    let jobs = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT j.* FROM jobs_raw j
        WHERE j.status = 'active'
          AND NOT EXISTS (
              SELECT 1 FROM job_matches m WHERE m.job_id = j.id AND m.candidate_id = $1
          )
        ORDER BY j.scraped_at DESC
        LIMIT $2
        "#,
    )
    .bind(candidate_id)
    .bind(limit.clamp(1, 500))
    .fetch_all(db)
    .await?;

    let mut stored = Vec::new();
    for job in &jobs {
        let result = match evaluate_match(llm, scorer, &candidate, job).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Matching job {} for candidate {candidate_id} failed: {e}", job.id);
                continue;
            }
        };
        if result.match_score < MIN_MATCH_SCORE {
            continue;
        }
        if let Some(row) = insert_match(db, &result).await? {
            stored.push(row);
        }
    }

    stored.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    info!(
        "Candidate {candidate_id}: {} jobs evaluated, {} matches stored",
        jobs.len(),
        stored.len()
    );
    Ok(stored)
}

/// Runs `process_candidate` for every active candidate. A failing candidate is reported
/// and does not stop the others.
pub async fn process_all(
    db: &PgPool,
    llm: &LlmClient,
    scorer: &dyn SemanticScorer,
    limit: i64,
) -> Result<Vec<CandidateMatchCount>, AppError> {
    let candidates = sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates WHERE is_active ORDER BY created_at",
    )
    .fetch_all(db)
    .await?;

    let mut counts = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let outcome = process_candidate(db, llm, scorer, candidate.id, limit).await;
        counts.push(match outcome {
            Ok(matches) => CandidateMatchCount {
                candidate_id: candidate.id,
                full_name: candidate.full_name,
                matches_found: matches.len(),
                error: None,
            },
            Err(e) => {
                warn!("Matching failed for candidate {}: {e}", candidate.id);
                CandidateMatchCount {
                    candidate_id: candidate.id,
                    full_name: candidate.full_name,
                    matches_found: 0,
                    error: Some(e.to_string()),
                }
            }
        });
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::matching::similarity::TermFrequencyScorer;

    fn make_rules(skills_score: f64, experience: bool, location: bool) -> RuleChecks {
        RuleChecks {
            salary: true,
            location,
            visa: true,
            skills_score,
            matched_skills: vec!["rust".to_string()],
            experience,
        }
    }

    fn make_candidate() -> CandidateRow {
        CandidateRow {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            location: Some("Austin, TX".to_string()),
            linkedin_url: None,
            github_url: None,
            portfolio_url: None,
            target_roles: vec!["Backend Engineer".to_string()],
            target_companies: vec![],
            target_locations: vec!["Austin".to_string()],
            salary_min: Some(120_000),
            salary_max: Some(160_000),
            visa_sponsorship_required: false,
            work_authorization: None,
            years_experience: Some(6),
            skills: vec!["rust".to_string(), "postgresql".to_string(), "docker".to_string()],
            is_active: true,
            automation_enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_job() -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            source: "indeed".to_string(),
            source_job_id: "abc".to_string(),
            title: "Senior Backend Engineer".to_string(),
            company: "Ferrous Co".to_string(),
            location: "Austin, TX".to_string(),
            job_type: Some("full-time".to_string()),
            experience_level: Some("senior".to_string()),
            salary_range: Some("$150,000 a year".to_string()),
            description: "Backend engineer working in Rust and PostgreSQL on Docker".to_string(),
            skills: vec!["rust".to_string(), "postgresql".to_string(), "docker".to_string()],
            requirements: vec![],
            benefits: vec![],
            visa_sponsorship: false,
            remote_work: false,
            apply_url: "https://www.indeed.com/viewjob?jk=abc".to_string(),
            posted_at: None,
            scraped_at: Utc::now(),
            status: "active".to_string(),
        }
    }

    #[test]
    fn test_heuristic_analysis_scoring() {
        let full = heuristic_analysis(&make_rules(1.0, true, true));
        assert!((full.match_score - 100.0).abs() < 1e-9);
        assert!(full.should_apply);
        assert_eq!(full.source, "heuristic");

        let partial = heuristic_analysis(&make_rules(0.5, false, true));
        assert!((partial.match_score - 50.0).abs() < 1e-9);
        assert!(!partial.should_apply, "Expected no apply below 60");
    }

    #[test]
    fn test_unparseable_analysis_defaults() {
        let analysis = unparseable_analysis();
        assert_eq!(analysis.match_score, 50.0);
        assert!(!analysis.should_apply);
        assert_eq!(analysis.priority, "low");
    }

    #[tokio::test]
    async fn test_evaluate_match_without_llm_uses_heuristic() {
        let llm = LlmClient::new(String::new());
        let result = evaluate_match(&llm, &TermFrequencyScorer, &make_candidate(), &make_job())
            .await
            .unwrap();

        assert_eq!(result.analysis_source, "heuristic");
        assert_eq!(result.ai_score, 100.0);
        assert!(result.rules.visa && result.rules.location && result.rules.experience);
        assert!(result.match_score > 0.6, "Expected a strong match, got {}", result.match_score);
        assert!(result.match_score <= 1.0);
        assert!(result.should_apply);
        assert_eq!(result.scorer, "term_frequency");
        assert!(result.keywords_matched.contains(&"rust".to_string()));
    }

    #[tokio::test]
    async fn test_evaluate_match_visa_failure_blocks_apply() {
        let llm = LlmClient::new(String::new());
        let mut candidate = make_candidate();
        candidate.visa_sponsorship_required = true;

        let result = evaluate_match(&llm, &TermFrequencyScorer, &candidate, &make_job())
            .await
            .unwrap();
        assert!(!result.rules.visa);
        assert!(!result.should_apply);
        assert!(result.match_score <= 0.3);
        assert_eq!(result.priority, "low");
    }
}
