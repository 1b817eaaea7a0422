//! Cover letter generation: company research, personalization, LLM draft with a
//! tone-specific template fallback, persistence and usage tracking.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::fetch_candidate;
use crate::cover_letters::personalization::{ats_keywords, personalization_hooks, Tone};
use crate::cover_letters::prompts::{build_cover_letter_prompt, COVER_LETTER_SYSTEM};
use crate::cover_letters::research::{culture_keywords, research_company, CompanyResearch};
use crate::errors::AppError;
use crate::jobs::fetch_job;
use crate::llm_client::{LlmClient, LlmError, LlmTask};
use crate::models::candidate::CandidateRow;
use crate::models::documents::CoverLetterRow;
use crate::models::job::JobRow;

pub const MAX_VERSIONS: usize = 5;
const WORDS_PER_MINUTE: f64 = 200.0;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AiLetter {
    content: String,
    reasoning: String,
    key_selling_points: Vec<String>,
    improvement_suggestions: Vec<String>,
}

/// Letter text before it is stored.
#[derive(Debug, Clone)]
pub struct DraftLetter {
    pub content: String,
    pub reasoning: String,
    pub generation_method: &'static str,
    pub key_selling_points: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedCoverLetter {
    #[serde(flatten)]
    pub letter: CoverLetterRow,
    pub reading_time_minutes: f64,
    pub key_selling_points: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub company_research: CompanyResearch,
}

#[derive(Debug, Serialize)]
pub struct LetterVersion {
    pub version_name: String,
    #[serde(flatten)]
    pub generated: GeneratedCoverLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    Response,
    Interview,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes at 200 words per minute, one decimal.
pub fn reading_time_minutes(words: usize) -> f64 {
    (words as f64 / WORDS_PER_MINUTE * 10.0).round() / 10.0
}

fn first_n(items: &[String], n: usize, fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Deterministic letter following the tone's greeting, opening, closing and sign-off.
pub fn template_letter(
    candidate: &CandidateRow,
    job: &JobRow,
    tone: Tone,
    research: &CompanyResearch,
    hooks: &[String],
    keywords: &[String],
    hiring_manager: Option<&str>,
) -> DraftLetter {
    let style = tone.style();
    let company = &job.company;
    let skills = &candidate.skills;
    let years = candidate
        .years_experience
        .map_or("several".to_string(), |y| format!("{y}+"));

    let greeting = hiring_manager
        .filter(|m| !m.trim().is_empty())
        .map_or(style.greeting.to_string(), |m| format!("Dear {},", m.trim()));

    let mut opening = format!(
        "I am writing to express my strong interest in the {} position at {company}. ",
        job.title
    );
    opening.push_str(&match tone {
        Tone::Formal => format!(
            "With {years} years of professional experience in {}, I am well-positioned to contribute to your team's success.",
            first_n(skills, 2, "the field")
        ),
        Tone::Warm => format!(
            "I was excited to discover this opportunity, as it aligns with my {years} years of experience and my passion for {}.",
            first_n(skills, 2, "technology")
        ),
        Tone::Bold => format!(
            "With {years} years of proven expertise in {}, I am confident I can deliver exceptional results for your team.",
            first_n(skills, 3, "the field")
        ),
        Tone::Curious => format!(
            "What drew me in is {company}'s approach, and I would love to bring my {years} years of experience to your mission."
        ),
        Tone::Strategic => format!(
            "Given my background in {} and {years} years of experience, I see clear opportunities to drive growth at {company}.",
            first_n(skills, 2, "the industry")
        ),
    });

    let mut experience = format!(
        "In my professional career, I have developed strong expertise in {}.",
        first_n(skills, 4, "key technical areas")
    );
    if !research.about.is_empty() {
        experience.push_str(&format!(
            " I am particularly drawn to {company}'s work and believe my background aligns well with your values."
        ));
    }

    let mut alignment = format!(
        "The requirements in your posting closely match my skill set, particularly {}.",
        first_n(keywords, 3, "the core competencies")
    );
    if let Some(hook) = hooks.first() {
        alignment.push_str(&format!(" {hook}."));
    }
    alignment.push_str(&format!(
        " I am eager to bring my experience and enthusiasm to help {company} achieve its goals."
    ));

    let mut closing = format!(
        "I would welcome the opportunity to discuss how my background in {} can contribute to {company}'s continued success. ",
        first_n(skills, 2, "the field")
    );
    closing.push_str(match tone {
        Tone::Bold => {
            "I am confident that my track record and results-driven approach make me a strong fit for this role."
        }
        Tone::Warm => {
            "Thank you for considering my application, and I look forward to the possibility of joining your team."
        }
        Tone::Curious => "I would love to hear more about what the team is building next.",
        Tone::Formal | Tone::Strategic => "Thank you for your time and consideration.",
    });

    let content = format!(
        "{greeting}\n\n{opening}\n\n{experience}\n\n{alignment}\n\n{closing}\n\n{}\n{}",
        style.closing, candidate.full_name
    );

    let mut improvement_suggestions = vec![
        "Add specific quantified achievements".to_string(),
        "Reference a recent company initiative or product".to_string(),
    ];
    if research.is_empty() {
        improvement_suggestions
            .push("Provide the company domain for research-based personalization".to_string());
    }

    DraftLetter {
        content,
        reasoning: format!(
            "Template letter with {} tone, {} ATS keywords and {} personalization hooks",
            tone.as_str(),
            keywords.len(),
            hooks.len()
        ),
        generation_method: "template",
        key_selling_points: vec![
            format!("{years} years of experience"),
            format!("Expertise in {}", first_n(skills, 3, "key areas")),
            "Strong alignment with role requirements".to_string(),
        ],
        improvement_suggestions,
    }
}

/// LLM letter, or the template when the LLM is unavailable or returns nothing usable.
#[allow(clippy::too_many_arguments)]
pub async fn draft_letter(
    llm: &LlmClient,
    candidate: &CandidateRow,
    job: &JobRow,
    tone: Tone,
    research: &CompanyResearch,
    hooks: &[String],
    keywords: &[String],
    hiring_manager: Option<&str>,
) -> DraftLetter {
    let prompt = build_cover_letter_prompt(
        candidate,
        job,
        research,
        tone,
        hooks,
        keywords,
        hiring_manager,
    );
    match llm
        .call_json::<AiLetter>(&prompt, COVER_LETTER_SYSTEM, LlmTask::CoverLetter)
        .await
    {
        Ok(letter) if !letter.content.trim().is_empty() => DraftLetter {
            content: letter.content.trim().to_string(),
            reasoning: letter.reasoning,
            generation_method: "ai",
            key_selling_points: letter.key_selling_points,
            improvement_suggestions: letter.improvement_suggestions,
        },
        Ok(_) => {
            warn!("LLM cover letter for job {} was empty, using template", job.id);
            template_letter(candidate, job, tone, research, hooks, keywords, hiring_manager)
        }
        Err(LlmError::NotConfigured) => {
            template_letter(candidate, job, tone, research, hooks, keywords, hiring_manager)
        }
        Err(e) => {
            warn!("LLM cover letter failed for job {}, using template: {e}", job.id);
            template_letter(candidate, job, tone, research, hooks, keywords, hiring_manager)
        }
    }
}

async fn insert_letter(
    db: &PgPool,
    candidate_id: Uuid,
    job_id: Uuid,
    tone: Tone,
    draft: &DraftLetter,
    keywords: &[String],
    hooks: &[String],
) -> Result<CoverLetterRow, AppError> {
    Ok(sqlx::query_as::<_, CoverLetterRow>(
        r#"
        INSERT INTO cover_letters
            (id, candidate_id, job_id, tone, content, ats_keywords, personalization_hooks,
             reasoning, generation_method, word_count)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate_id)
    .bind(job_id)
    .bind(tone.as_str())
    .bind(&draft.content)
    .bind(keywords)
    .bind(hooks)
    .bind(&draft.reasoning)
    .bind(draft.generation_method)
    .bind(word_count(&draft.content) as i32)
    .fetch_one(db)
    .await?)
}

/// Research is optional; culture words fall back to the job description.
pub async fn gather_research(http: &Client, domain: Option<&str>, job: &JobRow) -> CompanyResearch {
    let mut research = match domain {
        Some(domain) if !domain.trim().is_empty() => research_company(http, domain).await,
        _ => CompanyResearch::default(),
    };
    if research.culture_keywords.is_empty() {
        research.culture_keywords = culture_keywords(&job.description);
    }
    research
}

/// Generates and stores one letter for already-loaded candidate and job.
pub async fn generate_for(
    db: &PgPool,
    llm: &LlmClient,
    candidate: &CandidateRow,
    job: &JobRow,
    research: &CompanyResearch,
    tone: Tone,
    hiring_manager: Option<&str>,
) -> Result<GeneratedCoverLetter, AppError> {
    let hooks = personalization_hooks(&job.company, research, &candidate.skills);
    let keywords = ats_keywords(&job.description, &candidate.skills);
    let draft = draft_letter(
        llm,
        candidate,
        job,
        tone,
        research,
        &hooks,
        &keywords,
        hiring_manager,
    )
    .await;

    let letter = insert_letter(db, candidate.id, job.id, tone, &draft, &keywords, &hooks).await?;
    info!(
        "Generated {} cover letter {} ({} words, {})",
        tone.as_str(),
        letter.id,
        letter.word_count,
        letter.generation_method
    );

    Ok(GeneratedCoverLetter {
        reading_time_minutes: reading_time_minutes(letter.word_count.max(0) as usize),
        letter,
        key_selling_points: draft.key_selling_points,
        improvement_suggestions: draft.improvement_suggestions,
        company_research: research.clone(),
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn generate_cover_letter(
    db: &PgPool,
    llm: &LlmClient,
    http: &Client,
    candidate_id: Uuid,
    job_id: Uuid,
    tone: Tone,
    company_domain: Option<&str>,
    hiring_manager: Option<&str>,
) -> Result<GeneratedCoverLetter, AppError> {
    let candidate = fetch_candidate(db, candidate_id).await?;
    let job = fetch_job(db, job_id).await?;
    let research = gather_research(http, company_domain, &job).await;
    generate_for(db, llm, &candidate, &job, &research, tone, hiring_manager).await
}

/// One letter per tone, in `VERSION_TONES` order. A failed version is logged and skipped.
pub async fn generate_versions(
    db: &PgPool,
    llm: &LlmClient,
    http: &Client,
    candidate_id: Uuid,
    job_id: Uuid,
    versions: usize,
    company_domain: Option<&str>,
) -> Result<Vec<LetterVersion>, AppError> {
    if !(1..=MAX_VERSIONS).contains(&versions) {
        return Err(AppError::Validation(format!(
            "versions must be between 1 and {MAX_VERSIONS}"
        )));
    }
    let candidate = fetch_candidate(db, candidate_id).await?;
    let job = fetch_job(db, job_id).await?;
    let research = gather_research(http, company_domain, &job).await;

    let mut out = Vec::with_capacity(versions);
    for tone in crate::cover_letters::personalization::VERSION_TONES
        .into_iter()
        .take(versions)
    {
        match generate_for(db, llm, &candidate, &job, &research, tone, None).await {
            Ok(generated) => out.push(LetterVersion {
                version_name: format!("{} Version", tone.title()),
                generated,
            }),
            Err(e) => warn!("Failed to generate {} cover letter: {e}", tone.as_str()),
        }
    }
    Ok(out)
}

pub async fn fetch_letter(db: &PgPool, letter_id: Uuid) -> Result<CoverLetterRow, AppError> {
    sqlx::query_as::<_, CoverLetterRow>("SELECT * FROM cover_letters WHERE id = $1")
        .bind(letter_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cover letter {letter_id} not found")))
}

pub async fn latest_letter_for_job(
    db: &PgPool,
    candidate_id: Uuid,
    job_id: Uuid,
) -> Result<Option<CoverLetterRow>, AppError> {
    Ok(sqlx::query_as::<_, CoverLetterRow>(
        r#"
        SELECT * FROM cover_letters
        WHERE candidate_id = $1 AND job_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(candidate_id)
    .bind(job_id)
    .fetch_optional(db)
    .await?)
}

/// Bumps `used_count` when `used`, plus the response or interview counter for `outcome`.
pub async fn record_usage(
    db: &PgPool,
    letter_id: Uuid,
    used: bool,
    outcome: Option<UsageOutcome>,
) -> Result<CoverLetterRow, AppError> {
    sqlx::query_as::<_, CoverLetterRow>(
        r#"
        UPDATE cover_letters SET
            used_count      = used_count + $2,
            response_count  = response_count + $3,
            interview_count = interview_count + $4,
            updated_at      = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(letter_id)
    .bind(i32::from(used))
    .bind(i32::from(outcome == Some(UsageOutcome::Response)))
    .bind(i32::from(outcome == Some(UsageOutcome::Interview)))
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cover letter {letter_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_candidate(years: Option<i32>, skills: &[&str]) -> CandidateRow {
        CandidateRow {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            location: None,
            linkedin_url: None,
            github_url: None,
            portfolio_url: None,
            target_roles: vec![],
            target_companies: vec![],
            target_locations: vec![],
            salary_min: None,
            salary_max: None,
            visa_sponsorship_required: false,
            work_authorization: None,
            years_experience: years,
            skills: skills.iter().map(|s| s.to_string()).collect(),
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
            title: "Backend Engineer".to_string(),
            company: "Ferrous Co".to_string(),
            location: "Remote".to_string(),
            job_type: None,
            experience_level: None,
            salary_range: None,
            description: "Rust services. We are a collaborative team.".to_string(),
            skills: vec![],
            requirements: vec![],
            benefits: vec![],
            visa_sponsorship: false,
            remote_work: true,
            apply_url: "https://example.com/jobs/1".to_string(),
            posted_at: None,
            scraped_at: Utc::now(),
            status: "active".to_string(),
        }
    }

    #[test]
    fn test_template_letter_formal() {
        let candidate = make_candidate(Some(6), &["Rust", "PostgreSQL", "Docker"]);
        let hooks = vec!["Your collaborative culture resonates with my professional values".to_string()];
        let keywords = vec!["Rust".to_string(), "remote".to_string()];
        let draft = template_letter(
            &candidate,
            &make_job(),
            Tone::Formal,
            &CompanyResearch::default(),
            &hooks,
            &keywords,
            None,
        );

        assert!(draft.content.starts_with("Dear Hiring Manager,\n\n"));
        assert!(draft.content.contains("Backend Engineer position at Ferrous Co"));
        assert!(draft.content.contains("6+ years of professional experience in Rust, PostgreSQL"));
        assert!(draft.content.contains("particularly Rust, remote."));
        assert!(draft.content.contains(&hooks[0]));
        assert!(draft.content.ends_with("Sincerely,\nAda Lovelace"));
        assert_eq!(draft.generation_method, "template");
        assert_eq!(draft.improvement_suggestions.len(), 3);
    }

    #[test]
    fn test_template_letter_tone_specific_parts() {
        let candidate = make_candidate(None, &[]);
        let job = make_job();
        let research = CompanyResearch::default();

        let bold = template_letter(&candidate, &job, Tone::Bold, &research, &[], &[], None);
        assert!(bold.content.starts_with("Dear Hiring Team,"));
        assert!(bold.content.contains("several years of proven expertise in the field"));
        assert!(bold.content.ends_with("Ready to contribute,\nAda Lovelace"));

        let curious = template_letter(
            &candidate,
            &job,
            Tone::Curious,
            &research,
            &[],
            &[],
            Some("Grace"),
        );
        assert!(curious.content.starts_with("Dear Grace,"));
        assert!(curious.content.contains("particularly the core competencies."));
        assert!(curious.content.ends_with("Looking forward to learning more,\nAda Lovelace"));
    }

    #[test]
    fn test_word_count_and_reading_time() {
        assert_eq!(word_count("one two  three\nfour"), 4);
        assert_eq!(reading_time_minutes(300), 1.5);
        assert_eq!(reading_time_minutes(0), 0.0);
    }
}
