// LLM prompts for the Matching module.

use crate::llm_client::prompts::clip;
use crate::models::candidate::CandidateRow;
use crate::models::job::JobRow;

pub const MATCH_SYSTEM: &str = "You are an experienced technical recruiter assessing how well \
    a candidate fits a job posting. Be candid about gaps. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

const MATCH_PROMPT_TEMPLATE: &str = r#"Analyze this job-candidate match.

JOB:
Title: {title}
Company: {company}
Location: {location}
Experience Level: {experience_level}
Skills: {job_skills}
Description: {description}

CANDIDATE:
Experience: {years} years
Skills: {candidate_skills}
Target Roles: {target_roles}
Target Locations: {target_locations}
Salary Range: {salary}
Visa Sponsorship Required: {visa}

Return a JSON object with this EXACT schema:
{
  "match_score": 0-100,
  "should_apply": true,
  "priority": "high|medium|low",
  "explanation": "two or three sentences",
  "strengths": ["..."],
  "missing_requirements": ["..."],
  "keywords_matched": ["..."],
  "reasoning": "why you decided this"
}"#;

fn or_na(value: String) -> String {
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        value
    }
}

pub fn build_match_prompt(candidate: &CandidateRow, job: &JobRow) -> String {
    let salary = match (candidate.salary_min, candidate.salary_max) {
        (None, None) => "N/A".to_string(),
        (min, max) => format!(
            "${}-${}",
            min.map_or("N/A".to_string(), |v| v.to_string()),
            max.map_or("N/A".to_string(), |v| v.to_string())
        ),
    };

    MATCH_PROMPT_TEMPLATE
        .replace("{title}", &job.title)
        .replace("{company}", &job.company)
        .replace("{location}", &or_na(job.location.clone()))
        .replace(
            "{experience_level}",
            job.experience_level.as_deref().unwrap_or("N/A"),
        )
        .replace("{job_skills}", &or_na(job.skills.join(", ")))
        .replace("{description}", clip(&job.description, 1000))
        .replace(
            "{years}",
            &candidate
                .years_experience
                .map_or("N/A".to_string(), |y| y.to_string()),
        )
        .replace("{candidate_skills}", &or_na(candidate.skills.join(", ")))
        .replace("{target_roles}", &or_na(candidate.target_roles.join(", ")))
        .replace(
            "{target_locations}",
            &or_na(candidate.target_locations.join(", ")),
        )
        .replace("{salary}", &salary)
        .replace("{visa}", &candidate.visa_sponsorship_required.to_string())
}
