//! Hard-requirement checks between a candidate and a job. Pure functions.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::keywords::extract_tech_skills;
use crate::models::candidate::CandidateRow;
use crate::models::job::JobRow;

pub const MIN_MATCH_SCORE: f64 = 0.60;
pub const HIGH_PRIORITY_THRESHOLD: f64 = 0.85;
pub const MEDIUM_PRIORITY_THRESHOLD: f64 = 0.70;
pub const SALARY_TOLERANCE: f64 = 0.2;
pub const SEMANTIC_WEIGHT: f64 = 0.4;
pub const AI_WEIGHT: f64 = 0.6;

const REMOTE_KEYWORDS: &[&str] = &["remote", "work from home", "hybrid", "flexible"];
const VISA_KEYWORDS: &[&str] = &[
    "visa",
    "sponsorship",
    "h1b",
    "work authorization",
    "eligible to work",
];
const HOURS_PER_YEAR: f64 = 2080.0;

static SALARY_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(k\b)?").unwrap());

#[derive(Debug, Clone, Serialize)]
pub struct RuleChecks {
    pub salary: bool,
    pub location: bool,
    pub visa: bool,
    pub skills_score: f64,
    pub matched_skills: Vec<String>,
    pub experience: bool,
}

pub fn check_rules(candidate: &CandidateRow, job: &JobRow) -> RuleChecks {
    let (skills_score, matched_skills) =
        skills_match(&job.skills, &job.description, &candidate.skills);

    RuleChecks {
        salary: salary_matches(
            job.salary_range.as_deref(),
            candidate.salary_min,
            candidate.salary_max,
        ),
        location: location_matches(&job.location, job.remote_work, &candidate.target_locations),
        visa: visa_matches(
            candidate.visa_sponsorship_required,
            job.visa_sponsorship,
            &job.description,
        ),
        skills_score,
        matched_skills,
        experience: experience_matches(
            job.experience_level.as_deref(),
            candidate.years_experience,
        ),
    }
}

/// First number in a salary string as a yearly figure. `150k` is 150000; hourly rates are
/// multiplied by 2080.
pub fn parse_salary(text: &str) -> Option<f64> {
    let caps = SALARY_NUMBER_RE.captures(text)?;
    let mut value: f64 = caps[1].replace(',', "").parse().ok()?;
    if caps.get(2).is_some() {
        value *= 1000.0;
    }
    let lower = text.to_lowercase();
    if lower.contains("hour") || lower.contains("hr") {
        value *= HOURS_PER_YEAR;
    }
    Some(value)
}

/// Missing information on either side counts as a match.
pub fn salary_matches(salary_text: Option<&str>, min: Option<i32>, max: Option<i32>) -> bool {
    let Some(text) = salary_text.filter(|t| !t.trim().is_empty()) else {
        return true;
    };
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(value) = parse_salary(text) else {
        return true;
    };

    let lower = min.map_or(0.0, |m| f64::from(m) * (1.0 - SALARY_TOLERANCE));
    let upper = max.map_or(f64::INFINITY, |m| f64::from(m) * (1.0 + SALARY_TOLERANCE));
    (lower..=upper).contains(&value)
}

pub fn location_matches(job_location: &str, job_remote: bool, targets: &[String]) -> bool {
    let job_location = job_location.trim().to_lowercase();

    if targets.is_empty()
        || job_remote
        || REMOTE_KEYWORDS.iter().any(|k| job_location.contains(k))
    {
        return true;
    }

    targets.iter().any(|target| {
        let target = target.trim().to_lowercase();
        !target.is_empty()
            && (job_location.contains(&target)
                || (!job_location.is_empty() && target.contains(&job_location)))
    })
}

pub fn visa_matches(sponsorship_required: bool, job_flag: bool, description: &str) -> bool {
    if !sponsorship_required || job_flag {
        return true;
    }
    let lower = description.to_lowercase();
    VISA_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Share of the job's skills the candidate has, plus the matched skills in job order.
/// A job with no identifiable skills scores 0.5.
pub fn skills_match(
    job_skills: &[String],
    description: &str,
    candidate_skills: &[String],
) -> (f64, Vec<String>) {
    let mut required: Vec<String> = job_skills.iter().map(|s| s.trim().to_lowercase()).collect();
    if required.is_empty() {
        required = extract_tech_skills(description);
    }
    let mut seen = HashSet::new();
    required.retain(|s| !s.is_empty() && seen.insert(s.clone()));

    if required.is_empty() {
        return (0.5, Vec::new());
    }

    let have: HashSet<String> = candidate_skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();
    let matched: Vec<String> = required
        .iter()
        .filter(|s| have.contains(*s))
        .cloned()
        .collect();

    (matched.len() as f64 / required.len() as f64, matched)
}

/// Minimum years for an experience level. Unknown levels are treated as mid.
pub fn level_min_years(level: &str) -> i32 {
    match level.trim().to_lowercase().as_str() {
        "entry" | "junior" => 0,
        "senior" | "lead" => 5,
        "principal" | "staff" => 10,
        _ => 2,
    }
}

/// Overqualified candidates match. Unknown experience matches.
pub fn experience_matches(level: Option<&str>, years: Option<i32>) -> bool {
    match years {
        Some(years) => years >= level_min_years(level.unwrap_or("mid")),
        None => true,
    }
}

pub fn priority_for(score: f64) -> &'static str {
    if score >= HIGH_PRIORITY_THRESHOLD {
        "high"
    } else if score >= MEDIUM_PRIORITY_THRESHOLD {
        "medium"
    } else {
        "low"
    }
}

/// Weighted blend of the semantic (0-1) and AI (0-100) scores, penalised for a failed
/// visa or location check and clamped to [0, 1].
pub fn final_score(semantic: f64, ai_score: f64, visa: bool, location: bool) -> f64 {
    let mut score = semantic * SEMANTIC_WEIGHT + (ai_score / 100.0) * AI_WEIGHT;
    if !visa {
        score *= 0.3;
    }
    if !location {
        score *= 0.7;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_salary_formats() {
        assert_eq!(parse_salary("$150,000 - $180,000 a year"), Some(150_000.0));
        assert_eq!(parse_salary("$120k"), Some(120_000.0));
        assert_eq!(parse_salary("$50 an hour"), Some(104_000.0));
        assert_eq!(parse_salary("$45/hr"), Some(93_600.0));
        assert_eq!(parse_salary("Competitive"), None);
    }

    #[test]
    fn test_salary_matches_with_tolerance() {
        assert!(salary_matches(None, Some(100_000), Some(150_000)));
        assert!(salary_matches(Some("$90,000"), None, None));
        // 100k * 0.8 = 80k lower bound
        assert!(salary_matches(Some("$85,000"), Some(100_000), Some(150_000)));
        assert!(!salary_matches(Some("$70,000"), Some(100_000), Some(150_000)));
        // 150k * 1.2 = 180k upper bound
        assert!(salary_matches(Some("$180,000"), Some(100_000), Some(150_000)));
        assert!(!salary_matches(Some("$200,000"), Some(100_000), Some(150_000)));
        assert!(salary_matches(Some("$500,000"), Some(100_000), None));
    }

    #[test]
    fn test_location_matches() {
        assert!(location_matches("Austin, TX", false, &[]));
        assert!(location_matches("Austin, TX", true, &strings(&["Boston"])));
        assert!(location_matches("Hybrid - Denver", false, &strings(&["Boston"])));
        assert!(location_matches("Austin, TX", false, &strings(&["austin"])));
        assert!(location_matches("Austin", false, &strings(&["Austin, TX"])));
        assert!(!location_matches("Austin, TX", false, &strings(&["Boston, MA"])));
        assert!(!location_matches("", false, &strings(&["Boston, MA"])));
    }

    #[test]
    fn test_visa_matches() {
        assert!(visa_matches(false, false, "no mention"));
        assert!(visa_matches(true, true, "no mention"));
        assert!(visa_matches(true, false, "We offer H1B transfers"));
        assert!(visa_matches(true, false, "Must be eligible to work in the US"));
        assert!(!visa_matches(true, false, "Great benefits"));
    }

    #[test]
    fn test_skills_match_ratio_and_order() {
        let (score, matched) = skills_match(
            &strings(&["Rust", "Go", "Kubernetes", "AWS"]),
            "",
            &strings(&["aws", "rust", "python"]),
        );
        assert!((score - 0.5).abs() < 1e-9, "Expected 0.5, got {score}");
        assert_eq!(matched, strings(&["rust", "aws"]));
    }

    #[test]
    fn test_skills_match_extracts_from_description() {
        let (score, matched) =
            skills_match(&[], "We use Python and Docker daily", &strings(&["docker"]));
        assert!((score - 0.5).abs() < 1e-9);
        assert_eq!(matched, strings(&["docker"]));

        let (empty_score, empty_matched) = skills_match(&[], "Friendly team", &strings(&["rust"]));
        assert_eq!(empty_score, 0.5);
        assert!(empty_matched.is_empty());
    }

    #[test]
    fn test_experience_matches() {
        assert!(experience_matches(Some("senior"), Some(7)));
        assert!(experience_matches(Some("senior"), Some(15)));
        assert!(!experience_matches(Some("senior"), Some(3)));
        assert!(!experience_matches(Some("principal"), Some(9)));
        assert!(experience_matches(Some("entry"), Some(0)));
        assert!(experience_matches(None, Some(2)));
        assert!(experience_matches(Some("lead"), None));
    }

    #[test]
    fn test_priority_thresholds() {
        assert_eq!(priority_for(0.85), "high");
        assert_eq!(priority_for(0.84), "medium");
        assert_eq!(priority_for(0.70), "medium");
        assert_eq!(priority_for(0.69), "low");
    }

    #[test]
    fn test_final_score_penalties_and_clamp() {
        let base = final_score(0.5, 80.0, true, true);
        assert!((base - 0.68).abs() < 1e-9, "Expected 0.68, got {base}");

        let no_visa = final_score(0.5, 80.0, false, true);
        assert!((no_visa - 0.68 * 0.3).abs() < 1e-9);

        let both = final_score(0.5, 80.0, false, false);
        assert!((both - 0.68 * 0.3 * 0.7).abs() < 1e-9);

        assert_eq!(final_score(2.0, 300.0, true, true), 1.0);
        assert_eq!(final_score(-1.0, 0.0, true, true), 0.0);
    }
}
