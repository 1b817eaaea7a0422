//! Turns raw scraped cards into storable jobs: dates, skills, level, benefits, flags.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::keywords::{extract_tech_skills, mentions_skill};
use crate::scraping::ScrapedJob;

static DAYS_AGO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\+?\s*days?\s+ago").unwrap());
static HOURS_AGO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\+?\s*(?:hours?|hrs?)\s+ago").unwrap());

pub const BENEFIT_KEYWORDS: &[&str] = &[
    "health insurance",
    "dental insurance",
    "vision insurance",
    "401k",
    "retirement plan",
    "pension",
    "pto",
    "vacation",
    "sick leave",
    "flexible schedule",
    "remote work",
    "work from home",
    "gym membership",
    "wellness program",
    "stock options",
    "equity",
    "bonus",
    "commission",
    "life insurance",
    "disability insurance",
    "tuition reimbursement",
    "professional development",
];

/// Checked in order; the first level with a matching term wins.
const EXPERIENCE_LEVELS: &[(&str, &[&str])] = &[
    ("entry", &["entry level", "entry-level", "junior", "associate", "0-2 years"]),
    ("senior", &["senior", "sr.", "lead", "5+ years", "expert"]),
    ("mid", &["mid level", "mid-level", "2-5 years", "intermediate"]),
    ("principal", &["principal", "staff", "architect", "10+ years"]),
];

const REQUIREMENT_MARKERS: &[&str] = &[
    "required",
    "requirement",
    "must have",
    "experience with",
    "experience in",
    "years of experience",
    "degree",
    "proficien",
    "familiar with",
    "knowledge of",
];

const VISA_MARKERS: &[&str] = &["sponsorship", "sponsor", "visa", "h1b", "h-1b"];

/// A job ready to insert into `jobs_raw`.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedJob {
    pub source: String,
    pub source_job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub experience_level: String,
    pub salary_range: Option<String>,
    pub description: String,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub visa_sponsorship: bool,
    pub remote_work: bool,
    pub apply_url: String,
    pub posted_at: DateTime<Utc>,
}

pub fn enrich(job: ScrapedJob, now: DateTime<Utc>) -> EnrichedJob {
    let description = job
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| job.snippet.clone());
    let text = format!("{} {}", job.title, description).to_lowercase();

    EnrichedJob {
        posted_at: parse_posted_date(job.posted_text.as_deref(), now),
        skills: extract_tech_skills(&text),
        experience_level: detect_experience_level(&text).to_string(),
        benefits: detect_benefits(&text),
        job_type: detect_job_type(job.job_type_tag.as_deref(), &text),
        remote_work: job.remote_tag
            || job.location.to_lowercase().contains("remote")
            || text.contains("remote"),
        visa_sponsorship: VISA_MARKERS.iter().any(|m| text.contains(m)),
        requirements: extract_requirements(&description),
        salary_range: job.salary_text.filter(|s| !s.trim().is_empty()),
        source: job.source,
        source_job_id: job.source_job_id,
        title: job.title,
        company: job.company,
        location: job.location,
        description,
        apply_url: job.apply_url,
    }
}

/// Relative posting dates as shown on job boards ("Posted 3 days ago", "Just posted").
pub fn parse_posted_date(text: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(text) = text else {
        return now;
    };
    let lower = text.to_lowercase();

    if lower.contains("just posted") || lower.contains("today") {
        return now;
    }
    if lower.contains("yesterday") {
        return now - Duration::days(1);
    }
    if let Some(days) = DAYS_AGO_RE
        .captures(&lower)
        .and_then(|c| c[1].parse::<i64>().ok())
    {
        return now - Duration::days(days.min(30));
    }
    if let Some(hours) = HOURS_AGO_RE
        .captures(&lower)
        .and_then(|c| c[1].parse::<i64>().ok())
    {
        return now - Duration::hours(hours);
    }
    now
}

/// `text_lower` must be lowercased title + description.
pub fn detect_experience_level(text_lower: &str) -> &'static str {
    EXPERIENCE_LEVELS
        .iter()
        .find(|(_, terms)| terms.iter().any(|t| mentions_skill(text_lower, t)))
        .map(|(level, _)| *level)
        .unwrap_or("mid")
}

pub fn detect_benefits(text_lower: &str) -> Vec<String> {
    BENEFIT_KEYWORDS
        .iter()
        .filter(|b| mentions_skill(text_lower, b))
        .map(|b| b.to_string())
        .collect()
}

pub fn detect_job_type(tag: Option<&str>, text_lower: &str) -> String {
    if let Some(tag) = tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
        return tag.replace(' ', "-");
    }
    if text_lower.contains("part-time") || text_lower.contains("part time") {
        "part-time".to_string()
    } else if text_lower.contains("contract") {
        "contract".to_string()
    } else if text_lower.contains("internship") || mentions_skill(text_lower, "intern") {
        "internship".to_string()
    } else {
        "full-time".to_string()
    }
}

/// Sentences or bullet lines that read like requirements. At most 10.
pub fn extract_requirements(description: &str) -> Vec<String> {
    description
        .split(['\n', '•', ';'])
        .flat_map(|chunk| chunk.split(". "))
        .map(|s| s.trim().trim_end_matches('.').trim())
        .filter(|s| (10..=300).contains(&s.chars().count()))
        .filter(|s| {
            let lower = s.to_lowercase();
            REQUIREMENT_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(str::to_string)
        .take(10)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn make_job() -> ScrapedJob {
        ScrapedJob {
            source: "indeed".to_string(),
            source_job_id: "abc".to_string(),
            title: "Senior Backend Engineer".to_string(),
            company: "Acme".to_string(),
            location: "Austin, TX".to_string(),
            salary_text: Some("$150,000 a year".to_string()),
            snippet: "short".to_string(),
            description: Some(
                "We build with Rust and PostgreSQL.\n\
                 5+ years of experience with distributed systems required.\n\
                 Benefits: health insurance, 401k and equity. Visa sponsorship available."
                    .to_string(),
            ),
            posted_text: Some("Posted 3 days ago".to_string()),
            job_type_tag: None,
            remote_tag: false,
            apply_url: "https://www.indeed.com/viewjob?jk=abc".to_string(),
        }
    }

    #[test]
    fn test_parse_posted_date_variants() {
        let now = make_now();
        assert_eq!(parse_posted_date(Some("Just posted"), now), now);
        assert_eq!(parse_posted_date(Some("Today"), now), now);
        assert_eq!(parse_posted_date(None, now), now);
        assert_eq!(
            parse_posted_date(Some("Yesterday"), now),
            now - Duration::days(1)
        );
        assert_eq!(
            parse_posted_date(Some("Posted 3 days ago"), now),
            now - Duration::days(3)
        );
        assert_eq!(
            parse_posted_date(Some("Active 30+ days ago"), now),
            now - Duration::days(30)
        );
        assert_eq!(
            parse_posted_date(Some("5 hours ago"), now),
            now - Duration::hours(5)
        );
        assert_eq!(parse_posted_date(Some("sometime"), now), now);
    }

    #[test]
    fn test_experience_level_order() {
        assert_eq!(detect_experience_level("junior developer"), "entry");
        assert_eq!(detect_experience_level("senior engineer"), "senior");
        assert_eq!(detect_experience_level("intermediate analyst"), "mid");
        assert_eq!(detect_experience_level("principal architect"), "principal");
        assert_eq!(detect_experience_level("software engineer"), "mid");
        // "leadership" is not "lead"
        assert_eq!(detect_experience_level("shows leadership"), "mid");
    }

    #[test]
    fn test_detect_job_type() {
        assert_eq!(detect_job_type(Some("Full time"), ""), "full-time");
        assert_eq!(detect_job_type(None, "this is a part-time role"), "part-time");
        assert_eq!(detect_job_type(None, "6 month contract"), "contract");
        assert_eq!(detect_job_type(None, "summer internship"), "internship");
        assert_eq!(detect_job_type(None, "great team"), "full-time");
    }

    #[test]
    fn test_enrich_full_job() {
        let job = enrich(make_job(), make_now());
        assert_eq!(job.posted_at, make_now() - Duration::days(3));
        assert_eq!(job.experience_level, "senior");
        assert!(job.skills.contains(&"rust".to_string()));
        assert!(job.skills.contains(&"postgresql".to_string()));
        assert!(job.benefits.contains(&"health insurance".to_string()));
        assert!(job.benefits.contains(&"401k".to_string()));
        assert!(job.benefits.contains(&"equity".to_string()));
        assert!(job.visa_sponsorship);
        assert!(!job.remote_work);
        assert_eq!(job.job_type, "full-time");
        assert_eq!(
            job.requirements,
            vec!["5+ years of experience with distributed systems required".to_string()]
        );
    }

    #[test]
    fn test_enrich_falls_back_to_snippet_and_detects_remote() {
        let mut raw = make_job();
        raw.description = None;
        raw.snippet = "Fully remote Python role".to_string();
        raw.title = "Developer".to_string();
        let job = enrich(raw, make_now());
        assert_eq!(job.description, "Fully remote Python role");
        assert!(job.remote_work);
        assert!(!job.visa_sponsorship);
        assert_eq!(job.skills, vec!["python".to_string()]);
    }
}
