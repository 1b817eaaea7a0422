//! ATS scoring engine.
//!
//! Scores a plain-text resume the way applicant tracking systems tend to: contact details,
//! layout, length, standard sections, experience and education signals, skills and keyword
//! coverage of the job description. Pure and synchronous.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::keywords::{mentions_skill, top_keywords};

const KEYWORD_LIMIT: usize = 30;
const DEFAULT_KEYWORD_SCORE: f64 = 70.0;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static LINKEDIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)linkedin\.com|linkedin\.in").unwrap());
static CITY_STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+,\s*[A-Z]{2}\b").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[•\-\*]\s").unwrap());

static DATE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\d{4}\s*[-–]\s*(\d{4}|present|current)",
        r"\d{1,2}/\d{4}\s*[-–]\s*\d{1,2}/\d{4}",
        r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)engineer|developer|manager|analyst|specialist|coordinator").unwrap()
});
static QUANTIFIED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+%|\$\d+|\d+\s+(users|customers|projects|team)").unwrap());
static INSTITUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)university|college|institute").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").unwrap());

static SECTION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)summary|profile|objective",
        r"(?i)experience|work|employment",
        r"(?i)education|academic",
        r"(?i)skills|technical|competencies",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const ACTION_VERBS: &[&str] = &[
    "developed",
    "managed",
    "led",
    "created",
    "implemented",
    "designed",
    "optimized",
];
const DEGREES: &[&str] = &["bachelor", "master", "phd", "b.s.", "m.s.", "b.a.", "m.a."];
const COMMON_SKILLS: &[&str] = &[
    "python",
    "java",
    "javascript",
    "react",
    "sql",
    "aws",
    "docker",
    "kubernetes",
    "git",
    "agile",
    "scrum",
    "machine learning",
    "ai",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtsAnalysis {
    pub overall: f64,
    pub keyword: f64,
    pub format: f64,
    pub length: f64,
    pub sections: f64,
    pub experience: f64,
    pub education: f64,
    pub skills: f64,
    pub contact: f64,
    pub job_keywords: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub recommendations: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

impl AtsAnalysis {
    /// Component scores as stored in `resume_versions.ats_breakdown`.
    pub fn breakdown(&self) -> Value {
        json!({
            "overall_score": self.overall,
            "keyword_score": self.keyword,
            "format_score": self.format,
            "length_score": self.length,
            "section_score": self.sections,
            "experience_score": self.experience,
            "education_score": self.education,
            "skills_score": self.skills,
            "contact_score": self.contact,
            "missing_keywords": self.missing_keywords,
        })
    }
}

pub fn score_resume(resume: &str, job_description: Option<&str>) -> AtsAnalysis {
    let mut analysis = AtsAnalysis {
        contact: score_contact(resume),
        format: score_format(resume),
        length: score_length(resume),
        sections: score_sections(resume),
        experience: score_experience(resume),
        education: score_education(resume),
        skills: score_skills(resume),
        keyword: DEFAULT_KEYWORD_SCORE,
        ..Default::default()
    };

    if let Some(jd) = job_description.filter(|jd| !jd.trim().is_empty()) {
        let coverage = keyword_coverage(resume, jd);
        analysis.keyword = coverage.score;
        analysis.job_keywords = coverage.keywords;
        analysis.matched_keywords = coverage.matched;
        analysis.missing_keywords = coverage.missing;
    }

    analysis.overall = (analysis.contact * 0.10
        + analysis.format * 0.10
        + analysis.sections * 0.15
        + analysis.experience * 0.30
        + analysis.education * 0.15
        + analysis.skills * 0.20
        + analysis.keyword * 0.30)
        .min(100.0);

    analysis.recommendations = recommendations(&analysis);
    analysis.improvement_suggestions = improvement_suggestions(&analysis);
    analysis
}

pub fn score_contact(text: &str) -> f64 {
    let mut score: f64 = 0.0;
    if EMAIL_RE.is_match(text) {
        score += 30.0;
    }
    if PHONE_RE.is_match(text) {
        score += 25.0;
    }
    if LINKEDIN_RE.is_match(text) {
        score += 20.0;
    }
    if CITY_STATE_RE.is_match(text) {
        score += 25.0;
    }
    score.min(100.0)
}

fn is_header_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().filter(|c| c.is_ascii_uppercase()).count() >= 2
        && trimmed.chars().all(|c| c.is_ascii_uppercase() || c == ' ')
}

pub fn score_format(text: &str) -> f64 {
    let mut score: f64 = 70.0;
    if BULLET_RE.find_iter(text).count() > 5 {
        score += 10.0;
    }
    if text.lines().filter(|l| is_header_line(l)).count() > 3 {
        score += 10.0;
    }
    if text.chars().count() > 5000 {
        score -= 10.0;
    }
    score.min(100.0)
}

pub fn score_length(text: &str) -> f64 {
    match text.split_whitespace().count() {
        300..=800 => 100.0,
        250..=299 | 801..=1000 => 80.0,
        200..=249 | 1001..=1200 => 60.0,
        _ => 40.0,
    }
}

pub fn score_sections(text: &str) -> f64 {
    let found = SECTION_RES.iter().filter(|re| re.is_match(text)).count();
    (found as f64 * 25.0).min(100.0)
}

pub fn score_experience(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score: f64 = 0.0;
    if DATE_RES.iter().any(|re| re.is_match(text)) {
        score += 20.0;
    }
    if TITLE_RE.is_match(text) {
        score += 20.0;
    }
    if QUANTIFIED_RE.is_match(text) {
        score += 30.0;
    }
    score += 5.0 * ACTION_VERBS.iter().filter(|v| lower.contains(*v)).count() as f64;
    score.min(100.0)
}

pub fn score_education(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score: f64 = 0.0;
    if DEGREES.iter().any(|d| lower.contains(d)) {
        score += 40.0;
    }
    if INSTITUTION_RE.is_match(text) {
        score += 30.0;
    }
    if YEAR_RE.is_match(text) {
        score += 30.0;
    }
    score.min(100.0)
}

pub fn score_skills(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let found = COMMON_SKILLS
        .iter()
        .filter(|s| mentions_skill(&lower, s))
        .count();
    (found as f64 * 10.0).min(100.0)
}

pub struct KeywordCoverage {
    pub score: f64,
    pub keywords: Vec<String>,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

/// Share of the job's top keywords that appear in the resume. Missing keywords keep job order.
pub fn keyword_coverage(resume: &str, job_description: &str) -> KeywordCoverage {
    let keywords = top_keywords(job_description, KEYWORD_LIMIT);
    let lower = resume.to_lowercase();
    let (matched, missing): (Vec<String>, Vec<String>) =
        keywords.iter().cloned().partition(|k| lower.contains(k.as_str()));

    let score = if keywords.is_empty() {
        DEFAULT_KEYWORD_SCORE
    } else {
        matched.len() as f64 / keywords.len() as f64 * 100.0
    };

    KeywordCoverage {
        score,
        keywords,
        matched,
        missing,
    }
}

fn recommendations(analysis: &AtsAnalysis) -> Vec<String> {
    let mut out = Vec::new();
    if analysis.contact < 80.0 {
        out.push(
            "Add complete contact information including email, phone, and LinkedIn profile"
                .to_string(),
        );
    }
    if analysis.keyword < 70.0 {
        out.push("Include more relevant keywords from the job description".to_string());
    }
    if analysis.experience < 80.0 {
        out.push("Add more quantified achievements and use stronger action verbs".to_string());
    }
    if analysis.skills < 70.0 {
        out.push("Expand the skills section with more relevant technical skills".to_string());
    }
    if analysis.format < 80.0 {
        out.push(
            "Improve formatting with consistent bullet points and clear section headers"
                .to_string(),
        );
    }
    out
}

fn improvement_suggestions(analysis: &AtsAnalysis) -> Vec<String> {
    let mut out = Vec::new();
    if !analysis.missing_keywords.is_empty() {
        let first: Vec<&str> = analysis
            .missing_keywords
            .iter()
            .take(5)
            .map(String::as_str)
            .collect();
        out.push(format!(
            "Consider adding these missing keywords: {}",
            first.join(", ")
        ));
    }
    if analysis.overall < 80.0 {
        out.push(
            "Overall ATS score can be improved by focusing on keyword optimization and formatting"
                .to_string(),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "\
Jane Doe
jane.doe@example.com | (512) 555-0199 | linkedin.com/in/janedoe | Austin, TX

SUMMARY
Backend engineer with 6 years of experience.

EXPERIENCE
Senior Software Engineer, Acme Corp, Jan 2020 - Present
• Developed a Rust billing service handling 2000 customers
• Led migration to PostgreSQL, cutting latency 40%
• Implemented CI pipelines with Docker

EDUCATION
B.S. Computer Science, University of Texas, 2016

SKILLS
Python, Docker, AWS, Git, SQL
";

    #[test]
    fn test_contact_score_components() {
        assert_eq!(score_contact(RESUME), 100.0);
        assert_eq!(score_contact("jane@example.com"), 30.0);
        assert_eq!(score_contact("no contact details here"), 0.0);
    }

    #[test]
    fn test_length_bands() {
        let words = |n: usize| vec!["word"; n].join(" ");
        assert_eq!(score_length(&words(500)), 100.0);
        assert_eq!(score_length(&words(260)), 80.0);
        assert_eq!(score_length(&words(900)), 80.0);
        assert_eq!(score_length(&words(220)), 60.0);
        assert_eq!(score_length(&words(1100)), 60.0);
        assert_eq!(score_length(&words(50)), 40.0);
    }

    #[test]
    fn test_format_score() {
        // 3 bullets, 4 header lines
        assert_eq!(score_format(RESUME), 80.0);
        let long = "x".repeat(5001);
        assert_eq!(score_format(&long), 60.0);
    }

    #[test]
    fn test_experience_and_education_scores() {
        // date 20 + title 20 + quantified 30 + developed/led/implemented 15
        assert_eq!(score_experience(RESUME), 85.0);
        assert_eq!(score_education(RESUME), 100.0);
        assert_eq!(score_education("Self taught"), 0.0);
    }

    #[test]
    fn test_sections_and_skills() {
        assert_eq!(score_sections(RESUME), 100.0);
        // python, docker, aws, git, sql
        assert_eq!(score_skills(RESUME), 50.0);
    }

    #[test]
    fn test_keyword_coverage_reports_missing_in_job_order() {
        let jd = "Kubernetes Kubernetes Rust Rust Rust PostgreSQL Terraform";
        let coverage = keyword_coverage(RESUME, jd);
        assert_eq!(
            coverage.keywords,
            vec!["rust", "kubernetes", "postgresql", "terraform"]
        );
        assert_eq!(coverage.matched, vec!["rust", "postgresql"]);
        assert_eq!(coverage.missing, vec!["kubernetes", "terraform"]);
        assert!((coverage.score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_keyword_score_without_job() {
        let analysis = score_resume(RESUME, None);
        assert_eq!(analysis.keyword, 70.0);
        assert!(analysis.missing_keywords.is_empty());
    }

    #[test]
    fn test_overall_is_clamped_and_suggests_missing_keywords() {
        let analysis = score_resume(RESUME, Some("Kubernetes Terraform Kafka Helm Istio Vault"));
        assert!(analysis.overall <= 100.0, "got {}", analysis.overall);
        assert_eq!(analysis.keyword, 0.0);
        assert!(analysis.improvement_suggestions[0]
            .starts_with("Consider adding these missing keywords: kubernetes"));
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("keywords from the job description")));
    }

    #[test]
    fn test_perfect_components_never_exceed_100() {
        // weighted components sum to 129 here before clamping
        let resume = format!(
            "{RESUME}\nJava JavaScript React Kubernetes Agile Scrum machine learning AI\n{}",
            "• Designed and optimized and managed and created systems for 5 projects\n".repeat(5)
        );
        let analysis = score_resume(&resume, Some("python docker"));
        assert_eq!(analysis.keyword, 100.0);
        assert!(analysis.overall <= 100.0);
        assert_eq!(analysis.overall, 100.0);
    }
}
