//! Resume text parser: contact details, skills, sections and a quality score.
//!
//! Pure and synchronous. Input is the plain text produced by `extract`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::keywords::{dedupe_case_insensitive, extract_tech_skills};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?(\d{3})\)?[-.\s]?(\d{3})[-.\s]?(\d{4})\b").unwrap()
});
static LINKEDIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)linkedin\.com/in/([A-Za-z0-9_-]+)").unwrap());
static GITHUB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)github\.com/([A-Za-z0-9_-]+)").unwrap());
static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)*),\s*([A-Z]{2})\b").unwrap());
static YEARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2})(?:\+\s*(?:years?|yrs)|\s+(?:years?|yrs)\s+of\s+experience)")
        .unwrap()
});

const SKILL_HEADERS: &[&str] = &["skills", "technical skills", "core competencies"];
const EXPERIENCE_HEADERS: &[&str] = &[
    "experience",
    "work experience",
    "professional experience",
    "employment history",
    "work history",
];
const EDUCATION_HEADERS: &[&str] = &["education", "academic background"];

/// Every header the parser treats as a section boundary.
pub const SECTION_HEADERS: &[&str] = &[
    "summary",
    "professional summary",
    "objective",
    "profile",
    "about",
    "experience",
    "work experience",
    "professional experience",
    "employment history",
    "work history",
    "education",
    "academic background",
    "skills",
    "technical skills",
    "core competencies",
    "projects",
    "certifications",
    "awards",
    "publications",
    "languages",
    "interests",
    "volunteer",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub years_experience: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeQuality {
    pub score: u32,
    pub suggestions: Vec<String>,
}

/// Normalised header key for a line, if the line is a known section header.
pub fn header_key(line: &str) -> Option<&'static str> {
    let normalised = line
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
        .replace('&', "and");
    SECTION_HEADERS.iter().copied().find(|h| *h == normalised)
}

/// Non-empty lines under the first header in `names`, up to the next known header.
pub fn section_lines(text: &str, names: &[&str]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut inside = false;

    for line in text.lines() {
        match header_key(line) {
            Some(key) if names.contains(&key) && !inside && lines.is_empty() => inside = true,
            Some(_) if inside => break,
            _ if inside => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            _ => {}
        }
    }

    lines
}

pub fn parse_resume(text: &str) -> ParsedResume {
    ParsedResume {
        full_name: extract_name(text),
        email: EMAIL_RE.find(text).map(|m| m.as_str().to_string()),
        phone: extract_phone(text),
        linkedin_url: LINKEDIN_RE
            .captures(text)
            .map(|c| format!("https://linkedin.com/in/{}", &c[1])),
        github_url: GITHUB_RE
            .captures(text)
            .map(|c| format!("https://github.com/{}", &c[1])),
        location: LOCATION_RE
            .captures(text)
            .map(|c| format!("{}, {}", &c[1], &c[2])),
        skills: extract_skills(text),
        experience: section_lines(text, EXPERIENCE_HEADERS),
        education: section_lines(text, EDUCATION_HEADERS),
        years_experience: YEARS_RE
            .captures_iter(text)
            .filter_map(|c| c[1].parse::<i32>().ok())
            .max(),
    }
}

fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE
        .captures(text)
        .map(|c| format!("({}) {}-{}", &c[1], &c[2], &c[3]))
}

fn extract_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| {
            line.split_whitespace().count() <= 4
                && !line.contains('@')
                && !line.chars().any(|c| c.is_ascii_digit())
                && header_key(line).is_none()
        })
        .map(str::to_string)
}

fn extract_skills(text: &str) -> Vec<String> {
    let section = section_lines(text, SKILL_HEADERS).join("\n");

    let listed = section
        .split(|c: char| matches!(c, ',' | '•' | '·' | '|' | '\n' | ';'))
        .map(|item| match item.split_once(':') {
            Some((_, rest)) => rest.trim(),
            None => item.trim(),
        })
        .map(|item| item.trim_start_matches(['-', '*']).trim())
        .filter(|item| {
            let len = item.chars().count();
            (2..=40).contains(&len)
        })
        .map(str::to_string);

    dedupe_case_insensitive(listed.chain(extract_tech_skills(text)))
}

pub fn assess_quality(parsed: &ParsedResume) -> ResumeQuality {
    let mut score = 0;
    let mut suggestions = Vec::new();

    if parsed.email.is_some() {
        score += 20;
    } else {
        suggestions.push("Add a professional email address".to_string());
    }
    if parsed.phone.is_some() {
        score += 10;
    } else {
        suggestions.push("Add a phone number".to_string());
    }
    if parsed.skills.len() >= 5 {
        score += 25;
    } else {
        suggestions.push("List at least 5 relevant skills in a Skills section".to_string());
    }
    if !parsed.experience.is_empty() {
        score += 30;
    } else {
        suggestions.push("Add an Experience section with your roles".to_string());
    }
    if !parsed.education.is_empty() {
        score += 15;
    } else {
        suggestions.push("Add an Education section".to_string());
    }

    ResumeQuality { score, suggestions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_resume() -> &'static str {
        "Jane Q Doe\n\
         jane.doe@example.com | +1 415-555-0134 | linkedin.com/in/janedoe | github.com/jdoe\n\
         Austin, TX\n\
         \n\
         SUMMARY\n\
         Backend engineer with 7+ years of building APIs.\n\
         \n\
         EXPERIENCE\n\
         Senior Engineer, Acme Corp 2019 - 2024\n\
         • Led migration to Kubernetes\n\
         \n\
         Education\n\
         B.S. Computer Science, State University 2015\n\
         \n\
         Technical Skills:\n\
         Languages: Rust, Python, Go\n\
         PostgreSQL • Redis | Docker; Terraform\n"
    }

    #[test]
    fn test_parse_contact_details() {
        let parsed = parse_resume(make_resume());
        assert_eq!(parsed.full_name.as_deref(), Some("Jane Q Doe"));
        assert_eq!(parsed.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(parsed.phone.as_deref(), Some("(415) 555-0134"));
        assert_eq!(
            parsed.linkedin_url.as_deref(),
            Some("https://linkedin.com/in/janedoe")
        );
        assert_eq!(parsed.github_url.as_deref(), Some("https://github.com/jdoe"));
        assert_eq!(parsed.location.as_deref(), Some("Austin, TX"));
    }

    #[test]
    fn test_parse_skills_section_and_known_skills() {
        let parsed = parse_resume(make_resume());
        for expected in ["Rust", "Python", "Go", "PostgreSQL", "Redis", "Docker", "Terraform"] {
            assert!(
                parsed.skills.iter().any(|s| s == expected),
                "Expected skill {expected}, got {:?}",
                parsed.skills
            );
        }
        // kubernetes only appears in experience, picked up from the known list
        assert!(parsed.skills.iter().any(|s| s == "kubernetes"));
        // no case-insensitive duplicates
        assert_eq!(
            parsed.skills.iter().filter(|s| s.eq_ignore_ascii_case("rust")).count(),
            1
        );
    }

    #[test]
    fn test_parse_sections_and_years() {
        let parsed = parse_resume(make_resume());
        assert_eq!(parsed.experience.len(), 2);
        assert_eq!(parsed.education.len(), 1);
        assert_eq!(parsed.years_experience, Some(7));
    }

    #[test]
    fn test_quality_full_marks() {
        let quality = assess_quality(&parse_resume(make_resume()));
        assert_eq!(quality.score, 100, "Expected 100, got {}", quality.score);
        assert!(quality.suggestions.is_empty());
    }

    #[test]
    fn test_quality_empty_resume() {
        let quality = assess_quality(&parse_resume("just some words"));
        assert_eq!(quality.score, 0);
        assert_eq!(quality.suggestions.len(), 5);
    }

    #[test]
    fn test_name_skips_contact_lines() {
        let parsed = parse_resume("john@example.com\n555 123 4567\nJohn Smith\n");
        assert_eq!(parsed.full_name.as_deref(), Some("John Smith"));
    }

    #[test]
    fn test_header_key_normalises() {
        assert_eq!(header_key("  Technical Skills: "), Some("technical skills"));
        assert_eq!(header_key("WORK EXPERIENCE"), Some("work experience"));
        assert_eq!(header_key("Built things"), None);
    }
}
