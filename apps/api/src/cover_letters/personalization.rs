//! Tone styles, personalization hooks and ATS keyword selection for cover letters.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cover_letters::research::CompanyResearch;
use crate::keywords::{dedupe_case_insensitive, mentions_skill};

const MAX_HOOKS: usize = 3;
const MAX_ATS_KEYWORDS: usize = 15;

static CAPITALISED_PHRASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap());
static DOTTED_TERM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]+(?:\.[a-z]+)+\b").unwrap());
static REQUIREMENT_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d+\+?\s*years?\s*(?:of\s*)?(?:experience|exp)",
        r"\b(?:bachelor|master|phd|degree)\b",
        r"\b(?:remote|hybrid|on-site)\b",
        r"\b(?:full-time|part-time|contract)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Formal,
    Curious,
    #[serde(alias = "friendly")]
    Warm,
    #[serde(alias = "challenger")]
    Bold,
    Strategic,
}

/// Order used when several versions are generated for the same job.
pub const VERSION_TONES: [Tone; 5] = [
    Tone::Formal,
    Tone::Warm,
    Tone::Curious,
    Tone::Strategic,
    Tone::Bold,
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToneStyle {
    pub greeting: &'static str,
    pub intro_style: &'static str,
    pub body_style: &'static str,
    pub closing: &'static str,
    pub language_level: &'static str,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Curious => "curious",
            Tone::Warm => "warm",
            Tone::Bold => "bold",
            Tone::Strategic => "strategic",
        }
    }

    /// Accepts outreach tone names too: `friendly` is warm, `challenger` is bold.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "formal" => Some(Tone::Formal),
            "curious" => Some(Tone::Curious),
            "warm" | "friendly" => Some(Tone::Warm),
            "bold" | "challenger" => Some(Tone::Bold),
            "strategic" => Some(Tone::Strategic),
            _ => None,
        }
    }

    pub fn style(self) -> ToneStyle {
        match self {
            Tone::Formal => ToneStyle {
                greeting: "Dear Hiring Manager,",
                intro_style: "professional",
                body_style: "structured",
                closing: "Sincerely,",
                language_level: "formal",
            },
            Tone::Curious => ToneStyle {
                greeting: "Hello there!",
                intro_style: "question-based",
                body_style: "exploratory",
                closing: "Looking forward to learning more,",
                language_level: "conversational",
            },
            Tone::Warm => ToneStyle {
                greeting: "Hi team,",
                intro_style: "personal",
                body_style: "story-driven",
                closing: "Best regards,",
                language_level: "friendly",
            },
            Tone::Bold => ToneStyle {
                greeting: "Dear Hiring Team,",
                intro_style: "confident",
                body_style: "achievement-focused",
                closing: "Ready to contribute,",
                language_level: "assertive",
            },
            Tone::Strategic => ToneStyle {
                greeting: "Dear Hiring Manager,",
                intro_style: "value-proposition",
                body_style: "results-oriented",
                closing: "Best regards,",
                language_level: "business",
            },
        }
    }

    /// "Formal", "Warm", ...
    pub fn title(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Up to three hooks, in order: mission, shared tech stack, culture.
pub fn personalization_hooks(
    company: &str,
    research: &CompanyResearch,
    candidate_skills: &[String],
) -> Vec<String> {
    let mut hooks = Vec::new();

    if !research.mission.is_empty() {
        let mission = truncate_chars(&research.mission, 100);
        let ellipsis = if mission.len() < research.mission.len() { "..." } else { "" };
        hooks.push(format!("I was drawn to {company}'s mission: {mission}{ellipsis}"));
    }

    let skills: Vec<String> = candidate_skills.iter().map(|s| s.to_lowercase()).collect();
    let shared: Vec<&str> = research
        .tech_stack
        .iter()
        .filter(|t| skills.contains(&t.to_lowercase()))
        .map(String::as_str)
        .take(3)
        .collect();
    if !shared.is_empty() {
        hooks.push(format!(
            "I notice you use {}, which aligns closely with my expertise",
            shared.join(", ")
        ));
    }

    if !research.culture_keywords.is_empty() {
        let culture: Vec<&str> = research
            .culture_keywords
            .iter()
            .take(2)
            .map(String::as_str)
            .collect();
        hooks.push(format!(
            "Your {} culture resonates with my professional values",
            culture.join(", ")
        ));
    }

    hooks.truncate(MAX_HOOKS);
    hooks
}

/// Job-description phrases worth echoing in the letter: capitalised phrases and dotted
/// tech terms that contain a candidate skill, then stated requirements (years, degree,
/// work mode, contract type). First-seen order, at most 15.
pub fn ats_keywords(job_description: &str, candidate_skills: &[String]) -> Vec<String> {
    let lower = job_description.to_lowercase();
    let mut found: Vec<String> = Vec::new();

    let phrases = CAPITALISED_PHRASE_RE
        .find_iter(job_description)
        .map(|m| m.as_str().to_string())
        .chain(DOTTED_TERM_RE.find_iter(&lower).map(|m| m.as_str().to_string()));
    for phrase in phrases {
        let phrase_lower = phrase.to_lowercase();
        if candidate_skills
            .iter()
            .any(|skill| mentions_skill(&phrase_lower, skill))
        {
            found.push(phrase);
        }
    }

    for re in REQUIREMENT_RES.iter() {
        found.extend(re.find_iter(&lower).map(|m| m.as_str().to_string()));
    }

    let mut keywords = dedupe_case_insensitive(found);
    keywords.truncate(MAX_ATS_KEYWORDS);
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_research() -> CompanyResearch {
        CompanyResearch {
            domain: Some("acme.io".to_string()),
            about: String::new(),
            mission: "Our mission is to make payments boring and reliable for every small business on earth, everywhere, all the time.".to_string(),
            tech_stack: vec!["python".to_string(), "kubernetes".to_string(), "react".to_string()],
            culture_keywords: vec!["collaborative".to_string(), "remote-first".to_string(), "inclusive".to_string()],
            sources: vec![],
        }
    }

    #[test]
    fn test_tone_parse_accepts_outreach_names() {
        assert_eq!(Tone::parse("friendly"), Some(Tone::Warm));
        assert_eq!(Tone::parse("Challenger"), Some(Tone::Bold));
        assert_eq!(Tone::parse("strategic"), Some(Tone::Strategic));
        assert_eq!(Tone::parse("sarcastic"), None);
        let tone: Tone = serde_json::from_str("\"friendly\"").unwrap();
        assert_eq!(tone, Tone::Warm);
    }

    #[test]
    fn test_tone_styles() {
        assert_eq!(Tone::Curious.style().greeting, "Hello there!");
        assert_eq!(Tone::Bold.style().closing, "Ready to contribute,");
        assert_eq!(Tone::Strategic.style().body_style, "results-oriented");
        assert_eq!(Tone::Warm.title(), "Warm");
    }

    #[test]
    fn test_hooks_in_order_and_capped() {
        let skills = vec!["Python".to_string(), "Kubernetes".to_string()];
        let hooks = personalization_hooks("Acme", &make_research(), &skills);

        assert_eq!(hooks.len(), 3, "Expected 3 hooks, got {hooks:?}");
        assert!(hooks[0].starts_with("I was drawn to Acme's mission: Our mission"));
        assert!(hooks[0].ends_with("..."));
        assert_eq!(
            hooks[1],
            "I notice you use python, kubernetes, which aligns closely with my expertise"
        );
        assert_eq!(
            hooks[2],
            "Your collaborative, remote-first culture resonates with my professional values"
        );
    }

    #[test]
    fn test_hooks_empty_without_research() {
        let hooks = personalization_hooks("Acme", &CompanyResearch::default(), &[]);
        assert!(hooks.is_empty());
    }

    #[test]
    fn test_ats_keywords() {
        let jd = "Senior Rust Engineer at Acme. You know Rust Async and node.js. \
                  5+ years of experience required, Bachelor degree preferred. \
                  Remote, full-time. Rust Async again.";
        let skills = vec!["Rust".to_string(), "node.js".to_string()];
        let keywords = ats_keywords(jd, &skills);

        assert_eq!(
            keywords,
            vec![
                "Senior Rust Engineer".to_string(),
                "Rust Async".to_string(),
                "node.js".to_string(),
                "5+ years of experience".to_string(),
                "bachelor".to_string(),
                "degree".to_string(),
                "remote".to_string(),
                "full-time".to_string(),
            ]
        );
    }
}
