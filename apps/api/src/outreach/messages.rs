//! Recruiter relevance, contact ranking and the fixed message texts used when the
//! LLM is unavailable. Every stored message fits LinkedIn's 300-character limit.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::outreach::RecruiterContactRow;

pub const MAX_MESSAGE_CHARS: usize = 300;
/// Follow-ups stop after the third.
pub const MAX_FOLLOW_UPS: i32 = 3;
pub const FOLLOW_UP_AFTER_HOURS: i64 = 24;
const SEND_DELAY_SECS: std::ops::RangeInclusive<u64> = 5..=15;

static HR_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhr\b").unwrap());

const RELEVANT_TITLE_TERMS: &[&str] = &[
    "talent acquisition",
    "recruiter",
    "hiring manager",
    "people operations",
    "human resources",
    "talent partner",
    "staffing",
    "recruitment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ConnectionRequest,
    FollowUp,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::ConnectionRequest => "connection_request",
            MessageType::FollowUp => "follow_up",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Drafted,
    Sent,
    Connected,
    Replied,
    Declined,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Drafted => "drafted",
            MessageStatus::Sent => "sent",
            MessageStatus::Connected => "connected",
            MessageStatus::Replied => "replied",
            MessageStatus::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "drafted" => Some(MessageStatus::Drafted),
            "sent" => Some(MessageStatus::Sent),
            "connected" => Some(MessageStatus::Connected),
            "replied" => Some(MessageStatus::Replied),
            "declined" => Some(MessageStatus::Declined),
            _ => None,
        }
    }
}

fn mentions_hr(title_lower: &str) -> bool {
    HR_WORD_RE.is_match(title_lower)
}

pub fn is_relevant_title(title: &str) -> bool {
    let title = title.to_lowercase();
    RELEVANT_TITLE_TERMS.iter().any(|t| title.contains(t)) || mentions_hr(&title)
}

/// Seniority first, then the recruiting function named in the title.
pub fn relevance_score(title: &str) -> f64 {
    let title = title.to_lowercase();
    if title.contains("senior") || title.contains("lead") {
        0.9
    } else if title.contains("talent acquisition") {
        0.8
    } else if title.contains("recruiter") {
        0.7
    } else if title.contains("hiring manager") {
        0.6
    } else if mentions_hr(&title) {
        0.5
    } else {
        0.3
    }
}

#[derive(Debug, Clone)]
pub struct RankedContact {
    pub contact: RecruiterContactRow,
    pub relevance: f64,
}

/// Relevant contacts, one per name (first seen wins), most relevant first.
pub fn rank_contacts(contacts: Vec<RecruiterContactRow>) -> Vec<RankedContact> {
    let mut seen = std::collections::HashSet::new();
    let mut ranked: Vec<RankedContact> = contacts
        .into_iter()
        .filter(|c| is_relevant_title(&c.title))
        .filter(|c| seen.insert(c.name.trim().to_lowercase()))
        .map(|contact| RankedContact {
            relevance: relevance_score(&contact.title),
            contact,
        })
        .collect();
    ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    ranked
}

pub fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or("there")
}

/// Cuts to at most 300 characters on a char boundary.
pub fn truncate_message(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

pub fn connection_templates(recipient_name: &str, job_title: &str, company: &str) -> [String; 3] {
    let name = first_name(recipient_name);
    [
        format!(
            "Hi {name}, I'm interested in {job_title} opportunities at {company}. \
             Would love to connect and learn more about your team's hiring needs."
        ),
        format!(
            "Hello {name}, I noticed your role at {company} and am very interested in {job_title} \
             positions. Would appreciate connecting to discuss potential opportunities."
        ),
        format!(
            "Hi {name}, I'm actively exploring {job_title} roles and would love to connect \
             to learn about opportunities at {company}. Thank you!"
        ),
    ]
}

pub fn template_connection_message<R: Rng + ?Sized>(
    recipient_name: &str,
    job_title: &str,
    company: &str,
    rng: &mut R,
) -> String {
    let templates = connection_templates(recipient_name, job_title, company);
    let chosen = templates.choose(rng).map(String::as_str).unwrap_or_default();
    truncate_message(chosen)
}

/// Fixed follow-up text for follow-up number `sequence` (1-based).
pub fn follow_up_text(recipient_name: &str, sequence: i32) -> String {
    let name = first_name(recipient_name);
    let text = match sequence {
        1 => format!(
            "Hi {name}, I wanted to follow up on my previous message. I'm still very interested \
             in exploring opportunities and would love to connect when you have a moment."
        ),
        2 => format!(
            "Hi {name}, I hope you're doing well. I wanted to reach out once more to see if there \
             might be any opportunities that align with my background. Thanks for your time!"
        ),
        _ => format!(
            "Hi {name}, this will be my final follow-up. If you have any opportunities in the \
             future, I'd love to hear from you. Thanks!"
        ),
    };
    truncate_message(&text)
}

/// LLM output accepted as-is only when it is non-empty and within the limit.
pub fn accept_generated(text: &str) -> Option<String> {
    let text = text.trim().trim_matches('"').trim();
    (!text.is_empty() && text.chars().count() <= MAX_MESSAGE_CHARS).then(|| text.to_string())
}

/// Recommended pause before sending the next draft.
pub fn send_delay_secs<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen_range(SEND_DELAY_SECS)
}

/// Pause before the draft at `position` of a batch that may span several companies.
/// With fixed spacing only the batch's very first draft goes out at once.
pub fn spaced_send_after<R: Rng + ?Sized>(spacing: Option<u64>, position: usize, rng: &mut R) -> u64 {
    match spacing {
        Some(_) if position == 0 => 0,
        Some(spacing) => spacing,
        None => send_delay_secs(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn make_contact(name: &str, title: &str) -> RecruiterContactRow {
        RecruiterContactRow {
            id: Uuid::new_v4(),
            company: "Acme".to_string(),
            name: name.to_string(),
            title: title.to_string(),
            profile_url: None,
            email: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_relevance_table() {
        assert_eq!(relevance_score("Senior Technical Recruiter"), 0.9);
        assert_eq!(relevance_score("Talent Acquisition Partner"), 0.8);
        assert_eq!(relevance_score("Technical Recruiter"), 0.7);
        assert_eq!(relevance_score("Hiring Manager, Platform"), 0.6);
        assert_eq!(relevance_score("HR Generalist"), 0.5);
        assert_eq!(relevance_score("Staffing Coordinator"), 0.3);
    }

    #[test]
    fn test_is_relevant_title() {
        assert!(is_relevant_title("HR Business Partner"));
        assert!(is_relevant_title("Head of People Operations"));
        assert!(is_relevant_title("Recruitment Consultant"));
        assert!(!is_relevant_title("Software Engineer"));
        assert!(!is_relevant_title("Chief Threat Officer"), "hr inside a word is not HR");
    }

    #[test]
    fn test_rank_contacts_filters_dedupes_and_orders() {
        let ranked = rank_contacts(vec![
            make_contact("Bo Chen", "HR Generalist"),
            make_contact("Ana Ruiz", "Technical Recruiter"),
            make_contact("ana ruiz", "Senior Recruiter"),
            make_contact("Sam Lee", "Backend Engineer"),
            make_contact("Kim Park", "Lead Talent Partner"),
        ]);

        let names: Vec<&str> = ranked.iter().map(|r| r.contact.name.as_str()).collect();
        assert_eq!(names, vec!["Kim Park", "Ana Ruiz", "Bo Chen"]);
        assert_eq!(ranked[1].relevance, 0.7);
    }

    #[test]
    fn test_truncate_message_on_char_boundary() {
        let long = "é".repeat(400);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(truncate_message("  short  "), "short");
    }

    #[test]
    fn test_templates_fit_limit_and_use_first_name() {
        let mut rng = StdRng::seed_from_u64(7);
        let long_company = "A".repeat(250);
        for _ in 0..10 {
            let message =
                template_connection_message("Ana Ruiz", "Backend Engineer", &long_company, &mut rng);
            assert!(message.chars().count() <= MAX_MESSAGE_CHARS);
            assert!(message.contains("Ana"), "Expected first name, got {message}");
            assert!(!message.contains("Ruiz"));
        }
        for sequence in 1..=4 {
            let text = follow_up_text("Ana Ruiz", sequence);
            assert!(text.starts_with("Hi Ana,"));
            assert!(text.chars().count() <= MAX_MESSAGE_CHARS);
        }
        assert!(follow_up_text("Ana", 3).contains("final follow-up"));
    }

    #[test]
    fn test_accept_generated() {
        assert_eq!(accept_generated("\"Hi Ana!\""), Some("Hi Ana!".to_string()));
        assert_eq!(accept_generated("   "), None);
        assert_eq!(accept_generated(&"x".repeat(301)), None);
    }

    #[test]
    fn test_spacing_carries_across_companies() {
        let mut rng = StdRng::seed_from_u64(3);
        // two drafts for the first company, then the second company's run starts at 2
        let first_company: Vec<u64> = (0..2).map(|i| spaced_send_after(Some(300), i, &mut rng)).collect();
        let second_company: Vec<u64> =
            (2..4).map(|i| spaced_send_after(Some(300), i, &mut rng)).collect();

        assert_eq!(first_company, vec![0, 300]);
        assert_eq!(
            second_company,
            vec![300, 300],
            "Expected the second company's first draft to be spaced, got {second_company:?}"
        );

        let random = spaced_send_after(None, 0, &mut rng);
        assert!((5..=15).contains(&random), "Expected 5-15s, got {random}");
    }

    #[test]
    fn test_send_delay_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let delay = send_delay_secs(&mut rng);
            assert!((5..=15).contains(&delay), "Expected 5..=15, got {delay}");
        }
    }
}
