// LLM prompts for recruiter outreach drafts.

use crate::llm_client::prompts::TRUTHFULNESS_INSTRUCTION;
use crate::models::candidate::CandidateRow;

pub const OUTREACH_SYSTEM: &str = "You write short, professional LinkedIn messages from job \
    seekers to recruiters. Reply with the message text only: no quotes, no formatting.";

const CONNECTION_PROMPT_TEMPLATE: &str = r#"Write a LinkedIn connection request from a job seeker to a recruiter.

Candidate: {name}
Years of experience: {years}
Top skills: {skills}

Recruiter: {recipient}
Title: {title}
Company: {company}

Role of interest: {job_title}
Tone: {tone}

Requirements:
- Under 300 characters (LinkedIn limit)
- Professional but personable
- Mention the specific role and the company
- End with a clear call to action
- {truthfulness}"#;

const FOLLOW_UP_PROMPT_TEMPLATE: &str = r#"Write follow-up #{sequence} to a LinkedIn message sent {days} days ago.

Candidate: {name}
Recruiter: {recipient}
Company: {company}
Original message: {original}

Requirements:
- Under 300 characters
- Brief and polite; reference the original message
- Add one new piece of value and a clear next step
- {truthfulness}"#;

pub fn build_connection_prompt(
    candidate: &CandidateRow,
    recipient: &str,
    title: &str,
    company: &str,
    job_title: &str,
    tone: &str,
) -> String {
    CONNECTION_PROMPT_TEMPLATE
        .replace("{name}", &candidate.full_name)
        .replace(
            "{years}",
            &candidate
                .years_experience
                .map_or("N/A".to_string(), |y| y.to_string()),
        )
        .replace(
            "{skills}",
            &candidate.skills.iter().take(3).cloned().collect::<Vec<_>>().join(", "),
        )
        .replace("{recipient}", recipient)
        .replace("{title}", title)
        .replace("{company}", company)
        .replace("{job_title}", job_title)
        .replace("{tone}", tone)
        .replace("{truthfulness}", TRUTHFULNESS_INSTRUCTION)
}

pub fn build_follow_up_prompt(
    candidate: &CandidateRow,
    recipient: &str,
    company: &str,
    original: &str,
    sequence: i32,
    days_since: i64,
) -> String {
    FOLLOW_UP_PROMPT_TEMPLATE
        .replace("{sequence}", &sequence.to_string())
        .replace("{days}", &days_since.to_string())
        .replace("{name}", &candidate.full_name)
        .replace("{recipient}", recipient)
        .replace("{company}", company)
        .replace("{original}", original)
        .replace("{truthfulness}", TRUTHFULNESS_INSTRUCTION)
}
