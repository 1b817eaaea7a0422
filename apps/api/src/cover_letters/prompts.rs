// LLM prompts for cover letter generation.

use crate::cover_letters::personalization::Tone;
use crate::cover_letters::research::CompanyResearch;
use crate::llm_client::prompts::{clip, TRUTHFULNESS_INSTRUCTION};
use crate::models::candidate::CandidateRow;
use crate::models::job::JobRow;

pub const COVER_LETTER_SYSTEM: &str = "You are an expert career coach who writes concise, \
    personalized cover letters that get responses. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a personalized, ATS-friendly cover letter.

CANDIDATE:
- Name: {name}
- Years of Experience: {years}
- Skills: {skills}
- Target Roles: {target_roles}

JOB:
- Company: {company}
- Position: {position}
- Hiring Manager: {hiring_manager}

JOB DESCRIPTION:
{description}

COMPANY RESEARCH:
{research}

TONE:
- Tone: {tone}
- Greeting: {greeting}
- Introduction style: {intro_style}
- Body style: {body_style}
- Closing: {closing}
- Language level: {language_level}

PERSONALIZATION HOOKS (use one or two):
{hooks}

ATS KEYWORDS TO WORK IN NATURALLY:
{keywords}

GUIDELINES:
1. 250-400 words: greeting, three body paragraphs, closing, signature
2. Opening: hook, interest in the position, short value proposition
3. Body: relevant experience, skills alignment with the company, future contribution
4. Keep the tone consistent and end with a clear call to action
5. {truthfulness}

Return a JSON object with this EXACT schema:
{
  "content": "the full cover letter",
  "reasoning": "the choices you made",
  "key_selling_points": ["..."],
  "improvement_suggestions": ["..."]
}"#;

fn research_block(research: &CompanyResearch) -> String {
    if research.is_empty() {
        return "No research data available".to_string();
    }
    let mut lines = Vec::new();
    if !research.about.is_empty() {
        lines.push(format!("About: {}", research.about));
    }
    if !research.mission.is_empty() {
        lines.push(format!("Mission: {}", research.mission));
    }
    if !research.tech_stack.is_empty() {
        lines.push(format!("Tech stack: {}", research.tech_stack.join(", ")));
    }
    if !research.culture_keywords.is_empty() {
        lines.push(format!("Culture: {}", research.culture_keywords.join(", ")));
    }
    lines.join("\n")
}

pub fn build_cover_letter_prompt(
    candidate: &CandidateRow,
    job: &JobRow,
    research: &CompanyResearch,
    tone: Tone,
    hooks: &[String],
    keywords: &[String],
    hiring_manager: Option<&str>,
) -> String {
    let style = tone.style();
    let hooks = if hooks.is_empty() {
        "- none".to_string()
    } else {
        hooks
            .iter()
            .map(|h| format!("- {h}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{name}", &candidate.full_name)
        .replace(
            "{years}",
            &candidate
                .years_experience
                .map_or("N/A".to_string(), |y| y.to_string()),
        )
        .replace("{skills}", &candidate.skills.join(", "))
        .replace("{target_roles}", &candidate.target_roles.join(", "))
        .replace("{company}", &job.company)
        .replace("{position}", &job.title)
        .replace("{hiring_manager}", hiring_manager.unwrap_or("Hiring Manager"))
        .replace("{description}", clip(&job.description, 3000))
        .replace("{research}", &research_block(research))
        .replace("{tone}", tone.as_str())
        .replace("{greeting}", style.greeting)
        .replace("{intro_style}", style.intro_style)
        .replace("{body_style}", style.body_style)
        .replace("{closing}", style.closing)
        .replace("{language_level}", style.language_level)
        .replace("{hooks}", &hooks)
        .replace("{keywords}", &keywords.join(", "))
        .replace("{truthfulness}", TRUTHFULNESS_INSTRUCTION)
}
