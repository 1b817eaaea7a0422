// LLM prompts for resume tailoring.

use crate::llm_client::prompts::{clip, TRUTHFULNESS_INSTRUCTION};
use crate::tailoring::service::{OptimizationLevel, TailoringStrategy};

pub const TAILOR_SYSTEM: &str = "You are an expert resume writer and ATS optimization \
    specialist. Reply with the complete resume text only, no commentary and no markdown.";

const TAILOR_PROMPT_TEMPLATE: &str = r#"Tailor the following resume for a specific job opportunity.

ORIGINAL RESUME:
{resume}

JOB DESCRIPTION:
{job_description}

TARGET KEYWORDS (use only those the resume can truthfully support):
{keywords}

TAILORING STRATEGY: {strategy}

OPTIMIZATION LEVEL: {level}

INSTRUCTIONS:
1. Match the job requirements while keeping the candidate's real history
2. Work target keywords in naturally where the experience supports them
3. Keep the content ATS-friendly and human-readable
4. Keep the overall structure and section order recognisable
5. {truthfulness}

Return the optimized resume text:"#;

const VARIANT_PROMPT_TEMPLATE: &str = r#"Create a professionally optimized version of this resume.

RESUME:
{resume}

{job_block}Focus on:
- {strategy}
- ATS-friendly formatting with clear section headers
- Strong action verbs and quantified achievements already present in the resume

{truthfulness}

Return the resume text only:"#;

pub fn strategy_instruction(strategy: TailoringStrategy) -> &'static str {
    match strategy {
        TailoringStrategy::JobSpecific => {
            "Focus on matching the specific job requirements and responsibilities."
        }
        TailoringStrategy::CompanySpecific => "Emphasize alignment with company culture and values.",
        TailoringStrategy::RoleSpecific => {
            "Highlight experience and skills relevant to the role level."
        }
        TailoringStrategy::IndustrySpecific => {
            "Emphasize industry-relevant experience and knowledge."
        }
        TailoringStrategy::SkillFocused => "Prioritize technical skills and competencies.",
        TailoringStrategy::ExperienceFocused => {
            "Emphasize relevant work experience and achievements."
        }
    }
}

pub fn level_instruction(level: OptimizationLevel) -> &'static str {
    match level {
        OptimizationLevel::Basic => {
            "Apply basic keyword optimization and formatting improvements."
        }
        OptimizationLevel::Advanced => {
            "Apply strategic keyword placement, section enhancement and light restructuring."
        }
        OptimizationLevel::Aggressive => {
            "Maximize keyword coverage and restructure freely, without adding unsupported claims."
        }
    }
}

pub fn build_tailor_prompt(
    resume: &str,
    job_description: &str,
    keywords: &[String],
    strategy: TailoringStrategy,
    level: OptimizationLevel,
) -> String {
    TAILOR_PROMPT_TEMPLATE
        .replace("{resume}", clip(resume, 6000))
        .replace("{job_description}", clip(job_description, 3000))
        .replace("{keywords}", &keywords.join(", "))
        .replace("{strategy}", strategy_instruction(strategy))
        .replace("{level}", level_instruction(level))
        .replace("{truthfulness}", TRUTHFULNESS_INSTRUCTION)
}

pub fn build_variant_prompt(
    resume: &str,
    job_description: Option<&str>,
    strategy: TailoringStrategy,
) -> String {
    let job_block = job_description
        .map(|jd| format!("TARGET JOB:\n{}\n\n", clip(jd, 2000)))
        .unwrap_or_default();

    VARIANT_PROMPT_TEMPLATE
        .replace("{resume}", clip(resume, 6000))
        .replace("{job_block}", &job_block)
        .replace("{strategy}", strategy_instruction(strategy))
        .replace("{truthfulness}", TRUTHFULNESS_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tailor_prompt_fills_every_placeholder() {
        let prompt = build_tailor_prompt(
            "Jane Doe\nSKILLS\nRust",
            "Rust engineer",
            &["rust".to_string(), "kubernetes".to_string()],
            TailoringStrategy::SkillFocused,
            OptimizationLevel::Basic,
        );
        for placeholder in ["{resume}", "{job_description}", "{keywords}", "{strategy}", "{level}"] {
            assert!(!prompt.contains(placeholder), "Expected {placeholder} to be filled");
        }
        assert!(prompt.contains("rust, kubernetes"));
        assert!(prompt.contains("Prioritize technical skills"));
        assert!(prompt.contains("truthful"));
    }

    #[test]
    fn test_variant_prompt_without_job() {
        let prompt = build_variant_prompt("Jane Doe", None, TailoringStrategy::ExperienceFocused);
        assert!(!prompt.contains("TARGET JOB"));
        assert!(!prompt.contains("{job_block}"));
        assert!(prompt.contains("work experience"));
    }
}
