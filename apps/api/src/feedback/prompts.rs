// LLM prompt for extra optimization ideas on top of the rule-based recommendations.

use serde::Deserialize;

use crate::feedback::analyzer::SuccessPatterns;

const INSIGHTS_PROMPT_TEMPLATE: &str = r#"Analyze these job application success patterns and suggest 2 additional optimizations.

Successful keywords: {keywords}
Best resume strategies: {strategies}
Effective outreach: {outreach}

Each suggestion must be specific and actionable.
Use one of these strategy names: timing_optimization, keyword_optimization, resume_strategy, outreach_strategy, job_targeting.

Return JSON:
{
  "recommendations": [
    {
      "strategy": "timing_optimization",
      "predicted_improvement": 10.0,
      "confidence": 0.8,
      "action_items": ["specific action 1", "specific action 2"]
    }
  ]
}"#;

#[derive(Debug, Default, Deserialize)]
pub struct AiInsights {
    #[serde(default)]
    pub recommendations: Vec<AiRecommendation>,
}

#[derive(Debug, Deserialize)]
pub struct AiRecommendation {
    #[serde(default)]
    pub strategy: String,
    #[serde(default = "default_improvement")]
    pub predicted_improvement: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub action_items: Vec<String>,
}

fn default_improvement() -> f64 {
    5.0
}

fn default_confidence() -> f64 {
    0.6
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "none yet".to_string()
    } else {
        items.join(", ")
    }
}

pub fn build_insights_prompt(patterns: &SuccessPatterns) -> String {
    INSIGHTS_PROMPT_TEMPLATE
        .replace("{keywords}", &list(&patterns.successful_keywords))
        .replace("{strategies}", &list(&patterns.best_resume_strategies))
        .replace("{outreach}", &list(&patterns.effective_outreach_approaches))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insights_defaults() {
        let parsed: AiInsights =
            serde_json::from_str(r#"{"recommendations":[{"strategy":"timing_optimization"}]}"#)
                .unwrap();
        assert_eq!(parsed.recommendations[0].predicted_improvement, 5.0);
        assert_eq!(parsed.recommendations[0].confidence, 0.6);
    }

    #[test]
    fn test_prompt_lists_patterns() {
        let prompt = build_insights_prompt(&SuccessPatterns {
            successful_keywords: vec!["rust".to_string(), "sql".to_string()],
            ..Default::default()
        });
        assert!(prompt.contains("Successful keywords: rust, sql"));
        assert!(prompt.contains("Best resume strategies: none yet"));
    }
}
