//! Outcome scoring, success-pattern statistics, recommendations and the success
//! predictor. Pure functions over data the service layer loads.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::applications::status::ApplicationStatus;

/// Keywords need this many outcomes before they are ranked.
pub const MIN_KEYWORD_SAMPLES: usize = 3;
const TOP_KEYWORDS: usize = 10;
const TOP_STRATEGIES: usize = 3;
/// Tailored versions at or above this ATS score count as successful.
pub const STRATEGY_SUCCESS_ATS: f64 = 80.0;
const PREDICTION_CAP: f64 = 0.95;
const APPLY_THRESHOLD: f64 = 0.6;
const OPTIMAL_HOURS_UTC: &[u32] = &[9, 10, 11, 14, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    Viewed,
    Rejected,
    PhoneScreen,
    InterviewScheduled,
    InterviewCompleted,
    OfferReceived,
    OfferAccepted,
    OfferDeclined,
}

impl Outcome {
    pub fn score(self) -> f64 {
        match self {
            Outcome::Pending => 0.1,
            Outcome::Viewed => 0.2,
            Outcome::Rejected => 0.0,
            Outcome::PhoneScreen => 0.5,
            Outcome::InterviewScheduled => 0.7,
            Outcome::InterviewCompleted => 0.8,
            Outcome::OfferReceived | Outcome::OfferAccepted => 1.0,
            Outcome::OfferDeclined => 0.9,
        }
    }

    /// Statuses before submission (pending, prepared, failed) carry no outcome.
    pub fn from_status(status: ApplicationStatus) -> Option<Self> {
        match status {
            ApplicationStatus::Applied => Some(Outcome::Pending),
            ApplicationStatus::Reviewing => Some(Outcome::Viewed),
            ApplicationStatus::Interviewed => Some(Outcome::InterviewCompleted),
            ApplicationStatus::Offered => Some(Outcome::OfferReceived),
            ApplicationStatus::Accepted => Some(Outcome::OfferAccepted),
            ApplicationStatus::Rejected => Some(Outcome::Rejected),
            ApplicationStatus::Pending | ApplicationStatus::Prepared | ApplicationStatus::Failed => {
                None
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Success patterns
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPerformance {
    pub keyword: String,
    pub avg_success: f64,
    pub usage_count: usize,
    pub consistency: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation.
fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// `(keywords, outcome score)` per application → the ten keywords with the best
/// `avg_success · consistency`.
pub fn keyword_performance(samples: &[(Vec<String>, f64)]) -> Vec<KeywordPerformance> {
    let mut by_keyword: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (keywords, score) in samples {
        for keyword in keywords {
            let keyword = keyword.trim();
            if !keyword.is_empty() {
                by_keyword.entry(keyword.to_string()).or_default().push(*score);
            }
        }
    }

    let mut ranked: Vec<KeywordPerformance> = by_keyword
        .into_iter()
        .filter(|(_, scores)| scores.len() >= MIN_KEYWORD_SAMPLES)
        .map(|(keyword, scores)| {
            let avg = mean(&scores);
            let consistency = if avg > 0.0 { 1.0 - stdev(&scores) / avg } else { 0.0 };
            KeywordPerformance {
                keyword,
                avg_success: avg,
                usage_count: scores.len(),
                consistency,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        (b.avg_success * b.consistency).total_cmp(&(a.avg_success * a.consistency))
    });
    ranked.truncate(TOP_KEYWORDS);
    ranked
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StrategyStats {
    pub strategy: String,
    pub avg_improvement: f64,
    pub success_rate: f64,
    pub usage_count: i64,
}

pub fn best_strategies(stats: &[StrategyStats]) -> Vec<String> {
    let mut ranked: Vec<&StrategyStats> = stats.iter().collect();
    ranked.sort_by(|a, b| {
        (b.success_rate * b.avg_improvement).total_cmp(&(a.success_rate * a.avg_improvement))
    });
    ranked
        .into_iter()
        .take(TOP_STRATEGIES)
        .map(|s| s.strategy.clone())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutreachStats {
    pub message_type: String,
    pub total_sent: i64,
    pub response_rate: f64,
    pub connection_rate: f64,
}

pub fn effective_outreach(stats: &[OutreachStats]) -> Vec<String> {
    let mut ranked: Vec<&OutreachStats> = stats.iter().collect();
    ranked.sort_by(|a, b| {
        (b.response_rate + b.connection_rate).total_cmp(&(a.response_rate + a.connection_rate))
    });
    ranked.into_iter().map(|s| s.message_type.clone()).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessPatterns {
    pub successful_keywords: Vec<String>,
    pub best_resume_strategies: Vec<String>,
    pub effective_outreach_approaches: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Recommendations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    KeywordOptimization,
    TimingOptimization,
    ResumeStrategy,
    OutreachStrategy,
    JobTargeting,
}

impl OptimizationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationStrategy::KeywordOptimization => "keyword_optimization",
            OptimizationStrategy::TimingOptimization => "timing_optimization",
            OptimizationStrategy::ResumeStrategy => "resume_strategy",
            OptimizationStrategy::OutreachStrategy => "outreach_strategy",
            OptimizationStrategy::JobTargeting => "job_targeting",
        }
    }

    /// Unknown names land on job targeting.
    pub fn parse_or_targeting(value: &str) -> Self {
        match value.trim() {
            "keyword_optimization" => OptimizationStrategy::KeywordOptimization,
            "timing_optimization" => OptimizationStrategy::TimingOptimization,
            "resume_strategy" => OptimizationStrategy::ResumeStrategy,
            "outreach_strategy" => OptimizationStrategy::OutreachStrategy,
            _ => OptimizationStrategy::JobTargeting,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub strategy: OptimizationStrategy,
    pub current_performance: f64,
    pub predicted_improvement: f64,
    pub confidence: f64,
    pub priority: u8,
    pub action_items: Vec<String>,
}

/// Current-performance baselines; `None` when there is no data in the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct Baselines {
    pub avg_outcome: Option<f64>,
    pub avg_ats: Option<f64>,
    pub outreach_response_rate: Option<f64>,
}

pub fn recommendations(patterns: &SuccessPatterns, baselines: Baselines) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if !patterns.successful_keywords.is_empty() {
        let top: Vec<&str> = patterns
            .successful_keywords
            .iter()
            .take(5)
            .map(String::as_str)
            .collect();
        recs.push(Recommendation {
            strategy: OptimizationStrategy::KeywordOptimization,
            current_performance: baselines.avg_outcome.map_or(50.0, |v| v * 100.0),
            predicted_improvement: 15.0,
            confidence: 0.8,
            priority: 1,
            action_items: vec![
                format!("Increase usage of high-performing keywords: {}", top.join(", ")),
                "Update resume templates to include successful keywords".to_string(),
                "Prioritize keyword-rich positions when matching".to_string(),
                "Emphasize effective keywords in cover letters".to_string(),
            ],
        });
    }

    if !patterns.best_resume_strategies.is_empty() {
        let best: Vec<&str> = patterns
            .best_resume_strategies
            .iter()
            .take(2)
            .map(String::as_str)
            .collect();
        recs.push(Recommendation {
            strategy: OptimizationStrategy::ResumeStrategy,
            current_performance: baselines.avg_ats.unwrap_or(75.0),
            predicted_improvement: 12.0,
            confidence: 0.75,
            priority: 2,
            action_items: vec![
                format!("Default to high-performing strategies: {}", best.join(", ")),
                "Weight the genetic optimizer towards successful strategies".to_string(),
                "A/B test strategy combinations".to_string(),
            ],
        });
    }

    if !patterns.effective_outreach_approaches.is_empty() {
        let approaches: Vec<&str> = patterns
            .effective_outreach_approaches
            .iter()
            .take(2)
            .map(String::as_str)
            .collect();
        recs.push(Recommendation {
            strategy: OptimizationStrategy::OutreachStrategy,
            current_performance: baselines.outreach_response_rate.map_or(25.0, |v| v * 100.0),
            predicted_improvement: 20.0,
            confidence: 0.7,
            priority: 3,
            action_items: vec![
                format!("Focus on effective message types: {}", approaches.join(", ")),
                "Adjust outreach timing based on response patterns".to_string(),
                "Personalize messages using successful templates".to_string(),
            ],
        });
    }

    recs
}

/// Lower priority first, then the larger predicted improvement.
pub fn sort_recommendations(recs: &mut [Recommendation]) {
    recs.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.predicted_improvement.total_cmp(&a.predicted_improvement))
    });
}

pub fn key_insights(patterns: &SuccessPatterns, recs: &[Recommendation]) -> Vec<String> {
    let mut insights = Vec::new();
    if !patterns.successful_keywords.is_empty() {
        let top: Vec<&str> = patterns
            .successful_keywords
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        insights.push(format!("Top performing keywords: {}", top.join(", ")));
    }
    if !patterns.best_resume_strategies.is_empty() {
        let top: Vec<&str> = patterns
            .best_resume_strategies
            .iter()
            .take(2)
            .map(String::as_str)
            .collect();
        insights.push(format!("Most effective resume strategies: {}", top.join(", ")));
    }
    let high_impact = recs.iter().filter(|r| r.predicted_improvement >= 15.0).count();
    if high_impact > 0 {
        insights.push(format!(
            "High-impact optimizations available: {high_impact} with 15%+ improvement potential"
        ));
    }
    insights
}

// ────────────────────────────────────────────────────────────────────────────
// Prediction
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub success_probability: f64,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendation: &'static str,
}

pub struct PredictionInput<'a> {
    pub application_count: i64,
    pub job_keywords: &'a [String],
    pub candidate_keywords: &'a [String],
    pub avg_ats: Option<f64>,
    pub hour_utc: u32,
}

fn recommendation_for(probability: f64) -> &'static str {
    if probability > APPLY_THRESHOLD {
        "apply"
    } else {
        "consider_alternatives"
    }
}

pub fn predict(input: &PredictionInput) -> Prediction {
    if input.application_count == 0 {
        return Prediction {
            success_probability: 0.5,
            confidence: 0.3,
            factors: Vec::new(),
            recommendation: recommendation_for(0.5),
        };
    }

    let mut probability = 0.5;
    let mut factors = Vec::new();

    let candidate: HashSet<String> = input
        .candidate_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .collect();
    let job: HashSet<String> = input
        .job_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let overlap = job.intersection(&candidate).count();
    if overlap > 0 {
        probability += (overlap as f64 / job.len() as f64).min(1.0) * 0.2;
        factors.push(format!("Keyword match: {overlap}/{}", job.len()));
    }

    let avg_ats = input.avg_ats.unwrap_or(75.0);
    if avg_ats > 80.0 {
        probability += 0.15;
        factors.push(format!("High ATS performance: {avg_ats:.1}"));
    }

    if OPTIMAL_HOURS_UTC.contains(&input.hour_utc) {
        probability += 0.1;
        factors.push("Optimal application timing".to_string());
    }

    let probability = probability.min(PREDICTION_CAP);
    Prediction {
        success_probability: probability,
        confidence: 0.7,
        factors,
        recommendation: recommendation_for(probability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_outcome_scores_and_status_mapping() {
        assert_eq!(Outcome::OfferDeclined.score(), 0.9);
        assert_eq!(
            Outcome::from_status(ApplicationStatus::Interviewed),
            Some(Outcome::InterviewCompleted)
        );
        assert_eq!(
            Outcome::from_status(ApplicationStatus::Applied),
            Some(Outcome::Pending)
        );
        assert_eq!(Outcome::from_status(ApplicationStatus::Prepared), None);
    }

    #[test]
    fn test_keyword_performance_requires_min_samples() {
        let samples = vec![
            (strings(&["rust", "go"]), 0.8),
            (strings(&["rust", "go"]), 0.8),
            (strings(&["rust"]), 0.8),
        ];
        let ranked = keyword_performance(&samples);
        assert_eq!(ranked.len(), 1, "Expected only rust to qualify, got {}", ranked.len());
        assert_eq!(ranked[0].keyword, "rust");
        assert_eq!(ranked[0].usage_count, 3);
        assert!((ranked[0].consistency - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_consistency_penalizes_spread() {
        let samples = vec![
            (strings(&["steady", "spiky"]), 0.5),
            (strings(&["steady", "spiky"]), 0.5),
            (strings(&["steady"]), 0.5),
            (strings(&["spiky"]), 1.0),
            (strings(&["spiky"]), 0.0),
        ];
        let ranked = keyword_performance(&samples);
        assert_eq!(ranked[0].keyword, "steady");
        let spiky = ranked.iter().find(|k| k.keyword == "spiky").unwrap();
        assert!(spiky.consistency < 1.0);
        assert_eq!(spiky.avg_success, 0.5);
    }

    #[test]
    fn test_keyword_consistency_zero_mean() {
        let samples = vec![(strings(&["cobol"]), 0.0); 3];
        let ranked = keyword_performance(&samples);
        assert_eq!(ranked[0].consistency, 0.0);
    }

    #[test]
    fn test_best_strategies_top_three() {
        let stats: Vec<StrategyStats> = [
            ("keyword_focused", 10.0, 0.5),
            ("job_specific", 8.0, 0.9),
            ("skill_focused", 2.0, 0.1),
            ("experience_focused", 20.0, 0.2),
        ]
        .iter()
        .map(|(s, imp, rate)| StrategyStats {
            strategy: s.to_string(),
            avg_improvement: *imp,
            success_rate: *rate,
            usage_count: 5,
        })
        .collect();
        assert_eq!(
            best_strategies(&stats),
            vec!["job_specific", "keyword_focused", "experience_focused"]
        );
    }

    #[test]
    fn test_effective_outreach_ordering() {
        let stats = vec![
            OutreachStats {
                message_type: "follow_up".to_string(),
                total_sent: 4,
                response_rate: 0.1,
                connection_rate: 0.0,
            },
            OutreachStats {
                message_type: "connection_request".to_string(),
                total_sent: 10,
                response_rate: 0.1,
                connection_rate: 0.3,
            },
        ];
        assert_eq!(effective_outreach(&stats), vec!["connection_request", "follow_up"]);
    }

    #[test]
    fn test_recommendations_baselines_and_order() {
        let patterns = SuccessPatterns {
            successful_keywords: strings(&["rust"]),
            best_resume_strategies: strings(&["job_specific"]),
            effective_outreach_approaches: strings(&["connection_request"]),
        };
        let mut recs = recommendations(&patterns, Baselines::default());
        recs.push(Recommendation {
            strategy: OptimizationStrategy::TimingOptimization,
            current_performance: 0.0,
            predicted_improvement: 30.0,
            confidence: 0.6,
            priority: 1,
            action_items: vec![],
        });
        sort_recommendations(&mut recs);

        let order: Vec<_> = recs.iter().map(|r| r.strategy).collect();
        assert_eq!(
            order,
            vec![
                OptimizationStrategy::TimingOptimization,
                OptimizationStrategy::KeywordOptimization,
                OptimizationStrategy::ResumeStrategy,
                OptimizationStrategy::OutreachStrategy,
            ]
        );
        assert_eq!(recs[1].current_performance, 50.0);
        assert_eq!(recs[2].current_performance, 75.0);
        assert_eq!(recs[3].current_performance, 25.0);
    }

    #[test]
    fn test_recommendations_empty_patterns() {
        assert!(recommendations(&SuccessPatterns::default(), Baselines::default()).is_empty());
    }

    #[test]
    fn test_predict_without_history() {
        let p = predict(&PredictionInput {
            application_count: 0,
            job_keywords: &strings(&["rust"]),
            candidate_keywords: &strings(&["rust"]),
            avg_ats: Some(95.0),
            hour_utc: 10,
        });
        assert_eq!(p.success_probability, 0.5);
        assert_eq!(p.confidence, 0.3);
    }

    #[test]
    fn test_predict_is_capped() {
        let p = predict(&PredictionInput {
            application_count: 4,
            job_keywords: &strings(&["Rust", "SQL"]),
            candidate_keywords: &strings(&["rust", "sql"]),
            avg_ats: Some(90.0),
            hour_utc: 14,
        });
        assert_eq!(p.success_probability, PREDICTION_CAP);
        assert_eq!(p.recommendation, "apply");
        assert_eq!(p.factors.len(), 3);
    }

    #[test]
    fn test_predict_off_hours_low_ats() {
        let p = predict(&PredictionInput {
            application_count: 2,
            job_keywords: &strings(&["go", "k8s", "aws", "terraform"]),
            candidate_keywords: &strings(&["go"]),
            avg_ats: None,
            hour_utc: 22,
        });
        assert!((p.success_probability - 0.55).abs() < 1e-9, "Expected 0.55, got {}", p.success_probability);
        assert_eq!(p.recommendation, "consider_alternatives");
    }
}
