//! Performance analysis over the last 30 days, stored reports and the optimization
//! settings other modules read back.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::applications::status::ApplicationStatus;
use crate::candidates::fetch_candidate;
use crate::errors::AppError;
use crate::feedback::analyzer::{
    best_strategies, effective_outreach, key_insights, keyword_performance, predict,
    recommendations, sort_recommendations, Baselines, KeywordPerformance, OptimizationStrategy,
    Outcome, OutreachStats, Prediction, PredictionInput, Recommendation, StrategyStats,
    SuccessPatterns,
};
use crate::feedback::prompts::{build_insights_prompt, AiInsights};
use crate::jobs::fetch_job;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError, LlmTask};
use crate::models::feedback::PerformanceReportRow;

pub const ANALYSIS_WINDOW_DAYS: i64 = 30;
const APPLY_TOP: usize = 3;
const APPLY_MIN_CONFIDENCE: f64 = 0.7;
const AI_PRIORITY: u8 = 4;

// ────────────────────────────────────────────────────────────────────────────
// Report types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct ApplicationSummary {
    pub total_applications: i64,
    pub responses: i64,
    pub interviews: i64,
    pub offers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceData {
    pub application_success_rate: f64,
    pub response_rate: f64,
    pub interview_rate: f64,
    pub offer_rate: f64,
    pub total_applications: i64,
    pub keyword_performance: Vec<KeywordPerformance>,
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

impl PerformanceData {
    /// `avg_outcome` is the mean outcome score of submitted applications.
    pub fn new(
        summary: &ApplicationSummary,
        avg_outcome: Option<f64>,
        keyword_performance: Vec<KeywordPerformance>,
    ) -> Self {
        Self {
            application_success_rate: avg_outcome.map_or(0.0, |v| v * 100.0),
            response_rate: percent(summary.responses, summary.total_applications),
            interview_rate: percent(summary.interviews, summary.total_applications),
            offer_rate: percent(summary.offers, summary.total_applications),
            total_applications: summary.total_applications,
            keyword_performance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub analysis_period: AnalysisPeriod,
    pub performance_data: PerformanceData,
    pub patterns: SuccessPatterns,
    pub tailoring: Vec<StrategyStats>,
    pub outreach: Vec<OutreachStats>,
    pub recommendations: Vec<Recommendation>,
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub optimizations_applied: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Collection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct OutcomeSample {
    status: String,
    skills: Vec<String>,
}

fn outcome_samples(rows: Vec<OutcomeSample>) -> Vec<(Vec<String>, f64)> {
    rows.into_iter()
        .filter_map(|row| {
            let outcome = ApplicationStatus::parse(&row.status).and_then(Outcome::from_status)?;
            Some((row.skills, outcome.score()))
        })
        .collect()
}

async fn ai_recommendations(llm: &LlmClient, patterns: &SuccessPatterns) -> Vec<Recommendation> {
    let prompt = build_insights_prompt(patterns);
    let insights = match llm
        .call_json::<AiInsights>(&prompt, JSON_ONLY_SYSTEM, LlmTask::Insights)
        .await
    {
        Ok(insights) => insights,
        Err(LlmError::NotConfigured) => return Vec::new(),
        Err(e) => {
            warn!("AI insights failed: {e}");
            return Vec::new();
        }
    };

    insights
        .recommendations
        .into_iter()
        .map(|rec| Recommendation {
            strategy: OptimizationStrategy::parse_or_targeting(&rec.strategy),
            current_performance: 0.0,
            predicted_improvement: rec.predicted_improvement,
            confidence: rec.confidence.clamp(0.0, 1.0),
            priority: AI_PRIORITY,
            action_items: rec.action_items,
        })
        .collect()
}

/// Collects outcomes, derives patterns and recommendations, and stores the report.
pub async fn analyze_performance(db: &PgPool, llm: &LlmClient) -> Result<PerformanceReport, AppError> {
    let end_date = Utc::now();
    let start_date = end_date - Duration::days(ANALYSIS_WINDOW_DAYS);

    let samples = outcome_samples(
        sqlx::query_as::<_, OutcomeSample>(
            r#"
            SELECT a.status, j.skills
            FROM applications a
            JOIN jobs_raw j ON j.id = a.job_id
            WHERE a.created_at >= $1
            "#,
        )
        .bind(start_date)
        .fetch_all(db)
        .await?,
    );

    let summary = sqlx::query_as::<_, ApplicationSummary>(
        r#"
        SELECT
            COUNT(*)                                                              AS total_applications,
            COUNT(*) FILTER (WHERE response_at IS NOT NULL)                       AS responses,
            COUNT(*) FILTER (WHERE status IN ('interviewed','offered','accepted')) AS interviews,
            COUNT(*) FILTER (WHERE status IN ('offered','accepted'))              AS offers
        FROM applications
        WHERE created_at >= $1
          AND status NOT IN ('pending','prepared','failed')
        "#,
    )
    .bind(start_date)
    .fetch_one(db)
    .await?;

    let tailoring = sqlx::query_as::<_, StrategyStats>(
        r#"
        SELECT
            strategy,
            AVG(ats_improvement)::float8                                   AS avg_improvement,
            AVG(CASE WHEN ats_score >= $2 THEN 1.0 ELSE 0.0 END)::float8   AS success_rate,
            COUNT(*)                                                       AS usage_count
        FROM resume_versions
        WHERE created_at >= $1
        GROUP BY strategy
        "#,
    )
    .bind(start_date)
    .bind(crate::feedback::analyzer::STRATEGY_SUCCESS_ATS)
    .fetch_all(db)
    .await?;

    let outreach = sqlx::query_as::<_, OutreachStats>(
        r#"
        SELECT
            message_type,
            COUNT(*)                                                          AS total_sent,
            AVG(CASE WHEN status = 'replied' THEN 1.0 ELSE 0.0 END)::float8   AS response_rate,
            AVG(CASE WHEN status = 'connected' THEN 1.0 ELSE 0.0 END)::float8 AS connection_rate
        FROM outreach_messages
        WHERE created_at >= $1 AND status <> 'drafted'
        GROUP BY message_type
        "#,
    )
    .bind(start_date)
    .fetch_all(db)
    .await?;

    let avg_ats: Option<f64> =
        sqlx::query_scalar("SELECT AVG(ats_score)::float8 FROM resume_versions WHERE created_at >= $1")
            .bind(start_date)
            .fetch_one(db)
            .await?;

    let avg_outcome = (!samples.is_empty())
        .then(|| samples.iter().map(|(_, score)| score).sum::<f64>() / samples.len() as f64);
    let outreach_response_rate = {
        let sent: i64 = outreach.iter().map(|o| o.total_sent).sum();
        (sent > 0).then(|| {
            outreach
                .iter()
                .map(|o| o.response_rate * o.total_sent as f64)
                .sum::<f64>()
                / sent as f64
        })
    };

    let keywords = keyword_performance(&samples);
    let patterns = SuccessPatterns {
        successful_keywords: keywords.iter().map(|k| k.keyword.clone()).collect(),
        best_resume_strategies: best_strategies(&tailoring),
        effective_outreach_approaches: effective_outreach(&outreach),
    };

    let mut recs = recommendations(
        &patterns,
        Baselines {
            avg_outcome,
            avg_ats,
            outreach_response_rate,
        },
    );
    recs.extend(ai_recommendations(llm, &patterns).await);
    sort_recommendations(&mut recs);

    let report = PerformanceReport {
        report_id: Uuid::new_v4(),
        generated_at: end_date,
        analysis_period: AnalysisPeriod {
            start_date,
            end_date,
        },
        performance_data: PerformanceData::new(&summary, avg_outcome, keywords),
        key_insights: key_insights(&patterns, &recs),
        patterns,
        tailoring,
        outreach,
        recommendations: recs,
        optimizations_applied: Vec::new(),
    };

    sqlx::query("INSERT INTO performance_reports (id, report, generated_at) VALUES ($1, $2, $3)")
        .bind(report.report_id)
        .bind(serde_json::to_value(&report).map_err(anyhow::Error::from)?)
        .bind(report.generated_at)
        .execute(db)
        .await?;

    info!(
        "Performance analysis {}: {} applications, {} recommendations",
        report.report_id,
        report.performance_data.total_applications,
        report.recommendations.len()
    );
    Ok(report)
}

fn parse_report(row: &PerformanceReportRow) -> Option<PerformanceReport> {
    match serde_json::from_value(row.report.clone()) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Skipping unreadable performance report {}: {e}", row.id);
            None
        }
    }
}

pub async fn latest_report(db: &PgPool) -> Result<Option<PerformanceReport>, AppError> {
    let row = sqlx::query_as::<_, PerformanceReportRow>(
        "SELECT * FROM performance_reports ORDER BY generated_at DESC LIMIT 1",
    )
    .fetch_optional(db)
    .await?;
    Ok(row.as_ref().and_then(parse_report))
}

async fn latest_or_fresh(db: &PgPool, llm: &LlmClient) -> Result<PerformanceReport, AppError> {
    match latest_report(db).await? {
        Some(report) => Ok(report),
        None => analyze_performance(db, llm).await,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Optimizations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AppliedOptimizations {
    pub report_id: Uuid,
    pub count: usize,
    pub strategies: Vec<String>,
}

/// Settings row written for one recommendation.
pub fn optimization_settings(rec: &Recommendation, patterns: &SuccessPatterns) -> Value {
    let mut settings = json!({
        "predicted_improvement": rec.predicted_improvement,
        "confidence": rec.confidence,
        "action_items": rec.action_items,
    });
    let extra = match rec.strategy {
        OptimizationStrategy::KeywordOptimization => {
            Some(("preferred_keywords", json!(patterns.successful_keywords)))
        }
        OptimizationStrategy::ResumeStrategy => {
            Some(("strategies", json!(patterns.best_resume_strategies)))
        }
        OptimizationStrategy::OutreachStrategy => Some((
            "preferred_message_types",
            json!(patterns.effective_outreach_approaches),
        )),
        OptimizationStrategy::TimingOptimization | OptimizationStrategy::JobTargeting => None,
    };
    if let (Some((key, value)), Some(map)) = (extra, settings.as_object_mut()) {
        map.insert(key.to_string(), value);
    }
    settings
}

/// The top recommendations with confidence ≥ 0.7 from the latest report, one per
/// strategy.
pub fn selected_for_apply(recs: &[Recommendation]) -> Vec<&Recommendation> {
    let mut seen = Vec::new();
    recs.iter()
        .take(APPLY_TOP)
        .filter(|r| r.confidence >= APPLY_MIN_CONFIDENCE)
        .filter(|r| {
            if seen.contains(&r.strategy) {
                false
            } else {
                seen.push(r.strategy);
                true
            }
        })
        .collect()
}

pub async fn apply_optimizations(
    db: &PgPool,
    llm: &LlmClient,
) -> Result<AppliedOptimizations, AppError> {
    let mut report = latest_or_fresh(db, llm).await?;

    let mut strategies = Vec::new();
    for rec in selected_for_apply(&report.recommendations) {
        sqlx::query(
            r#"
            INSERT INTO optimization_settings (strategy, settings, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (strategy) DO UPDATE SET settings = EXCLUDED.settings, updated_at = NOW()
            "#,
        )
        .bind(rec.strategy.as_str())
        .bind(optimization_settings(rec, &report.patterns))
        .execute(db)
        .await?;
        strategies.push(rec.strategy.as_str().to_string());
    }

    report.optimizations_applied = strategies.clone();
    sqlx::query("UPDATE performance_reports SET report = $2 WHERE id = $1")
        .bind(report.report_id)
        .bind(serde_json::to_value(&report).map_err(anyhow::Error::from)?)
        .execute(db)
        .await?;

    info!("Applied {} optimizations: {:?}", strategies.len(), strategies);
    Ok(AppliedOptimizations {
        report_id: report.report_id,
        count: strategies.len(),
        strategies,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Patterns, trends and prediction
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SuccessPatternsView {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub patterns: SuccessPatterns,
    pub keyword_performance: Vec<KeywordPerformance>,
    pub key_insights: Vec<String>,
}

pub async fn success_patterns(db: &PgPool, llm: &LlmClient) -> Result<SuccessPatternsView, AppError> {
    let report = latest_or_fresh(db, llm).await?;
    Ok(SuccessPatternsView {
        report_id: report.report_id,
        generated_at: report.generated_at,
        patterns: report.patterns,
        keyword_performance: report.performance_data.keyword_performance,
        key_insights: report.key_insights,
    })
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_applications: i64,
    pub optimization_count: usize,
}

pub async fn performance_trends(db: &PgPool, days: i64) -> Result<Vec<TrendPoint>, AppError> {
    let since = Utc::now() - Duration::days(days.clamp(1, 365));
    let rows = sqlx::query_as::<_, PerformanceReportRow>(
        "SELECT * FROM performance_reports WHERE generated_at >= $1 ORDER BY generated_at",
    )
    .bind(since)
    .fetch_all(db)
    .await?;

    Ok(rows
        .iter()
        .filter_map(parse_report)
        .map(|report| TrendPoint {
            date: report.generated_at.date_naive(),
            total_applications: report.performance_data.total_applications,
            optimization_count: report.optimizations_applied.len(),
        })
        .collect())
}

pub async fn predict_success(
    db: &PgPool,
    candidate_id: Uuid,
    job_id: Uuid,
) -> Result<Prediction, AppError> {
    let candidate = fetch_candidate(db, candidate_id).await?;
    let job = fetch_job(db, job_id).await?;

    let application_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE candidate_id = $1")
            .bind(candidate_id)
            .fetch_one(db)
            .await?;
    let avg_ats: Option<f64> =
        sqlx::query_scalar("SELECT AVG(ats_score)::float8 FROM resume_versions WHERE candidate_id = $1")
            .bind(candidate_id)
            .fetch_one(db)
            .await?;

    Ok(predict(&PredictionInput {
        application_count,
        job_keywords: &job.skills,
        candidate_keywords: &candidate.skills,
        avg_ats,
        hour_utc: Utc::now().hour(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rec(strategy: OptimizationStrategy, confidence: f64, priority: u8) -> Recommendation {
        Recommendation {
            strategy,
            current_performance: 0.0,
            predicted_improvement: 10.0,
            confidence,
            priority,
            action_items: vec!["do it".to_string()],
        }
    }

    #[test]
    fn test_performance_data_rates() {
        let summary = ApplicationSummary {
            total_applications: 20,
            responses: 5,
            interviews: 4,
            offers: 1,
        };
        let data = PerformanceData::new(&summary, Some(0.25), Vec::new());
        assert_eq!(data.application_success_rate, 25.0);
        assert_eq!(data.response_rate, 25.0);
        assert_eq!(data.interview_rate, 20.0);
        assert_eq!(data.offer_rate, 5.0);

        let empty = PerformanceData::new(&ApplicationSummary::default(), None, Vec::new());
        assert_eq!(empty.response_rate, 0.0);
        assert_eq!(empty.application_success_rate, 0.0);
    }

    #[test]
    fn test_outcome_samples_skip_unsubmitted() {
        let rows = vec![
            OutcomeSample {
                status: "offered".to_string(),
                skills: vec!["rust".to_string()],
            },
            OutcomeSample {
                status: "prepared".to_string(),
                skills: vec!["go".to_string()],
            },
        ];
        let samples = outcome_samples(rows);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].1, 1.0);
    }

    #[test]
    fn test_selected_for_apply_top_three_confident() {
        let recs = vec![
            make_rec(OptimizationStrategy::KeywordOptimization, 0.8, 1),
            make_rec(OptimizationStrategy::ResumeStrategy, 0.6, 2),
            make_rec(OptimizationStrategy::OutreachStrategy, 0.7, 3),
            make_rec(OptimizationStrategy::JobTargeting, 0.9, 4),
        ];
        let chosen: Vec<_> = selected_for_apply(&recs).iter().map(|r| r.strategy).collect();
        assert_eq!(
            chosen,
            vec![
                OptimizationStrategy::KeywordOptimization,
                OptimizationStrategy::OutreachStrategy
            ]
        );
    }

    #[test]
    fn test_resume_strategy_settings_list_strategies() {
        let patterns = SuccessPatterns {
            best_resume_strategies: vec!["keyword_focused".to_string()],
            ..Default::default()
        };
        let settings =
            optimization_settings(&make_rec(OptimizationStrategy::ResumeStrategy, 0.75, 2), &patterns);
        assert_eq!(settings["strategies"], json!(["keyword_focused"]));
        assert_eq!(settings["confidence"], json!(0.75));

        let timing = optimization_settings(
            &make_rec(OptimizationStrategy::TimingOptimization, 0.8, 4),
            &patterns,
        );
        assert!(timing.get("strategies").is_none());
    }

    #[test]
    fn test_report_roundtrips_without_applied_list() {
        let mut value = serde_json::to_value(PerformanceReport {
            report_id: Uuid::nil(),
            generated_at: Utc::now(),
            analysis_period: AnalysisPeriod {
                start_date: Utc::now(),
                end_date: Utc::now(),
            },
            performance_data: PerformanceData::new(&ApplicationSummary::default(), None, Vec::new()),
            patterns: SuccessPatterns::default(),
            tailoring: Vec::new(),
            outreach: Vec::new(),
            recommendations: Vec::new(),
            key_insights: Vec::new(),
            optimizations_applied: vec!["resume_strategy".to_string()],
        })
        .unwrap();
        value.as_object_mut().unwrap().remove("optimizations_applied");
        let report: PerformanceReport = serde_json::from_value(value).unwrap();
        assert!(report.optimizations_applied.is_empty());
    }
}
