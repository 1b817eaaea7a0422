//! Cover letter performance and overview statistics.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::LabelCount;

#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct UsageCounts {
    pub applications: i64,
    pub responses: i64,
    pub interviews: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LetterPerformance {
    pub cover_letter_id: Uuid,
    pub applications_count: i64,
    pub responses: i64,
    pub interviews: i64,
    pub response_rate: f64,
    pub interview_rate: f64,
    pub success_score: f64,
}

impl LetterPerformance {
    /// Rates are percentages; success weighs a response half as much as an interview.
    pub fn from_counts(cover_letter_id: Uuid, counts: UsageCounts) -> Self {
        let n = counts.applications;
        let pct = |x: f64| if n > 0 { x / n as f64 * 100.0 } else { 0.0 };
        Self {
            cover_letter_id,
            applications_count: n,
            responses: counts.responses,
            interviews: counts.interviews,
            response_rate: pct(counts.responses as f64),
            interview_rate: pct(counts.interviews as f64),
            success_score: pct(counts.responses as f64 * 0.5 + counts.interviews as f64),
        }
    }
}

pub async fn letter_performance(
    db: &PgPool,
    cover_letter_id: Uuid,
) -> Result<LetterPerformance, AppError> {
    let counts = sqlx::query_as::<_, UsageCounts>(
        r#"
        SELECT
            COUNT(*)                                                            AS applications,
            COUNT(*) FILTER (WHERE response_at IS NOT NULL)                     AS responses,
            COUNT(*) FILTER (WHERE status IN ('interviewed','offered','accepted')) AS interviews
        FROM applications
        WHERE cover_letter_id = $1
        "#,
    )
    .bind(cover_letter_id)
    .fetch_one(db)
    .await?;
    Ok(LetterPerformance::from_counts(cover_letter_id, counts))
}

#[derive(Debug, Serialize, FromRow)]
pub struct LetterTotals {
    pub total_cover_letters: i64,
    pub average_word_count: f64,
    pub total_usage: i64,
}

#[derive(Debug, Serialize)]
pub struct LetterStats {
    #[serde(flatten)]
    pub totals: LetterTotals,
    pub by_tone: Vec<LabelCount>,
    pub by_generation_method: Vec<LabelCount>,
}

pub async fn letter_stats(db: &PgPool) -> Result<LetterStats, AppError> {
    let totals = sqlx::query_as::<_, LetterTotals>(
        r#"
        SELECT
            COUNT(*)                                                  AS total_cover_letters,
            COALESCE(ROUND(AVG(word_count)::numeric, 2), 0)::float8   AS average_word_count,
            COALESCE(SUM(used_count), 0)::int8                        AS total_usage
        FROM cover_letters
        "#,
    )
    .fetch_one(db)
    .await?;

    let by_tone = sqlx::query_as::<_, LabelCount>(
        "SELECT tone AS label, COUNT(*) AS count FROM cover_letters GROUP BY tone ORDER BY count DESC",
    )
    .fetch_all(db)
    .await?;

    let by_generation_method = sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT generation_method AS label, COUNT(*) AS count
        FROM cover_letters
        GROUP BY generation_method
        ORDER BY count DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(LetterStats {
        totals,
        by_tone,
        by_generation_method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_rates() {
        let perf = LetterPerformance::from_counts(
            Uuid::nil(),
            UsageCounts {
                applications: 4,
                responses: 2,
                interviews: 1,
            },
        );
        assert_eq!(perf.response_rate, 50.0);
        assert_eq!(perf.interview_rate, 25.0);
        // (2 * 0.5 + 1) / 4 * 100
        assert_eq!(perf.success_score, 50.0);
    }

    #[test]
    fn test_performance_without_applications() {
        let perf = LetterPerformance::from_counts(Uuid::nil(), UsageCounts::default());
        assert_eq!(perf.success_score, 0.0);
        assert_eq!(perf.response_rate, 0.0);
    }
}
