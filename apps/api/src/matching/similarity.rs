//! Semantic similarity: a pluggable scorer comparing a candidate profile with
//! a job posting.
//!
//! Default: `TermFrequencyScorer` (cosine over term-frequency vectors, deterministic).
//! `AppState` holds an `Arc<dyn SemanticScorer>` so an embedding backend can replace it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::keywords::tokenize;

#[async_trait]
pub trait SemanticScorer: Send + Sync {
    /// Short backend name, reported alongside scores.
    fn name(&self) -> &'static str;

    /// Similarity in [0, 1].
    async fn similarity(&self, candidate_text: &str, job_text: &str) -> Result<f64, AppError>;
}

pub struct TermFrequencyScorer;

#[async_trait]
impl SemanticScorer for TermFrequencyScorer {
    fn name(&self) -> &'static str {
        "term_frequency"
    }

    async fn similarity(&self, candidate_text: &str, job_text: &str) -> Result<f64, AppError> {
        Ok(cosine_similarity(
            &term_frequencies(candidate_text),
            &term_frequencies(job_text),
        ))
    }
}

pub fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

pub fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(term, weight)| b.get(term).map(|other| weight * other))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identical_text_scores_one() {
        let score = TermFrequencyScorer
            .similarity("Rust engineer building APIs", "rust ENGINEER building apis")
            .await
            .unwrap();
        assert!((score - 1.0).abs() < 1e-9, "Expected 1.0, got {score}");
    }

    #[tokio::test]
    async fn test_disjoint_and_empty_text_scores_zero() {
        let scorer = TermFrequencyScorer;
        assert_eq!(scorer.similarity("rust tokio", "python django").await.unwrap(), 0.0);
        assert_eq!(scorer.similarity("", "python").await.unwrap(), 0.0);
        // stop words alone produce an empty vector
        assert_eq!(scorer.similarity("the and of", "the and of").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_partial_overlap_is_between_zero_and_one() {
        let score = TermFrequencyScorer
            .similarity("rust postgres kafka", "rust postgres react")
            .await
            .unwrap();
        assert!(score > 0.5 && score < 1.0, "got {score}");
    }
}
