use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use reqwest::Client as HttpClient;
use sqlx::PgPool;

use crate::applications::queue::SubmissionQueue;
use crate::automation::orchestrator::AutomationOrchestrator;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::matching::similarity::SemanticScorer;
use crate::scraping::scheduler::ScrapingScheduler;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Daily quota counters.
    pub redis: RedisClient,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub config: Config,
    /// Outbound client for company research and other page fetches.
    pub http: HttpClient,
    /// Pluggable semantic scorer. Default: TermFrequencyScorer.
    pub scorer: Arc<dyn SemanticScorer>,
    pub scheduler: ScrapingScheduler,
    pub queue: SubmissionQueue,
    pub orchestrator: AutomationOrchestrator,
}
