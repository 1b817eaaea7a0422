mod applications;
mod automation;
mod candidates;
mod config;
mod cover_letters;
mod db;
mod errors;
mod feedback;
mod jobs;
mod keywords;
mod limits;
mod llm_client;
mod matching;
mod models;
mod outreach;
mod routes;
mod scraping;
mod state;
mod tailoring;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applications::queue::SubmissionQueue;
use crate::automation::orchestrator::{AutomationOrchestrator, CycleContext};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::matching::similarity::TermFrequencyScorer;
use crate::routes::build_router;
use crate::scraping::indeed::IndeedSource;
use crate::scraping::scheduler::ScrapingScheduler;
use crate::scraping::build_http_client;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobHunter API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let llm = LlmClient::new(config.openrouter_api_key.clone());
    if llm.is_configured() {
        info!("LLM client initialized");
    } else {
        info!("OPENROUTER_API_KEY not set, LLM features fall back to rule-based paths");
    }

    let http = build_http_client(&config.scraper_user_agent)?;
    let scorer = Arc::new(TermFrequencyScorer);

    let source = Arc::new(IndeedSource::new(&config.scraper_user_agent)?);
    let scheduler = ScrapingScheduler::new(
        db.clone(),
        source,
        Duration::from_millis(config.scrape_delay_ms),
    );
    let queue = SubmissionQueue::default();

    let orchestrator = AutomationOrchestrator::new(CycleContext {
        db: db.clone(),
        redis: redis.clone(),
        llm: llm.clone(),
        config: config.clone(),
        http: http.clone(),
        scorer: scorer.clone(),
        scheduler: scheduler.clone(),
        queue: queue.clone(),
    });

    let state = AppState {
        db,
        redis,
        s3,
        llm,
        config: config.clone(),
        http,
        scorer,
        scheduler,
        queue,
        orchestrator,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobhunter-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
