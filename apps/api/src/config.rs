use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Empty when unset. LLM-backed features then use their deterministic fallbacks.
    pub openrouter_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub scraper_user_agent: String,
    pub scrape_delay_ms: u64,
    pub tracking_base_url: String,
    pub application_email_domain: String,
    pub automation_cycle_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            scraper_user_agent: std::env::var("SCRAPER_USER_AGENT")
                .unwrap_or_else(|_| "JobHunterBot/0.1 (+operator contact)".to_string()),
            scrape_delay_ms: parse_env("SCRAPE_DELAY_MS", 2000)?,
            tracking_base_url: std::env::var("TRACKING_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/track".to_string())
                .trim_end_matches('/')
                .to_string(),
            application_email_domain: std::env::var("APPLICATION_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "jobhunter.local".to_string()),
            automation_cycle_secs: parse_env("AUTOMATION_CYCLE_SECS", 300)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Config used by unit tests that build an `AppState` without touching the environment.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/jobhunter_test".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            s3_bucket: "jobhunter-test".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            openrouter_api_key: String::new(),
            port: 8080,
            rust_log: "debug".to_string(),
            scraper_user_agent: "JobHunterBot/test".to_string(),
            scrape_delay_ms: 0,
            tracking_base_url: "https://track.example.com".to_string(),
            application_email_domain: "apply.example.com".to_string(),
            automation_cycle_secs: 300,
        }
    }
}
