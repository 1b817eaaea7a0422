//! Job-board scraping: the `JobSource` abstraction, the Indeed implementation,
//! enrichment of raw cards into stored jobs, and the interval scheduler.
//!
//! Scrapers identify themselves with one configured user agent, wait between
//! requests and stop as soon as a page looks like a CAPTCHA or block page.

pub mod enrich;
pub mod handlers;
pub mod indeed;
pub mod pipeline;
pub mod scheduler;
pub mod source;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Blocked by {url}: {reason}")]
    Blocked { url: String, reason: String },

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        AppError::Scrape(err.to_string())
    }
}

/// What to search for on a job board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeQuery {
    pub query: String,
    pub location: String,
}

/// A job card as read from a search page, optionally completed by a details fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedJob {
    pub source: String,
    pub source_job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_text: Option<String>,
    pub snippet: String,
    pub description: Option<String>,
    pub posted_text: Option<String>,
    pub job_type_tag: Option<String>,
    pub remote_tag: bool,
    pub apply_url: String,
}

/// HTTP client shared by outbound page fetches. One fixed user agent, 30 s timeout.
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .build()
}

/// Collapses whitespace in text pulled out of HTML.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Senior\n\t Rust   Engineer \n"), "Senior Rust Engineer");
    }

    #[test]
    fn test_blocked_maps_to_scrape_error() {
        let err: AppError = ScrapeError::Blocked {
            url: "https://www.indeed.com/jobs".to_string(),
            reason: "captcha".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Scrape(msg) if msg.contains("captcha")));
    }
}
