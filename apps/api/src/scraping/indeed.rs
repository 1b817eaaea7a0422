//! Indeed search-results and job-details scraping.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, Url};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::scraping::source::JobSource;
use crate::scraping::{build_http_client, clean_text, ScrapeError, ScrapeQuery, ScrapedJob};

const BASE_URL: &str = "https://www.indeed.com";
const RESULTS_PER_PAGE: u32 = 10;

static SEARCH_URL: Lazy<Url> = Lazy::new(|| Url::parse("https://www.indeed.com/jobs").unwrap());

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("[data-jk]").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="job-title"]"#).unwrap());
static COMPANY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="company-name"]"#).unwrap());
static LOCATION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="job-location"]"#).unwrap());
static SALARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="salary-snippet"]"#).unwrap());
static SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="job-snippet"]"#).unwrap());
static POSTED: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="job-posted-date"]"#).unwrap());
static JOB_TYPE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="job-type-text"]"#).unwrap());
static REMOTE_TAG: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="remote-tag"]"#).unwrap());
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#jobDescriptionText").unwrap());

/// Phrases that only show up on CAPTCHA, bot-check or block pages.
pub const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "recaptcha",
    "hcaptcha",
    "i am not a robot",
    "verify you are human",
    "security check",
    "unusual traffic",
];

pub struct IndeedSource {
    client: Client,
}

impl IndeedSource {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent)?,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("Fetching {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapeError::Blocked {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        if let Some(marker) = block_marker(&body) {
            warn!("Block page detected at {url} ({marker}), stopping");
            return Err(ScrapeError::Blocked {
                url: url.to_string(),
                reason: marker.to_string(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl JobSource for IndeedSource {
    fn name(&self) -> &'static str {
        "indeed"
    }

    async fn search(&self, query: &ScrapeQuery, page: u32) -> Result<Vec<ScrapedJob>, ScrapeError> {
        let url = build_search_url(query, page);
        let html = self.fetch_page(url.as_str()).await?;
        let jobs = parse_search_page(&html);
        info!(
            "Indeed page {} for '{}' in '{}': {} cards",
            page,
            query.query,
            query.location,
            jobs.len()
        );
        Ok(jobs)
    }

    async fn fetch_details(&self, mut job: ScrapedJob) -> Result<ScrapedJob, ScrapeError> {
        let html = self.fetch_page(&job.apply_url).await?;
        job.description = parse_description(&html);
        Ok(job)
    }
}

pub fn build_search_url(query: &ScrapeQuery, page: u32) -> Url {
    let mut url = SEARCH_URL.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("q", &query.query)
            .append_pair("l", &query.location)
            .append_pair("sort", "date")
            .append_pair("radius", "25")
            .append_pair("fromage", "7");
        if page > 0 {
            pairs.append_pair("start", &(page * RESULTS_PER_PAGE).to_string());
        }
    }
    url
}

pub fn view_job_url(job_key: &str) -> String {
    format!("{BASE_URL}/viewjob?jk={job_key}")
}

/// The first block marker found in a page body, if any.
pub fn block_marker(body: &str) -> Option<&'static str> {
    let lower = body.to_lowercase();
    BLOCK_MARKERS.iter().copied().find(|m| lower.contains(m))
}

fn text_of(card: &ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
}

/// Reads job cards (`[data-jk]`) from a search-results page. Cards without a title are skipped.
pub fn parse_search_page(html: &str) -> Vec<ScrapedJob> {
    let document = Html::parse_document(html);

    document
        .select(&CARD)
        .filter_map(|card| {
            let job_key = card.value().attr("data-jk")?.trim().to_string();
            if job_key.is_empty() {
                return None;
            }
            let title = text_of(&card, &TITLE)?;

            Some(ScrapedJob {
                source: "indeed".to_string(),
                apply_url: view_job_url(&job_key),
                source_job_id: job_key,
                title,
                company: text_of(&card, &COMPANY)
                    .unwrap_or_else(|| "Unknown".to_string()),
                location: text_of(&card, &LOCATION).unwrap_or_default(),
                salary_text: text_of(&card, &SALARY),
                snippet: text_of(&card, &SNIPPET).unwrap_or_default(),
                description: None,
                posted_text: text_of(&card, &POSTED),
                job_type_tag: text_of(&card, &JOB_TYPE),
                remote_tag: card.select(&REMOTE_TAG).next().is_some(),
            })
        })
        .collect()
}

/// Full description text from a details page.
pub fn parse_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&DESCRIPTION)
        .next()
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_query() -> ScrapeQuery {
        ScrapeQuery {
            query: "Software Developer".to_string(),
            location: "Remote".to_string(),
        }
    }

    const SEARCH_HTML: &str = r#"
        <html><body>
          <div class="job_seen_beacon" data-jk="abc123">
            <h2><a data-testid="job-title"><span>Senior Rust Engineer</span></a></h2>
            <span data-testid="company-name">Ferrous Co</span>
            <div data-testid="job-location">Remote</div>
            <div data-testid="salary-snippet">$150,000 - $180,000 a year</div>
            <div data-testid="job-snippet"><ul><li>Build   services</li></ul></div>
            <span data-testid="job-posted-date">Posted 3 days ago</span>
            <span data-testid="job-type-text">Full-time</span>
            <span data-testid="remote-tag">Remote</span>
          </div>
          <div data-jk="def456">
            <a data-testid="job-title">Frontend Developer</a>
            <div data-testid="job-location">Austin, TX</div>
          </div>
          <div data-jk="notitle"><span data-testid="company-name">Ghost</span></div>
        </body></html>
    "#;

    #[test]
    fn test_parse_search_page_reads_cards() {
        let jobs = parse_search_page(SEARCH_HTML);
        assert_eq!(jobs.len(), 2, "Expected 2 titled cards, got {}", jobs.len());

        let first = &jobs[0];
        assert_eq!(first.source_job_id, "abc123");
        assert_eq!(first.title, "Senior Rust Engineer");
        assert_eq!(first.company, "Ferrous Co");
        assert_eq!(first.location, "Remote");
        assert_eq!(first.salary_text.as_deref(), Some("$150,000 - $180,000 a year"));
        assert_eq!(first.snippet, "Build services");
        assert_eq!(first.posted_text.as_deref(), Some("Posted 3 days ago"));
        assert_eq!(first.job_type_tag.as_deref(), Some("Full-time"));
        assert!(first.remote_tag);
        assert_eq!(first.apply_url, "https://www.indeed.com/viewjob?jk=abc123");

        let second = &jobs[1];
        assert_eq!(second.company, "Unknown");
        assert!(!second.remote_tag);
        assert!(second.salary_text.is_none());
    }

    #[test]
    fn test_parse_description() {
        let html = r#"<div id="jobDescriptionText"><p>We need Rust.</p><ul><li>5+ years</li></ul></div>"#;
        assert_eq!(
            parse_description(html).as_deref(),
            Some("We need Rust.\n5+ years")
        );
        assert!(parse_description("<html><body>nothing</body></html>").is_none());
    }

    #[test]
    fn test_block_marker_detection() {
        assert_eq!(
            block_marker("<title>Please verify you are human</title>"),
            Some("verify you are human")
        );
        assert_eq!(block_marker("<div class='g-recaptcha'></div>"), Some("captcha"));
        assert!(block_marker(SEARCH_HTML).is_none());
    }

    #[test]
    fn test_build_search_url() {
        let first = build_search_url(&make_query(), 0);
        let query = first.query().unwrap_or_default();
        assert!(first.as_str().starts_with("https://www.indeed.com/jobs?"));
        assert!(query.contains("q=Software+Developer"), "got {query}");
        assert!(query.contains("l=Remote"));
        assert!(query.contains("sort=date"));
        assert!(query.contains("fromage=7"));
        assert!(!query.contains("start="));

        let third = build_search_url(&make_query(), 2);
        assert!(third.query().unwrap_or_default().contains("start=20"));
    }
}
