//! Lightweight company research from the company's own website.
//!
//! Fetches the home and about pages with the scraper client and pulls out an about blurb,
//! a mission statement, tech-stack mentions and culture words. Research is best effort:
//! any failure leaves the corresponding fields empty.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::keywords::mentions_skill;
use crate::scraping::clean_text;

static CLASSED_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[class], section[class], p[class]").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static ABOUT_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)about|mission|vision").unwrap());
static MISSION_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(mission|vision|values)\b").unwrap());

const ABOUT_MIN_CHARS: usize = 100;
const ABOUT_MAX_CHARS: usize = 500;
const MISSION_MIN_CHARS: usize = 50;
const MISSION_MAX_CHARS: usize = 300;

const TECH_TERMS: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "react",
    "node.js",
    "aws",
    "docker",
    "kubernetes",
    "postgresql",
    "rust",
    "golang",
    "java",
];

const CULTURE_TERMS: &[&str] = &[
    "innovative",
    "collaborative",
    "fast-paced",
    "inclusive",
    "diverse",
    "remote-first",
    "transparent",
    "mission-driven",
    "customer-obsessed",
    "flexible",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyResearch {
    pub domain: Option<String>,
    pub about: String,
    pub mission: String,
    pub tech_stack: Vec<String>,
    pub culture_keywords: Vec<String>,
    pub sources: Vec<String>,
}

impl CompanyResearch {
    pub fn is_empty(&self) -> bool {
        self.about.is_empty()
            && self.mission.is_empty()
            && self.tech_stack.is_empty()
            && self.culture_keywords.is_empty()
    }

    fn merge(&mut self, page: PageFindings) {
        if self.about.is_empty() {
            self.about = page.about;
        }
        if self.mission.is_empty() {
            self.mission = page.mission;
        }
        for tech in page.tech_stack {
            if !self.tech_stack.contains(&tech) {
                self.tech_stack.push(tech);
            }
        }
        for word in page.culture_keywords {
            if !self.culture_keywords.contains(&word) {
                self.culture_keywords.push(word);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct PageFindings {
    pub about: String,
    pub mission: String,
    pub tech_stack: Vec<String>,
    pub culture_keywords: Vec<String>,
}

fn cut(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// `example.com` from `https://example.com/`, or `None` when nothing usable remains.
pub fn normalise_domain(domain: &str) -> Option<String> {
    let domain = domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    let valid = !domain.is_empty()
        && domain.contains('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    valid.then(|| domain.to_lowercase())
}

/// Terms from a fixed list found in `text`, list order.
pub fn find_terms(text: &str, terms: &[&str]) -> Vec<String> {
    let lower = text.to_lowercase();
    terms
        .iter()
        .filter(|t| mentions_skill(&lower, t))
        .map(|t| t.to_string())
        .collect()
}

pub fn culture_keywords(text: &str) -> Vec<String> {
    find_terms(text, CULTURE_TERMS)
}

pub fn parse_company_page(html: &str) -> PageFindings {
    let document = Html::parse_document(html);

    let about = document
        .select(&CLASSED_BLOCK)
        .filter(|el| {
            el.value()
                .attr("class")
                .is_some_and(|class| ABOUT_CLASS_RE.is_match(class))
        })
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .find(|text| text.chars().count() > ABOUT_MIN_CHARS)
        .map(|text| cut(&text, ABOUT_MAX_CHARS))
        .unwrap_or_default();

    let mission = document
        .select(&PARAGRAPH)
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .find(|text| MISSION_TEXT_RE.is_match(text) && text.chars().count() > MISSION_MIN_CHARS)
        .map(|text| cut(&text, MISSION_MAX_CHARS))
        .unwrap_or_default();

    let page_text = document
        .select(&BODY)
        .next()
        .map(|body| clean_text(&body.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    PageFindings {
        about,
        mission,
        tech_stack: find_terms(&page_text, TECH_TERMS),
        culture_keywords: culture_keywords(&page_text),
    }
}

/// Researches a company from `https://{domain}` and `https://{domain}/about`.
pub async fn research_company(client: &Client, domain: &str) -> CompanyResearch {
    let Some(domain) = normalise_domain(domain) else {
        debug!("Skipping company research for invalid domain '{domain}'");
        return CompanyResearch::default();
    };

    let mut research = CompanyResearch {
        domain: Some(domain.clone()),
        ..Default::default()
    };

    for url in [format!("https://{domain}"), format!("https://{domain}/about")] {
        let body = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response.text().await,
            Ok(response) => {
                debug!("Company research: {url} returned {}", response.status());
                continue;
            }
            Err(e) => {
                debug!("Company research: {url} failed: {e}");
                continue;
            }
        };
        match body {
            Ok(html) => {
                research.merge(parse_company_page(&html));
                research.sources.push(url);
            }
            Err(e) => debug!("Company research: reading {url} failed: {e}"),
        }
    }

    info!(
        "Researched {domain}: {} tech terms, mission {}",
        research.tech_stack.len(),
        if research.mission.is_empty() { "not found" } else { "found" }
    );
    research
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <nav class="menu">Home About Careers</nav>
          <section class="about-us">
            Acme builds payment infrastructure for small businesses. We run Python and Kubernetes
            services at scale and care deeply about reliability, clarity and craft.
          </section>
          <p>Short values note.</p>
          <p>Our mission is to make payments boring for every small business on earth.</p>
          <footer>We are a collaborative, remote-first team. Docker everywhere.</footer>
        </body></html>
    "#;

    #[test]
    fn test_parse_company_page() {
        let findings = parse_company_page(PAGE);

        assert!(
            findings.about.starts_with("Acme builds payment infrastructure"),
            "Expected about blurb, got {:?}",
            findings.about
        );
        assert_eq!(
            findings.mission,
            "Our mission is to make payments boring for every small business on earth."
        );
        assert_eq!(findings.tech_stack, vec!["python", "docker", "kubernetes"]);
        assert_eq!(findings.culture_keywords, vec!["collaborative", "remote-first"]);
    }

    #[test]
    fn test_parse_empty_page() {
        let findings = parse_company_page("<html><body><p>Hi</p></body></html>");
        assert!(findings.about.is_empty());
        assert!(findings.mission.is_empty());
        assert!(findings.tech_stack.is_empty());
    }

    #[test]
    fn test_normalise_domain() {
        assert_eq!(normalise_domain("https://Acme.io/"), Some("acme.io".to_string()));
        assert_eq!(normalise_domain("acme.io"), Some("acme.io".to_string()));
        assert_eq!(normalise_domain("localhost"), None);
        assert_eq!(normalise_domain("acme.io/path?x=1"), None);
        assert_eq!(normalise_domain("   "), None);
    }

    #[test]
    fn test_merge_keeps_first_findings() {
        let mut research = CompanyResearch::default();
        research.merge(PageFindings {
            mission: "first".to_string(),
            tech_stack: vec!["rust".to_string()],
            ..Default::default()
        });
        research.merge(PageFindings {
            mission: "second".to_string(),
            tech_stack: vec!["rust".to_string(), "aws".to_string()],
            ..Default::default()
        });
        assert_eq!(research.mission, "first");
        assert_eq!(research.tech_stack, vec!["rust", "aws"]);
        assert!(!research.is_empty());
    }
}
