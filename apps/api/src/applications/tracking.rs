//! Application package pieces: method detection, email aliases, tracking pixels,
//! UTM parameters and the email draft for `mailto:` postings.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PORTAL_HOSTS: &[&str] = &[
    "greenhouse",
    "lever",
    "workday",
    "myworkdayjobs",
    "icims",
    "smartrecruiters",
    "ashby",
];

/// 1×1 transparent PNG served for tracking pixels.
pub const TRACKING_PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationMethod {
    DirectForm,
    EmailApply,
    #[default]
    ExternalLink,
    CompanyPortal,
    LinkedinEasy,
    IndeedQuick,
}

impl ApplicationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationMethod::DirectForm => "direct_form",
            ApplicationMethod::EmailApply => "email_apply",
            ApplicationMethod::ExternalLink => "external_link",
            ApplicationMethod::CompanyPortal => "company_portal",
            ApplicationMethod::LinkedinEasy => "linkedin_easy",
            ApplicationMethod::IndeedQuick => "indeed_quick",
        }
    }
}

/// How a posting is applied to, judged from its apply URL.
pub fn detect_method(apply_url: &str) -> ApplicationMethod {
    let url = apply_url.trim();
    if url.to_lowercase().starts_with("mailto:") {
        return ApplicationMethod::EmailApply;
    }
    let Ok(parsed) = Url::parse(url) else {
        return ApplicationMethod::ExternalLink;
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();

    if host.ends_with("linkedin.com") {
        ApplicationMethod::LinkedinEasy
    } else if host.ends_with("indeed.com") {
        ApplicationMethod::IndeedQuick
    } else if PORTAL_HOSTS.iter().any(|p| host.contains(p)) {
        ApplicationMethod::CompanyPortal
    } else if parsed.path().to_lowercase().contains("/apply") {
        ApplicationMethod::DirectForm
    } else {
        ApplicationMethod::ExternalLink
    }
}

/// `{local}+job-{first 8 of id}@{domain}`. Any `+tag` on the candidate address is dropped.
pub fn email_alias(candidate_email: &str, application_id: Uuid, domain: &str) -> String {
    let local = candidate_email.split('@').next().unwrap_or_default();
    let local = local.split('+').next().unwrap_or_default();
    let id = application_id.simple().to_string();
    format!("{local}+job-{}@{domain}", &id[..8])
}

pub fn new_pixel_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn pixel_url(tracking_base_url: &str, pixel_id: &str) -> String {
    format!("{}/pixel/{pixel_id}.png", tracking_base_url.trim_end_matches('/'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_content: String,
    pub utm_term: String,
}

impl UtmParams {
    pub fn new(job_source: &str, application_id: Uuid) -> Self {
        Self {
            utm_source: job_source.to_string(),
            utm_medium: "job_application".to_string(),
            utm_campaign: "jobhunter".to_string(),
            utm_content: application_id.to_string(),
            utm_term: "automated_application".to_string(),
        }
    }

    pub fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("utm_source", &self.utm_source),
            ("utm_medium", &self.utm_medium),
            ("utm_campaign", &self.utm_campaign),
            ("utm_content", &self.utm_content),
            ("utm_term", &self.utm_term),
        ]
    }
}

/// The apply URL with UTM parameters appended. Non-HTTP URLs come back unchanged.
pub fn tracked_url(apply_url: &str, utm: &UtmParams) -> String {
    match Url::parse(apply_url.trim()) {
        Ok(mut url) if matches!(url.scheme(), "http" | "https") => {
            url.query_pairs_mut().extend_pairs(utm.pairs());
            url.to_string()
        }
        _ => apply_url.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailDraft {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Recipient address of a `mailto:` URL, without query parameters.
pub fn mailto_recipient(apply_url: &str) -> Option<String> {
    let rest = apply_url.trim();
    let rest = rest
        .strip_prefix("mailto:")
        .or_else(|| rest.strip_prefix("MAILTO:"))?;
    let address = rest.split('?').next().unwrap_or_default().trim();
    address.contains('@').then(|| address.to_string())
}

pub struct EmailParts<'a> {
    pub apply_url: &'a str,
    pub position: &'a str,
    pub company: &'a str,
    pub candidate_name: &'a str,
    pub candidate_phone: Option<&'a str>,
    pub alias: &'a str,
    pub cover_letter: Option<&'a str>,
    pub pixel_url: &'a str,
}

/// Email for `mailto:` postings. The cover letter is the body when there is one.
pub fn email_draft(parts: &EmailParts<'_>) -> Option<EmailDraft> {
    let to = mailto_recipient(parts.apply_url)?;

    let mut body = match parts.cover_letter {
        Some(letter) if !letter.trim().is_empty() => letter.trim().to_string(),
        _ => format!(
            "Dear Hiring Manager,\n\n\
             I am writing to express my strong interest in the {} position at {}.\n\n\
             Please find my resume attached. I would welcome the opportunity to discuss \
             how my skills and experience align with your needs.\n\n\
             Best regards,\n{}",
            parts.position, parts.company, parts.candidate_name
        ),
    };
    if let Some(phone) = parts.candidate_phone.filter(|p| !p.trim().is_empty()) {
        body.push_str(&format!("\n{}", phone.trim()));
    }
    body.push_str(&format!("\n{}", parts.alias));
    body.push_str(&format!(
        "\n\n<img src=\"{}\" width=\"1\" height=\"1\" alt=\"\" />",
        parts.pixel_url
    ));

    Some(EmailDraft {
        to,
        reply_to: parts.alias.to_string(),
        subject: format!("Application for {} - {}", parts.position, parts.candidate_name),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_method() {
        let cases = [
            ("mailto:jobs@acme.io?subject=Hi", ApplicationMethod::EmailApply),
            ("https://www.linkedin.com/jobs/view/1", ApplicationMethod::LinkedinEasy),
            ("https://www.indeed.com/viewjob?jk=abc", ApplicationMethod::IndeedQuick),
            ("https://boards.greenhouse.io/acme/jobs/1", ApplicationMethod::CompanyPortal),
            ("https://acme.wd5.myworkdayjobs.com/en-US/1", ApplicationMethod::CompanyPortal),
            ("https://jobs.ashbyhq.com/acme/1", ApplicationMethod::CompanyPortal),
            ("https://acme.io/careers/apply/42", ApplicationMethod::DirectForm),
            ("https://acme.io/careers/42", ApplicationMethod::ExternalLink),
            ("not a url", ApplicationMethod::ExternalLink),
        ];
        for (url, expected) in cases {
            assert_eq!(detect_method(url), expected, "Expected {expected:?} for {url}");
        }
    }

    #[test]
    fn test_email_alias() {
        let id = Uuid::parse_str("1234abcd-0000-0000-0000-000000000000").unwrap();
        assert_eq!(
            email_alias("ada.lovelace+jobs@gmail.com", id, "jobhunter.local"),
            "ada.lovelace+job-1234abcd@jobhunter.local"
        );
    }

    #[test]
    fn test_pixel_url_and_id() {
        assert_eq!(
            pixel_url("http://localhost:8080/api/track/", "abc"),
            "http://localhost:8080/api/track/pixel/abc.png"
        );
        let id = new_pixel_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_utm_params_and_tracked_url() {
        let id = Uuid::nil();
        let utm = UtmParams::new("indeed", id);
        assert_eq!(utm.utm_medium, "job_application");
        assert_eq!(utm.utm_campaign, "jobhunter");
        assert_eq!(utm.utm_term, "automated_application");

        let url = tracked_url("https://acme.io/jobs/1?ref=board", &utm);
        assert_eq!(
            url,
            format!(
                "https://acme.io/jobs/1?ref=board&utm_source=indeed&utm_medium=job_application\
                 &utm_campaign=jobhunter&utm_content={id}&utm_term=automated_application"
            )
        );
        assert_eq!(tracked_url("mailto:jobs@acme.io", &utm), "mailto:jobs@acme.io");
    }

    #[test]
    fn test_email_draft() {
        let parts = EmailParts {
            apply_url: "mailto:jobs@acme.io?subject=Engineer",
            position: "Backend Engineer",
            company: "Acme",
            candidate_name: "Ada Lovelace",
            candidate_phone: Some("555-0100"),
            alias: "ada+job-1234abcd@jobhunter.local",
            cover_letter: None,
            pixel_url: "http://t/pixel/p.png",
        };
        let draft = email_draft(&parts).unwrap();

        assert_eq!(draft.to, "jobs@acme.io");
        assert_eq!(draft.subject, "Application for Backend Engineer - Ada Lovelace");
        assert!(draft.body.contains("Backend Engineer position at Acme"));
        assert!(draft.body.contains("\n555-0100\nada+job-1234abcd@jobhunter.local"));
        assert!(draft.body.ends_with("<img src=\"http://t/pixel/p.png\" width=\"1\" height=\"1\" alt=\"\" />"));

        let with_letter = email_draft(&EmailParts {
            cover_letter: Some("Dear team,\n\nHello."),
            ..parts
        })
        .unwrap();
        assert!(with_letter.body.starts_with("Dear team,\n\nHello.\n555-0100"));
    }

    #[test]
    fn test_email_draft_requires_mailto() {
        let parts = EmailParts {
            apply_url: "https://acme.io/jobs/1",
            position: "Engineer",
            company: "Acme",
            candidate_name: "Ada",
            candidate_phone: None,
            alias: "a@b.c",
            cover_letter: None,
            pixel_url: "p",
        };
        assert!(email_draft(&parts).is_none());
    }

    #[test]
    fn test_tracking_pixel_is_png() {
        assert_eq!(&TRACKING_PIXEL_PNG[..8], b"\x89PNG\r\n\x1a\n");
        let n = TRACKING_PIXEL_PNG.len();
        assert_eq!(&TRACKING_PIXEL_PNG[n - 8..n - 4], b"IEND");
    }
}
