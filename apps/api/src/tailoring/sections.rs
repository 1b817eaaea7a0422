//! Line-preserving section model of a plain-text resume, used by the optimizer's
//! mutation and crossover operators.

use crate::candidates::parser::header_key;
use crate::keywords::mentions_skill;

const BULLET_GLYPHS: &[char] = &['•', '-', '*', '·', '◦', '▪', '‣', '–'];

pub const SKILL_KEYS: &[&str] = &["skills", "technical skills", "core competencies"];
pub const EXPERIENCE_KEYS: &[&str] = &[
    "experience",
    "work experience",
    "professional experience",
    "employment history",
    "work history",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Normalised header key. `None` for the preamble above the first header.
    pub key: Option<&'static str>,
    pub header: Option<String>,
    pub lines: Vec<String>,
}

impl Section {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of `keywords` mentioned in this section (header included).
    pub fn relevance(&self, keywords: &[String]) -> usize {
        let lower = format!("{} {}", self.header.as_deref().unwrap_or(""), self.text())
            .to_lowercase();
        keywords.iter().filter(|k| mentions_skill(&lower, k)).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeDocument {
    pub sections: Vec<Section>,
}

impl ResumeDocument {
    pub fn parse(text: &str) -> Self {
        let mut sections = vec![Section {
            key: None,
            header: None,
            lines: Vec::new(),
        }];

        for line in text.lines() {
            match header_key(line) {
                Some(key) => sections.push(Section {
                    key: Some(key),
                    header: Some(line.to_string()),
                    lines: Vec::new(),
                }),
                None => {
                    if let Some(current) = sections.last_mut() {
                        current.lines.push(line.to_string());
                    }
                }
            }
        }

        if sections.len() > 1 && sections[0].lines.iter().all(|l| l.trim().is_empty()) {
            sections.remove(0);
        }
        Self { sections }
    }

    pub fn render(&self) -> String {
        let mut out: Vec<&str> = Vec::new();
        for section in &self.sections {
            if let Some(header) = &section.header {
                out.push(header);
            }
            out.extend(section.lines.iter().map(String::as_str));
        }
        out.join("\n")
    }

    pub fn find(&self, keys: &[&str]) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.key.is_some_and(|k| keys.contains(&k)))
    }
}

pub fn is_bullet(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| BULLET_GLYPHS.contains(&c))
        && line.trim_start().chars().nth(1).is_some_and(char::is_whitespace)
}

/// Rewrites a bullet line to start with `•`, keeping its indentation.
pub fn normalise_bullet(line: &str) -> String {
    if !is_bullet(line) {
        return line.to_string();
    }
    let indent_len = line.len() - line.trim_start().len();
    let body = line.trim_start();
    let mut chars = body.chars();
    chars.next();
    format!("{}• {}", &line[..indent_len], chars.as_str().trim_start())
}

/// Index ranges of consecutive bullet lines.
pub fn bullet_blocks(lines: &[String]) -> Vec<std::ops::Range<usize>> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    for (i, line) in lines.iter().enumerate() {
        match (is_bullet(line), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                blocks.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        blocks.push(s..lines.len());
    }
    blocks
}

pub fn line_mentions_any(line: &str, keywords: &[String]) -> bool {
    let lower = line.to_lowercase();
    keywords.iter().any(|k| mentions_skill(&lower, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\njane@example.com\n\nSUMMARY\nBackend engineer.\n\nEXPERIENCE\n- Built APIs\n* Ran Kafka\n\nSKILLS\nRust, Go";

    #[test]
    fn test_parse_and_render_preserve_text() {
        let doc = ResumeDocument::parse(RESUME);
        assert_eq!(doc.sections.len(), 4);
        assert_eq!(doc.sections[0].key, None);
        assert_eq!(doc.sections[1].key, Some("summary"));
        let keys: Vec<_> = doc.sections.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![None, Some("summary"), Some("experience"), Some("skills")]);
        assert_eq!(doc.render(), RESUME);
    }

    #[test]
    fn test_find_section() {
        let doc = ResumeDocument::parse(RESUME);
        assert_eq!(doc.find(SKILL_KEYS), Some(3));
        assert_eq!(doc.find(&["education"]), None);
    }

    #[test]
    fn test_bullets() {
        assert!(is_bullet("- Built APIs"));
        assert!(is_bullet("  * Ran Kafka"));
        assert!(!is_bullet("-5% churn"));
        assert!(!is_bullet("Plain line"));
        assert_eq!(normalise_bullet("  * Ran Kafka"), "  • Ran Kafka");
        assert_eq!(normalise_bullet("Plain"), "Plain");

        let lines: Vec<String> = ["a", "- b", "- c", "d", "• e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(bullet_blocks(&lines), vec![1..3, 4..5]);
    }

    #[test]
    fn test_relevance_counts_keywords() {
        let doc = ResumeDocument::parse(RESUME);
        let keywords = vec!["kafka".to_string(), "apis".to_string(), "rust".to_string()];
        assert_eq!(doc.sections[2].relevance(&keywords), 2);
        assert_eq!(doc.sections[3].relevance(&keywords), 1);
    }
}
