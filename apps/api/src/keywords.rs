//! Shared vocabulary: stop words, the tech-skill list, tokenizers and keyword ranking.
//!
//! Used by the resume parser, job enrichment, matching, ATS scoring and cover letters,
//! so every stage agrees on what counts as a skill or a keyword.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could", "did", "do",
    "does", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "may", "might", "must", "not", "of", "on", "or", "our", "she",
    "should", "so", "such", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "those", "to", "was", "we", "were", "what", "when", "where", "which", "who",
    "will", "with", "would", "you", "your", "all", "any", "about", "also", "etc", "per",
    "more", "most", "other", "some", "very", "well", "work", "working", "team", "role", "join",
    "looking", "including", "able", "strong", "new", "using", "use", "within", "across",
];

/// Skills recognised in job postings and resumes.
pub const TECH_SKILLS: &[&str] = &[
    "python", "javascript", "java", "c++", "c#", "ruby", "php", "go", "rust", "react", "angular",
    "vue", "node.js", "django", "flask", "spring", "aws", "azure", "gcp", "docker", "kubernetes",
    "jenkins", "git", "sql", "mysql", "postgresql", "mongodb", "redis", "elasticsearch", "html",
    "css", "sass", "less", "webpack", "babel", "typescript", "linux", "unix", "agile", "scrum",
    "ci/cd", "devops", "machine learning", "ai", "data science", "tensorflow", "pytorch",
    "pandas", "numpy",
];

static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

/// Word-boundary patterns for alphanumeric skills. Symbol skills (`c++`, `node.js`) have `None`
/// and are matched as plain substrings, since `\b` cannot anchor on symbols.
static SKILL_PATTERNS: Lazy<Vec<(&'static str, Option<Regex>)>> = Lazy::new(|| {
    TECH_SKILLS
        .iter()
        .map(|skill| {
            let plain = skill.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ');
            let pattern = plain
                .then(|| Regex::new(&format!(r"\b{}\b", regex::escape(skill))).unwrap());
            (*skill, pattern)
        })
        .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_SET.contains(word)
}

const WORD_PATTERN_CACHE_CAP: usize = 4096;

/// Compiled word-boundary patterns keyed by lowercased skill. Cleared when full.
static WORD_PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn word_pattern(skill: &str) -> Option<Regex> {
    let mut cache = WORD_PATTERNS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(re) = cache.get(skill) {
        return Some(re.clone());
    }
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(skill))).ok()?;
    if cache.len() >= WORD_PATTERN_CACHE_CAP {
        cache.clear();
    }
    cache.insert(skill.to_string(), re.clone());
    Some(re)
}

/// Returns true when `skill` occurs in `text_lower` as a whole word (or exact substring for
/// symbol skills). `text_lower` must already be lowercased.
pub fn mentions_skill(text_lower: &str, skill: &str) -> bool {
    let skill = skill.to_lowercase();
    if skill.is_empty() {
        return false;
    }
    if skill.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        word_pattern(&skill).is_some_and(|re| re.is_match(text_lower))
    } else {
        text_lower.contains(&skill)
    }
}

/// Known tech skills found in `text`, in list order.
pub fn extract_tech_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SKILL_PATTERNS
        .iter()
        .filter(|(skill, pattern)| match pattern {
            Some(re) => re.is_match(&lower),
            None => lower.contains(skill),
        })
        .map(|(skill, _)| skill.to_string())
        .collect()
}

/// Lowercase alphanumeric tokens with stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// The `n` most frequent alphabetic keywords (more than 2 chars, not stop words).
/// Ties keep first-seen order.
pub fn top_keywords(text: &str, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let lower = text.to_lowercase();
    let words = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| w.chars().count() > 2 && !is_stop_word(w));

    for (position, word) in words.enumerate() {
        counts
            .entry(word.to_string())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(n).map(|(word, _, _)| word).collect()
}

/// Case-insensitive dedupe preserving first-seen order and original casing.
pub fn dedupe_case_insensitive<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let item: String = item.into();
        if seen.insert(item.to_lowercase()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tech_skills_uses_word_boundaries() {
        let skills = extract_tech_skills("We use Rust and Django; good governance matters.");
        assert!(skills.contains(&"rust".to_string()));
        assert!(skills.contains(&"django".to_string()));
        assert!(
            !skills.contains(&"go".to_string()),
            "Expected 'go' not to match inside 'governance', got {:?}",
            skills
        );
    }

    #[test]
    fn test_extract_tech_skills_symbol_skills() {
        let skills = extract_tech_skills("Experience with C++, Node.js and CI/CD pipelines");
        assert!(skills.contains(&"c++".to_string()));
        assert!(skills.contains(&"node.js".to_string()));
        assert!(skills.contains(&"ci/cd".to_string()));
    }

    #[test]
    fn test_top_keywords_ties_keep_first_seen_order() {
        let keywords = top_keywords("kafka spark kafka spark flink", 3);
        assert_eq!(keywords, vec!["kafka", "spark", "flink"]);
    }

    #[test]
    fn test_top_keywords_drops_short_and_stop_words() {
        let keywords = top_keywords("We are the best at AI and ML with Terraform", 10);
        assert_eq!(keywords, vec!["best", "terraform"]);
    }

    #[test]
    fn test_tokenize_lowercases_and_strips_stop_words() {
        assert_eq!(tokenize("The Rust API, and Postgres!"), vec!["rust", "api", "postgres"]);
    }

    #[test]
    fn test_mentions_skill() {
        assert!(mentions_skill("built services in go and rust", "Go"));
        assert!(!mentions_skill("good governance", "go"));
        assert!(mentions_skill("scaled node.js apps", "node.js"));
    }

    #[test]
    fn test_mentions_skill_reuses_compiled_pattern() {
        assert!(mentions_skill("we ship kubernetes operators", "Kubernetes"));
        assert!(!mentions_skill("kubernetesish tooling", "kubernetes"));

        let cache = WORD_PATTERNS.lock().unwrap();
        assert!(
            cache.contains_key("kubernetes"),
            "Expected the lowercased skill to be cached, got {} entries",
            cache.len()
        );
    }

    #[test]
    fn test_dedupe_case_insensitive_keeps_first_casing() {
        let out = dedupe_case_insensitive(vec!["Python", "python", "SQL", "sql", "Go"]);
        assert_eq!(out, vec!["Python", "SQL", "Go"]);
    }
}
