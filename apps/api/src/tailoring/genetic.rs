//! Genetic optimizer for resume content.
//!
//! Individuals are section-structured copies of the original resume. Mutations only
//! reorder, reformat, or add keywords from the allowed set, so the optimizer never
//! introduces a job keyword the candidate cannot claim. Fitness is the weighted ATS score
//! against the target job. CPU-bound; callers run it on the blocking pool.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::keywords::{mentions_skill, top_keywords};
use crate::tailoring::ats::{score_resume, AtsAnalysis};
use crate::tailoring::sections::{
    bullet_blocks, is_bullet, line_mentions_any, normalise_bullet, ResumeDocument, Section,
    EXPERIENCE_KEYS, SKILL_KEYS,
};

const TOURNAMENT_SIZE: usize = 3;
const JOB_KEYWORD_LIMIT: usize = 30;
const SKILL_ENHANCEMENT_MAX: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct GaConfig {
    pub population_size: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub max_generations: usize,
    pub convergence_threshold: f64,
    /// Initial population gets 2-5 mutations per individual instead of 1-3.
    pub aggressive_initial: bool,
    /// Offspring get 2-5 mutations instead of 1-3.
    pub aggressive_offspring: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            mutation_rate: 0.1,
            crossover_rate: 0.7,
            max_generations: 20,
            convergence_threshold: 0.01,
            aggressive_initial: true,
            aggressive_offspring: false,
        }
    }
}

impl GaConfig {
    /// `basic`, `advanced` or `aggressive`; anything else is treated as `advanced`.
    pub fn for_level(level: &str) -> Self {
        match level {
            "basic" => Self {
                max_generations: 5,
                aggressive_initial: false,
                ..Self::default()
            },
            "aggressive" => Self {
                aggressive_offspring: true,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn elitism(&self) -> usize {
        (self.population_size / 5).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    KeywordInjection,
    SectionReordering,
    BulletOptimization,
    SkillEnhancement,
    ExperienceEmphasis,
    FormatAdjustment,
}

const MUTATIONS: [Mutation; 6] = [
    Mutation::KeywordInjection,
    Mutation::SectionReordering,
    Mutation::BulletOptimization,
    Mutation::SkillEnhancement,
    Mutation::ExperienceEmphasis,
    Mutation::FormatAdjustment,
];

/// Job keywords plus the subset the optimizer may write into the resume.
#[derive(Debug, Clone)]
pub struct KeywordTargets {
    pub job_keywords: Vec<String>,
    pub allowed: Vec<String>,
}

impl KeywordTargets {
    pub fn new(resume: &str, job_description: &str, declared_skills: &[String]) -> Self {
        let job_keywords = top_keywords(job_description, JOB_KEYWORD_LIMIT);
        let allowed = allowed_keywords(resume, &job_keywords, declared_skills);
        Self {
            job_keywords,
            allowed,
        }
    }
}

/// Job keywords the candidate declared as skills or that already appear in the resume.
pub fn allowed_keywords(
    resume: &str,
    job_keywords: &[String],
    declared_skills: &[String],
) -> Vec<String> {
    let resume_lower = resume.to_lowercase();
    let declared: Vec<String> = declared_skills
        .iter()
        .flat_map(|s| {
            let lower = s.to_lowercase();
            let mut parts: Vec<String> = lower
                .split(|c: char| !c.is_alphanumeric())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            parts.push(lower);
            parts
        })
        .collect();

    job_keywords
        .iter()
        .filter(|k| declared.contains(k) || mentions_skill(&resume_lower, k))
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
struct Individual {
    doc: ResumeDocument,
    content: String,
    analysis: AtsAnalysis,
    fitness: f64,
    mutations: Vec<Mutation>,
}

impl Individual {
    fn evaluate(doc: ResumeDocument, job_description: &str, mutations: Vec<Mutation>) -> Self {
        let content = doc.render();
        let analysis = score_resume(&content, Some(job_description));
        Self {
            fitness: fitness(&analysis),
            doc,
            content,
            analysis,
            mutations,
        }
    }
}

pub fn fitness(analysis: &AtsAnalysis) -> f64 {
    (analysis.overall * 0.4
        + analysis.keyword * 0.3
        + analysis.experience * 0.2
        + analysis.skills * 0.1)
        / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct GaOutcome {
    pub content: String,
    pub analysis: AtsAnalysis,
    pub original_analysis: AtsAnalysis,
    pub fitness: f64,
    pub original_fitness: f64,
    /// Best fitness before the first generation, then after each generation.
    pub fitness_history: Vec<f64>,
    pub generations_run: usize,
    pub keywords_injected: Vec<String>,
    pub mutations_applied: Vec<Mutation>,
    pub improved: bool,
}

pub struct GeneticOptimizer {
    config: GaConfig,
    rng: StdRng,
}

impl GeneticOptimizer {
    pub fn new(config: GaConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(config: GaConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn optimize(
        &mut self,
        resume: &str,
        job_description: &str,
        declared_skills: &[String],
    ) -> GaOutcome {
        let targets = KeywordTargets::new(resume, job_description, declared_skills);
        let original =
            Individual::evaluate(ResumeDocument::parse(resume), job_description, vec![]);

        let size = self.config.population_size.max(2);
        let mut population: Vec<Individual> = (0..size)
            .map(|_| {
                let count = self.mutation_count(self.config.aggressive_initial);
                let (doc, applied) = self.mutate(&original.doc, count, &targets);
                Individual::evaluate(doc, job_description, applied)
            })
            .collect();

        let mut best_fitness = best_of(&population).fitness;
        let mut history = vec![best_fitness];
        let mut generations_run = 0;

        for _ in 0..self.config.max_generations {
            population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

            let mut next: Vec<Individual> = population
                .iter()
                .take(self.config.elitism())
                .cloned()
                .collect();

            let parents: Vec<Individual> = (0..(size / 2).max(2))
                .map(|_| self.tournament(&population).clone())
                .collect();

            while next.len() < size {
                let first = &parents[self.rng.gen_range(0..parents.len())];
                let second = &parents[self.rng.gen_range(0..parents.len())];

                let child_doc = if self.rng.gen_bool(self.config.crossover_rate) {
                    self.crossover(&first.doc, &second.doc)
                } else {
                    first.doc.clone()
                };

                let mut count = self.mutation_count(self.config.aggressive_offspring);
                if self.rng.gen_bool(self.config.mutation_rate) {
                    count += 1;
                }
                let (child_doc, applied) = self.mutate(&child_doc, count, &targets);
                let mut lineage = first.mutations.clone();
                lineage.extend(applied);
                next.push(Individual::evaluate(child_doc, job_description, lineage));
            }

            population = next;
            generations_run += 1;

            let generation_best = best_of(&population).fitness;
            history.push(generation_best);
            let delta = (generation_best - best_fitness).abs();
            best_fitness = generation_best;
            if delta < self.config.convergence_threshold {
                break;
            }
        }

        let best = best_of(&population).clone();
        let improved = best.fitness >= original.fitness && best.content != original.content;
        let winner = if best.fitness >= original.fitness {
            best
        } else {
            original.clone()
        };

        let original_lower = original.content.to_lowercase();
        let winner_lower = winner.content.to_lowercase();
        let keywords_injected = targets
            .allowed
            .iter()
            .filter(|k| !mentions_skill(&original_lower, k) && mentions_skill(&winner_lower, k))
            .cloned()
            .collect();

        let mut mutations_applied = Vec::new();
        for m in &winner.mutations {
            if !mutations_applied.contains(m) {
                mutations_applied.push(*m);
            }
        }

        GaOutcome {
            content: winner.content,
            analysis: winner.analysis,
            original_analysis: original.analysis,
            fitness: winner.fitness,
            original_fitness: original.fitness,
            fitness_history: history,
            generations_run,
            keywords_injected,
            mutations_applied,
            improved,
        }
    }

    fn mutation_count(&mut self, aggressive: bool) -> usize {
        if aggressive {
            self.rng.gen_range(2..=5)
        } else {
            self.rng.gen_range(1..=3)
        }
    }

    fn mutate(
        &mut self,
        doc: &ResumeDocument,
        count: usize,
        targets: &KeywordTargets,
    ) -> (ResumeDocument, Vec<Mutation>) {
        let mut doc = doc.clone();
        let applied = pick_mutations(count, &mut self.rng);
        for mutation in &applied {
            apply_mutation(&mut doc, *mutation, targets, &mut self.rng);
        }
        (doc, applied)
    }

    fn tournament<'a>(&mut self, population: &'a [Individual]) -> &'a Individual {
        let mut winner = &population[self.rng.gen_range(0..population.len())];
        for _ in 1..TOURNAMENT_SIZE {
            let contender = &population[self.rng.gen_range(0..population.len())];
            if contender.fitness > winner.fitness {
                winner = contender;
            }
        }
        winner
    }

    /// Takes each section of `first` from either parent with equal probability, matched
    /// by section key.
    fn crossover(&mut self, first: &ResumeDocument, second: &ResumeDocument) -> ResumeDocument {
        let sections = first
            .sections
            .iter()
            .map(|section| {
                let other = second.sections.iter().find(|s| s.key == section.key);
                match other {
                    Some(other) if self.rng.gen_bool(0.5) => other.clone(),
                    _ => section.clone(),
                }
            })
            .collect();
        ResumeDocument { sections }
    }
}

fn best_of(population: &[Individual]) -> &Individual {
    population
        .iter()
        .reduce(|best, i| if i.fitness > best.fitness { i } else { best })
        .unwrap_or(&population[0])
}

pub fn apply_mutation(
    doc: &mut ResumeDocument,
    mutation: Mutation,
    targets: &KeywordTargets,
    rng: &mut StdRng,
) {
    match mutation {
        Mutation::KeywordInjection => {
            let missing = missing_allowed(doc, targets);
            inject_skills(doc, &missing);
        }
        Mutation::SkillEnhancement => {
            let mut missing = missing_allowed(doc, targets);
            missing.shuffle(rng);
            missing.truncate(SKILL_ENHANCEMENT_MAX);
            inject_skills(doc, &missing);
        }
        Mutation::SectionReordering => reorder_sections(doc, &targets.job_keywords),
        Mutation::BulletOptimization => optimise_bullets(doc, &targets.job_keywords, rng),
        Mutation::ExperienceEmphasis => emphasise_experience(doc, &targets.job_keywords),
        Mutation::FormatAdjustment => adjust_format(doc),
    }
}

fn missing_allowed(doc: &ResumeDocument, targets: &KeywordTargets) -> Vec<String> {
    let lower = doc.render().to_lowercase();
    targets
        .allowed
        .iter()
        .filter(|k| !mentions_skill(&lower, k))
        .cloned()
        .collect()
}

/// Appends `keywords` to the first line of the skills section, creating one when absent.
fn inject_skills(doc: &mut ResumeDocument, keywords: &[String]) {
    if keywords.is_empty() {
        return;
    }
    let addition = keywords.join(", ");

    match doc.find(SKILL_KEYS) {
        Some(index) => {
            let lines = &mut doc.sections[index].lines;
            match lines.iter_mut().find(|l| !l.trim().is_empty()) {
                Some(line) => {
                    let trimmed = line.trim_end().trim_end_matches(',').to_string();
                    *line = format!("{trimmed}, {addition}");
                }
                None => lines.insert(0, addition),
            }
        }
        None => {
            if let Some(last) = doc.sections.last_mut() {
                if last.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    last.lines.push(String::new());
                }
            }
            doc.sections.push(Section {
                key: Some("skills"),
                header: Some("SKILLS".to_string()),
                lines: vec![addition],
            });
        }
    }
}

/// Moves the most keyword-relevant section to directly after the preamble.
fn reorder_sections(doc: &mut ResumeDocument, keywords: &[String]) {
    let first_slot = usize::from(doc.sections.first().is_some_and(|s| s.key.is_none()));
    if doc.sections.len() <= first_slot + 1 {
        return;
    }

    let mut best: Option<(usize, usize)> = None;
    for (index, section) in doc.sections.iter().enumerate().skip(first_slot) {
        let relevance = section.relevance(keywords);
        if relevance > 0 && best.map_or(true, |(_, r)| relevance > r) {
            best = Some((index, relevance));
        }
    }

    if let Some((index, _)) = best {
        if index != first_slot {
            let section = doc.sections.remove(index);
            doc.sections.insert(first_slot, section);
            ensure_section_spacing(doc);
        }
    }
}

fn ensure_section_spacing(doc: &mut ResumeDocument) {
    let last = doc.sections.len().saturating_sub(1);
    for section in doc.sections.iter_mut().take(last) {
        if section.lines.last().map_or(true, |l| !l.trim().is_empty()) {
            section.lines.push(String::new());
        }
    }
}

/// `count` distinct strategies in random order, at most one of each.
fn pick_mutations<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Mutation> {
    MUTATIONS.choose_multiple(rng, count).copied().collect()
}

fn optimise_bullets(doc: &mut ResumeDocument, keywords: &[String], rng: &mut StdRng) {
    let mut candidates = Vec::new();
    for (section_index, section) in doc.sections.iter_mut().enumerate() {
        for line in section.lines.iter_mut() {
            if is_bullet(line) {
                *line = normalise_bullet(line);
            }
        }
        for block in bullet_blocks(&section.lines) {
            let start = block.start;
            for i in block.skip(1) {
                if line_mentions_any(&section.lines[i], keywords) {
                    candidates.push((section_index, start, i));
                }
            }
        }
    }

    if let Some(&(section_index, start, i)) = candidates.choose(rng) {
        let lines = &mut doc.sections[section_index].lines;
        let line = lines.remove(i);
        lines.insert(start, line);
    }
}

/// Within each experience bullet block, keyword bullets move first, keeping relative order.
fn emphasise_experience(doc: &mut ResumeDocument, keywords: &[String]) {
    let Some(index) = doc.find(EXPERIENCE_KEYS) else {
        return;
    };
    let lines = &mut doc.sections[index].lines;
    for block in bullet_blocks(lines) {
        let (mut hits, misses): (Vec<String>, Vec<String>) = lines[block.clone()]
            .iter()
            .cloned()
            .partition(|l| line_mentions_any(l, keywords));
        hits.extend(misses);
        for (offset, line) in hits.into_iter().enumerate() {
            lines[block.start + offset] = line;
        }
    }
}

fn adjust_format(doc: &mut ResumeDocument) {
    for section in &mut doc.sections {
        if let Some(header) = &mut section.header {
            *header = header.trim().to_uppercase();
        }
        let mut collapsed: Vec<String> = Vec::with_capacity(section.lines.len());
        for line in &section.lines {
            let line = line.trim_end().to_string();
            if line.is_empty() && collapsed.last().is_some_and(|l| l.is_empty()) {
                continue;
            }
            collapsed.push(line);
        }
        section.lines = collapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\njane@example.com | (555) 123-4567 | Austin, TX\n\n\
Summary\nBackend engineer building reliable services.\n\n\
Experience\nSenior Engineer, Acme 2019 - Present\n- Designed billing APIs in Go   \n\
- Developed Rust services handling 2000 customers\n\n\n\
Skills\nRust, Go, SQL";

    const JOB: &str = "We need a Rust engineer with Kubernetes and Terraform experience. \
Rust services, Kubernetes clusters, Terraform modules. Kubernetes on call.";

    fn make_targets() -> KeywordTargets {
        KeywordTargets::new(RESUME, JOB, &make_skills())
    }

    fn make_skills() -> Vec<String> {
        vec!["Rust".to_string(), "Kubernetes".to_string(), "Go".to_string()]
    }

    #[test]
    fn test_allowed_keywords_exclude_unclaimed_skills() {
        let targets = make_targets();
        assert!(targets.job_keywords.contains(&"terraform".to_string()));
        assert!(targets.allowed.contains(&"kubernetes".to_string()));
        assert!(targets.allowed.contains(&"rust".to_string()));
        assert!(
            !targets.allowed.contains(&"terraform".to_string()),
            "Expected terraform to be disallowed, got {:?}",
            targets.allowed
        );
    }

    #[test]
    fn test_keyword_injection_appends_to_skills_line() {
        let mut doc = ResumeDocument::parse(RESUME);
        let targets = make_targets();
        let mut rng = StdRng::seed_from_u64(1);
        apply_mutation(&mut doc, Mutation::KeywordInjection, &targets, &mut rng);

        let skills = &doc.sections[doc.find(SKILL_KEYS).unwrap()];
        assert_eq!(skills.lines[0], "Rust, Go, SQL, kubernetes");
    }

    #[test]
    fn test_keyword_injection_creates_skills_section() {
        let mut doc = ResumeDocument::parse("Jane Doe\n\nExperience\n- Built things");
        let targets = KeywordTargets {
            job_keywords: vec!["kubernetes".to_string()],
            allowed: vec!["kubernetes".to_string()],
        };
        let mut rng = StdRng::seed_from_u64(1);
        apply_mutation(&mut doc, Mutation::KeywordInjection, &targets, &mut rng);
        assert!(
            doc.render().ends_with("- Built things\n\nSKILLS\nkubernetes"),
            "Expected a new skills section, got {:?}",
            doc.render()
        );
    }

    #[test]
    fn test_format_adjustment() {
        let mut doc = ResumeDocument::parse(RESUME);
        let targets = make_targets();
        let mut rng = StdRng::seed_from_u64(1);
        apply_mutation(&mut doc, Mutation::FormatAdjustment, &targets, &mut rng);
        let text = doc.render();

        assert!(text.contains("\nEXPERIENCE\n"));
        assert!(text.contains("- Designed billing APIs in Go\n"));
        assert!(!text.contains("\n\n\n"), "Expected blank runs collapsed, got {text:?}");
    }

    #[test]
    fn test_experience_emphasis_moves_keyword_bullets_first() {
        let mut doc = ResumeDocument::parse(RESUME);
        let targets = make_targets();
        let mut rng = StdRng::seed_from_u64(1);
        apply_mutation(&mut doc, Mutation::ExperienceEmphasis, &targets, &mut rng);

        let experience = &doc.sections[doc.find(EXPERIENCE_KEYS).unwrap()];
        assert!(experience.lines[1].contains("Rust services"));
        assert!(experience.lines[2].contains("billing APIs"));
    }

    #[test]
    fn test_section_reordering_moves_most_relevant_first() {
        let mut doc = ResumeDocument::parse(RESUME);
        let targets = make_targets();
        let mut rng = StdRng::seed_from_u64(1);
        apply_mutation(&mut doc, Mutation::SectionReordering, &targets, &mut rng);

        assert_eq!(doc.sections[0].key, None);
        let moved = doc.sections[1].key;
        assert!(
            moved == Some("experience") || moved == Some("skills"),
            "Expected a keyword-heavy section after the preamble, got {moved:?}"
        );
    }

    #[test]
    fn test_picked_mutations_are_distinct() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let picked = pick_mutations(3, &mut rng);
            assert_eq!(picked.len(), 3);
            for (i, m) in picked.iter().enumerate() {
                assert!(
                    !picked[i + 1..].contains(m),
                    "Expected distinct strategies, got {picked:?}"
                );
            }
        }
        assert_eq!(pick_mutations(MUTATIONS.len() + 4, &mut rng).len(), MUTATIONS.len());
    }

    #[test]
    fn test_optimize_never_adds_disallowed_keywords() {
        let mut optimizer = GeneticOptimizer::with_seed(GaConfig::for_level("aggressive"), 7);
        let outcome = optimizer.optimize(RESUME, JOB, &make_skills());
        let lower = outcome.content.to_lowercase();

        assert!(!lower.contains("terraform"), "Expected no terraform, got {lower}");
        for keyword in &outcome.keywords_injected {
            assert!(
                make_targets().allowed.contains(keyword),
                "Expected only allowed keywords, got {keyword}"
            );
        }
        assert!(outcome.fitness >= outcome.original_fitness);
    }

    #[test]
    fn test_fitness_history_is_nondecreasing() {
        let mut optimizer = GeneticOptimizer::with_seed(GaConfig::default(), 42);
        let outcome = optimizer.optimize(RESUME, JOB, &make_skills());

        assert_eq!(outcome.fitness_history.len(), outcome.generations_run + 1);
        assert!(outcome.generations_run <= 20);
        for pair in outcome.fitness_history.windows(2) {
            assert!(
                pair[1] >= pair[0],
                "Expected nondecreasing best fitness, got {:?}",
                outcome.fitness_history
            );
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = |seed| {
            let mut optimizer = GeneticOptimizer::with_seed(GaConfig::for_level("basic"), seed);
            optimizer.optimize(RESUME, JOB, &make_skills())
        };
        let a = run(11);
        let b = run(11);
        assert_eq!(a.content, b.content);
        assert_eq!(a.fitness_history, b.fitness_history);
    }

    #[test]
    fn test_level_configs() {
        assert_eq!(GaConfig::for_level("basic").max_generations, 5);
        assert!(!GaConfig::for_level("basic").aggressive_initial);
        assert!(GaConfig::for_level("aggressive").aggressive_offspring);
        assert_eq!(GaConfig::for_level("advanced").max_generations, 20);
        assert_eq!(GaConfig::default().elitism(), 2);
    }
}
