//! Candidate/job matching: hard-requirement rules, semantic similarity and AI assessment.

pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod rules;
pub mod similarity;
