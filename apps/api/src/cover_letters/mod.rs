//! Cover letters: company research, tone-driven generation and usage tracking.

pub mod generator;
pub mod handlers;
pub mod personalization;
pub mod prompts;
pub mod research;
pub mod stats;
