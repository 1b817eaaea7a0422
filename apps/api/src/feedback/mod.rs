//! Feedback loop: outcome analysis, stored reports, optimization settings and
//! success prediction.

pub mod analyzer;
pub mod handlers;
pub mod prompts;
pub mod service;
