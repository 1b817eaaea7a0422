//! Resume tailoring: ATS scoring, the genetic optimizer and stored resume versions.

pub mod ats;
pub mod genetic;
pub mod handlers;
pub mod prompts;
pub mod sections;
pub mod service;
