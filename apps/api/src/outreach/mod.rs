//! Recruiter outreach prepared as drafts: contacts, quotas, campaigns and follow-ups.

pub mod campaign;
pub mod handlers;
pub mod messages;
pub mod prompts;
pub mod service;
