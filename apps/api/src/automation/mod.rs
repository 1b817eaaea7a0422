//! Autonomous cycle driving every pipeline stage for automated candidates.

pub mod handlers;
pub mod orchestrator;
