//! Application packages, tracking and the submission queue.

pub mod handlers;
pub mod queue;
pub mod service;
pub mod status;
pub mod tracking;
