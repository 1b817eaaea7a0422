//! Database row types. One struct per table, `FromRow` for sqlx and `Serialize` for responses.

pub mod application;
pub mod candidate;
pub mod documents;
pub mod feedback;
pub mod job;
pub mod outreach;

use serde::Serialize;
use sqlx::FromRow;

/// `label, count` rows from GROUP BY queries.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}
