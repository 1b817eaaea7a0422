use async_trait::async_trait;

use crate::scraping::{ScrapeError, ScrapeQuery, ScrapedJob};

/// A job board that can be searched page by page.
///
/// Carried in `AppState` as `Arc<dyn JobSource>`. Implementations must return
/// `ScrapeError::Blocked` instead of retrying when the board pushes back.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Stable identifier stored in `jobs_raw.source`.
    fn name(&self) -> &'static str;

    /// Cards from one page of results. `page` starts at 0.
    async fn search(&self, query: &ScrapeQuery, page: u32) -> Result<Vec<ScrapedJob>, ScrapeError>;

    /// Fills in the full description for a card.
    async fn fetch_details(&self, job: ScrapedJob) -> Result<ScrapedJob, ScrapeError>;
}
