//! Web discovery and acquisition.
//!
//! - Serper (Google) search client (`serper`) for discovery
//! - Paragraph scraper over plain HTTP (`scraper`)
//!
//! Both sit behind small traits so the research pipeline can run against
//! in-memory fakes. Neither ever fails outright: search degrades to no
//! results, scraping to `None`, and the cause goes to the log.

pub mod scraper;
pub mod serper;

use async_trait::async_trait;

pub use serper::types::SearchResult;

/// Turns a query string into ranked results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Vec<SearchResult>;
}

/// Fetches a page and reduces it to readable text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn scrape(&self, url: &str) -> Option<String>;
}
