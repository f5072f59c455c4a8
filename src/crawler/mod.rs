//! Crawler module for post discovery and comment harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with backoff on rate limits and server errors
//! - Politeness pauses between requests
//! - Paginated index listing
//! - Comment retrieval (JSON endpoint, rendered page fallback)
//! - Record assembly and overall run coordination

mod assemble;
mod coordinator;
mod fetcher;
mod lister;
mod politeness;
mod rendered;
mod retriever;

pub use assemble::{assemble_record, matching_records};
pub use coordinator::{Coordinator, CrawlPlan, RunReport};
pub use fetcher::{
    build_http_client, parse_retry_after, user_agent_string, Fetcher, RetryPolicy, ACCEPT_HTML,
    ACCEPT_JSON,
};
pub use lister::{index_page_url, list_documents, DocumentLister, DocumentReference};
pub use politeness::Politeness;
pub use rendered::parse_rendered_comments;
pub use retriever::{
    comments_url, post_lookup_url, CommentRetriever, CommentSource, RetrievedComments,
};

use crate::config::Config;

/// Runs one bounded crawl and persists the merged dataset
///
/// This is the main entry point for a crawl. It will:
/// 1. Load the stored dataset and crawl state
/// 2. Page through the index from the stored offset
/// 3. Fetch and filter the comments of every listed post
/// 4. Merge and persist the results
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Ignore stored crawl state
///
/// # Returns
///
/// * `Ok(RunReport)` - Run finished, possibly with skipped posts
/// * `Err(GleanError)` - Storage failed or the crawler could not start
///
/// # Example
///
/// ```no_run
/// use comment_gleaner::config::load_config;
/// use comment_gleaner::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("gleaner.toml"))?;
/// let report = crawl(config, false).await?;
/// println!("{} records", report.total_records);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, fresh: bool) -> crate::Result<RunReport> {
    let coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
