//! State module for tracking crawl progress across runs
//!
//! # Components
//!
//! - `CrawlState`: persisted resumption offset, completion flag and progress counters

mod crawl_state;

pub use crawl_state::CrawlState;
