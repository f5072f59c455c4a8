//! Persisted crawl position
//!
//! Incremental runs pick up paging from the offset stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resumption point of an incremental crawl
///
/// Read once at run start, written once at run end. `done` is terminal: once
/// set, later runs skip crawling and only refresh the dataset timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlState {
    /// Index offset the next run starts paging from
    pub next_offset: u64,

    /// Index exhausted or cumulative limit reached
    pub done: bool,

    /// Posts handed out by the index across all runs
    pub total_documents_seen: u64,

    pub last_run_at: Option<DateTime<Utc>>,
}

impl CrawlState {
    /// Creates a state positioned at the start of the index
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Folds the outcome of one run's pagination into the state
    ///
    /// # Arguments
    ///
    /// * `next_offset` - Index position after the last consumed entry
    /// * `documents_seen` - Posts yielded by the index during this run
    /// * `index_exhausted` - The index returned an empty page
    /// * `max_total` - Cumulative post limit after which the crawl is complete
    pub fn record_progress(
        &mut self,
        next_offset: u64,
        documents_seen: u64,
        index_exhausted: bool,
        max_total: u64,
    ) {
        if self.done {
            return;
        }

        self.next_offset = self.next_offset.max(next_offset);
        self.total_documents_seen = self.total_documents_seen.saturating_add(documents_seen);

        if index_exhausted || self.total_documents_seen >= max_total {
            self.done = true;
        }
    }

    /// Stamps the time of the run that last touched this state
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_run_at = Some(now);
    }
}
