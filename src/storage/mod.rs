//! Storage module for persisting crawl results
//!
//! This module owns everything that touches disk:
//! - The persisted record and dataset shapes
//! - The `Storage` trait and its JSON file implementation
//! - De-duplicating merge of new records into previously stored ones
//! - Crawl state persistence for incremental runs

mod json_store;
mod merge;
mod traits;

pub use json_store::JsonFileStorage;
pub use merge::{dedup_key, merge, DEDUP_TEXT_CHARS};
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::OutputConfig;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opens the file store described by the output section of the config
pub fn open_storage(output: &OutputConfig) -> JsonFileStorage {
    JsonFileStorage::new(&output.dataset_path, &output.state_path)
}

/// One matched comment, the persisted unit of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub post_url: String,
    pub post_title: Option<String>,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub top_level_comment_id: Option<String>,
    pub parent_comment_id: Option<String>,
    pub comment_url: Option<String>,
    pub top_level_comment_url: Option<String>,
    pub parent_comment_url: Option<String>,
    /// Posted time in epoch milliseconds
    pub comment_date_ms: Option<i64>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub text: String,
}

/// Identity the dataset was filtered for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetIdentity {
    pub name: Option<String>,
    pub handle: Option<String>,
}

/// The persisted dataset, replaced wholesale on every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDataset {
    pub generated_at: DateTime<Utc>,
    pub source_url: String,
    pub target_identity: TargetIdentity,
    pub count: usize,
    #[serde(default)]
    pub rows: Vec<OutputRecord>,
}

impl OutputDataset {
    /// Builds a dataset around `rows`, keeping `count` in step with them
    pub fn new(
        source_url: impl Into<String>,
        target_identity: TargetIdentity,
        rows: Vec<OutputRecord>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            source_url: source_url.into(),
            target_identity,
            count: rows.len(),
            rows,
        }
    }

    /// Refreshes the generation timestamp without touching rows
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.generated_at = now;
        self.count = self.rows.len();
    }
}
