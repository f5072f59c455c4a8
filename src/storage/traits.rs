//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::CrawlState;
use crate::storage::OutputDataset;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Both documents are read once at run start and written once at run end.
/// A missing document loads as `None`; an unreadable one is an error.
pub trait Storage {
    /// Loads the previously persisted dataset
    fn load_dataset(&self) -> StorageResult<Option<OutputDataset>>;

    /// Replaces the persisted dataset
    fn save_dataset(&self, dataset: &OutputDataset) -> StorageResult<()>;

    /// Loads the incremental crawl state
    fn load_state(&self) -> StorageResult<Option<CrawlState>>;

    /// Replaces the incremental crawl state
    fn save_state(&self, state: &CrawlState) -> StorageResult<()>;
}
