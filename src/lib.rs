//! Comment-Gleaner: a polite newsletter comment harvester
//!
//! This crate crawls the public archive of a hosted newsletter, pulls the
//! comment threads of every post, keeps the comments written by one target
//! identity, and merges them into a flat, de-duplicated JSON dataset that
//! grows across repeated runs.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod text;
pub mod thread;
pub mod url;

use thiserror::Error;

/// Main error type for Comment-Gleaner operations
#[derive(Debug, Error)]
pub enum GleanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for environment override {name}: {value}")]
    InvalidOverride { name: String, value: String },
}

/// Errors surfaced by the rate-limited fetcher and the payload parsers
/// sitting directly on top of it
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Gave up on {url} after {attempts} attempts (last status: {last_status:?})")]
    ExhaustedRetries {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
    },

    #[error("HTTP {status} for {url}: {snippet}")]
    Fatal {
        url: String,
        status: u16,
        snippet: String,
    },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// HTTP status carried by the error, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ExhaustedRetries { last_status, .. } => *last_status,
            Self::Fatal { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Malformed { .. } => None,
        }
    }
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("No post slug in URL: {0}")]
    MissingSlug(String),
}

/// Result type alias for Comment-Gleaner operations
pub type Result<T> = std::result::Result<T, GleanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::CrawlState;
pub use storage::{OutputDataset, OutputRecord};
pub use crate::url::{canonical_post_url, post_slug};
