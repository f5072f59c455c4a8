//! Configuration module for Comment-Gleaner
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! with the invocation parameters overridable from the environment.
//!
//! # Example
//!
//! ```no_run
//! use comment_gleaner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gleaner.toml")).unwrap();
//! println!("Crawling {}", config.source.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SourceConfig, TargetConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
