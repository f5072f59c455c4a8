use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides (`GLEAN_*`) are applied after parsing and before
/// validation, so an override can also fix up a value the file leaves invalid.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, override, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parses TOML content into a Config without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies `GLEAN_*` overrides using the given variable lookup
///
/// | Variable                | Field                          |
/// |-------------------------|--------------------------------|
/// | `GLEAN_BASE_URL`        | `source.base-url`              |
/// | `GLEAN_TARGET_NAME`     | `target.name`                  |
/// | `GLEAN_TARGET_HANDLE`   | `target.handle`                |
/// | `GLEAN_MAX_POSTS`       | `crawler.max-posts-per-run`    |
/// | `GLEAN_POLITENESS_MS`   | `crawler.politeness-delay`     |
/// | `GLEAN_PAGE_BATCH`      | `crawler.page-batch-size`      |
/// | `GLEAN_MAX_TOTAL_POSTS` | `crawler.max-total-posts`      |
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("GLEAN_BASE_URL") {
        config.source.base_url = v.trim().to_string();
    }
    if let Some(v) = get("GLEAN_TARGET_NAME") {
        config.target.name = Some(v);
    }
    if let Some(v) = get("GLEAN_TARGET_HANDLE") {
        config.target.handle = Some(v);
    }
    if let Some(v) = get("GLEAN_MAX_POSTS") {
        config.crawler.max_posts_per_run = parse_override("GLEAN_MAX_POSTS", &v)?;
    }
    if let Some(v) = get("GLEAN_POLITENESS_MS") {
        config.crawler.politeness_delay = parse_override("GLEAN_POLITENESS_MS", &v)?;
    }
    if let Some(v) = get("GLEAN_PAGE_BATCH") {
        config.crawler.page_batch_size = parse_override("GLEAN_PAGE_BATCH", &v)?;
    }
    if let Some(v) = get("GLEAN_MAX_TOTAL_POSTS") {
        config.crawler.max_total_posts = parse_override("GLEAN_MAX_TOTAL_POSTS", &v)?;
    }

    Ok(())
}

fn parse_override<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
        })
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs against a changed config are easy to spot.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
