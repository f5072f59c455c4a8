//! Rate-limited HTTP fetcher
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a descriptive user agent string
//! - Exponential backoff with jitter on 429 and 5xx responses
//! - Honouring integer `Retry-After` hints
//! - Classifying permanent failures with a short body snippet
//!
//! Politeness pauses between successful requests are not applied here; call
//! sites own those (see `Politeness`).

use crate::config::{Config, RetryConfig, UserAgentConfig};
use crate::text::prefix_chars;
use crate::{FetchError, FetchResult};
use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, StatusCode};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

/// Accept header for the JSON API endpoints
pub const ACCEPT_JSON: &str = "application/json";

/// Accept header for rendered pages
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Characters of an error body kept for diagnostics
const SNIPPET_CHARS: usize = 200;

/// Only plain integer-second hints are honoured
static RETRY_AFTER_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("valid retry-after regex"));

/// Formats the identity header: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use comment_gleaner::config::UserAgentConfig;
/// use comment_gleaner::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CommentGleaner".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Backoff parameters, in wall-clock durations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub rate_limit_cap: Duration,
    pub server_error_cap: Duration,
    pub jitter_max: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay),
            rate_limit_cap: Duration::from_millis(config.rate_limit_cap),
            server_error_cap: Duration::from_millis(config.server_error_cap),
            jitter_max: Duration::from_millis(config.jitter_max),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// `base * 2^attempt`, capped
    pub fn backoff(&self, attempt: u32, cap: Duration) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(cap)
    }

    /// Wait before retrying a 429, jitter excluded
    ///
    /// Only our own backoff is capped; a longer server hint is honoured in full.
    pub fn rate_limit_wait(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.backoff(attempt, self.rate_limit_cap);
        hint.map_or(backoff, |hint| hint.max(backoff))
    }

    /// Wait before retrying a 5xx or transport failure, jitter excluded
    pub fn server_error_wait(&self, attempt: u32) -> Duration {
        self.backoff(attempt, self.server_error_cap)
    }

    fn jitter(&self) -> Duration {
        let max = self.jitter_max.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max))
    }
}

/// Parses a `Retry-After` header holding whole seconds
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let captures = RETRY_AFTER_SECONDS.captures(value)?;
    captures[1].parse::<u64>().ok().map(Duration::from_secs)
}

/// Sequential fetcher shared by the lister and the retrievers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from the user agent and retry sections of the config
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self::with_client(client, RetryPolicy::from(&config.retry)))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetches `url`, retrying transient failures, and returns the body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | 429 | Wait `max(Retry-After, backoff)` + jitter, retry |
    /// | 5xx | Wait backoff (lower cap) + jitter, retry |
    /// | Timeout / connection error | Same as 5xx |
    /// | Any other status | `FetchError::Fatal`, no retry |
    ///
    /// Exceeding the attempt ceiling yields `FetchError::ExhaustedRetries`.
    pub async fn fetch(&self, url: &str, accept: &str) -> FetchResult<String> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_status = None;

        for attempt in 0..max_attempts {
            let is_last = attempt + 1 >= max_attempts;
            tracing::debug!("GET {} (attempt {}/{})", url, attempt + 1, max_attempts);

            let response = match self.client.get(url).header(ACCEPT, accept).send().await {
                Ok(response) => response,
                Err(e) if e.is_builder() || e.is_redirect() => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    last_status = None;
                    if is_last {
                        break;
                    }
                    let wait = self.policy.server_error_wait(attempt) + self.policy.jitter();
                    tracing::warn!("Request to {} failed ({}), retrying in {:?}", url, e, wait);
                    tokio::time::sleep(wait).await;
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                match response.text().await {
                    Ok(body) => return Ok(body),
                    Err(e) => {
                        last_status = Some(status.as_u16());
                        if is_last {
                            break;
                        }
                        let wait = self.policy.server_error_wait(attempt) + self.policy.jitter();
                        tracing::warn!("Body of {} unreadable ({}), retrying in {:?}", url, e, wait);
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                }
            }

            last_status = Some(status.as_u16());

            let wait = if status == StatusCode::TOO_MANY_REQUESTS {
                let hint = parse_retry_after(response.headers());
                if let Some(hint) = hint.filter(|h| *h > self.policy.rate_limit_cap) {
                    tracing::warn!(
                        "Retry-After of {:?} from {} exceeds the {:?} backoff cap",
                        hint,
                        url,
                        self.policy.rate_limit_cap
                    );
                }
                self.policy.rate_limit_wait(attempt, hint)
            } else if status.is_server_error() {
                self.policy.server_error_wait(attempt)
            } else {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Fatal {
                    url: url.to_string(),
                    status: status.as_u16(),
                    snippet: prefix_chars(body.trim(), SNIPPET_CHARS).to_string(),
                });
            };

            if is_last {
                break;
            }

            let wait = wait + self.policy.jitter();
            tracing::warn!("HTTP {} from {}, retrying in {:?}", status.as_u16(), url, wait);
            tokio::time::sleep(wait).await;
        }

        Err(FetchError::ExhaustedRetries {
            url: url.to_string(),
            attempts: max_attempts,
            last_status,
        })
    }

    /// Fetches and parses a JSON document
    pub async fn fetch_json(&self, url: &str) -> FetchResult<Value> {
        let body = self.fetch(url, ACCEPT_JSON).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches a rendered HTML page
    pub async fn fetch_html(&self, url: &str) -> FetchResult<String> {
        self.fetch(url, ACCEPT_HTML).await
    }
}
