use serde::Deserialize;

/// Main configuration structure for Comment-Gleaner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// The newsletter being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base address of the publication, e.g. `https://example.substack.com`
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// The identity whose comments are kept
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Display name, matched case-sensitively after whitespace collapsing
    #[serde(default)]
    pub name: Option<String>,

    /// Handle, matched case-insensitively with any leading `@` removed
    #[serde(default)]
    pub handle: Option<String>,
}

/// Crawl pacing and bounds
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of posts processed in a single run
    #[serde(rename = "max-posts-per-run")]
    pub max_posts_per_run: usize,

    /// Base politeness pause after every request batch (milliseconds)
    #[serde(rename = "politeness-delay")]
    pub politeness_delay: u64,

    /// Upper bound of the random jitter added after an index page (milliseconds)
    #[serde(rename = "page-jitter-max", default = "default_page_jitter")]
    pub page_jitter_max: u64,

    /// Upper bound of the random jitter added after a post (milliseconds)
    #[serde(rename = "post-jitter-max", default = "default_post_jitter")]
    pub post_jitter_max: u64,

    /// Number of posts requested per index page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Resume paging from persisted crawl state across runs
    #[serde(default)]
    pub incremental: bool,

    /// Index pages fetched per run when running incrementally
    #[serde(rename = "page-batch-size", default = "default_page_batch_size")]
    pub page_batch_size: u32,

    /// Cumulative posts after which the crawl is considered complete
    #[serde(rename = "max-total-posts", default = "default_max_total_posts")]
    pub max_total_posts: u64,

    /// Scrape the rendered comments page when the JSON endpoint is unavailable
    #[serde(rename = "rendered-fallback", default)]
    pub rendered_fallback: bool,
}

/// Backoff behaviour of the fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff step in milliseconds, doubled per attempt
    #[serde(rename = "base-delay", default = "default_base_delay")]
    pub base_delay: u64,

    /// Backoff ceiling for HTTP 429 (milliseconds)
    #[serde(rename = "rate-limit-cap", default = "default_rate_limit_cap")]
    pub rate_limit_cap: u64,

    /// Backoff ceiling for HTTP 5xx and transport errors (milliseconds)
    #[serde(rename = "server-error-cap", default = "default_server_error_cap")]
    pub server_error_cap: u64,

    #[serde(rename = "jitter-max", default = "default_retry_jitter")]
    pub jitter_max: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            rate_limit_cap: default_rate_limit_cap(),
            server_error_cap: default_server_error_cap(),
            jitter_max: default_retry_jitter(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON dataset file
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Path to the JSON crawl state file
    #[serde(rename = "state-path")]
    pub state_path: String,
}

fn default_page_jitter() -> u64 {
    350
}

fn default_post_jitter() -> u64 {
    600
}

fn default_page_size() -> u32 {
    12
}

fn default_page_batch_size() -> u32 {
    5
}

fn default_max_total_posts() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    8
}

fn default_base_delay() -> u64 {
    1000
}

fn default_rate_limit_cap() -> u64 {
    120_000
}

fn default_server_error_cap() -> u64 {
    30_000
}

fn default_retry_jitter() -> u64 {
    1000
}
