//! Politeness pauses between requests
//!
//! The crawler issues one request at a time. After every index page and every
//! post it waits a configured base delay plus a random jitter, keeping the
//! request cadence below the source's abuse thresholds.

use crate::config::CrawlerConfig;
use rand::Rng;
use std::time::Duration;

/// Base delay plus uniform jitter in `0..=jitter_max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Politeness {
    base: Duration,
    jitter_max: Duration,
}

impl Politeness {
    pub fn new(base: Duration, jitter_max: Duration) -> Self {
        Self { base, jitter_max }
    }

    /// Pause applied after each index page
    pub fn for_pages(config: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.politeness_delay),
            Duration::from_millis(config.page_jitter_max),
        )
    }

    /// Pause applied after each post
    pub fn for_posts(config: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.politeness_delay),
            Duration::from_millis(config.post_jitter_max),
        )
    }

    /// No pause at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Picks the next pause length
    pub fn next_delay(&self) -> Duration {
        let max = self.jitter_max.as_millis() as u64;
        let jitter = if max == 0 {
            0
        } else {
            rand::rng().random_range(0..=max)
        };
        self.base + Duration::from_millis(jitter)
    }

    /// Sleeps for one pause
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
