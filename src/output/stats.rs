//! Statistics over the persisted dataset
//!
//! This module provides functionality for summarising a stored dataset and
//! displaying the summary.

use crate::storage::{OutputDataset, Storage, StorageResult};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

/// Number of posts listed in the top-posts table
const TOP_POSTS: usize = 10;

/// Matched-comment count for one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCount {
    pub post_url: String,
    pub post_title: Option<String>,
    pub records: usize,
}

/// Dataset statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStatistics {
    pub generated_at: DateTime<Utc>,
    pub source_url: String,

    /// Total number of stored records
    pub total_records: usize,

    /// Distinct posts with at least one record
    pub posts_covered: usize,

    /// Records that are replies rather than thread roots
    pub replies: usize,

    /// Records without a comment id
    pub records_without_id: usize,

    pub total_likes: u64,

    /// Oldest and newest comment dates among records that carry one
    pub earliest_comment: Option<DateTime<Utc>>,
    pub latest_comment: Option<DateTime<Utc>>,

    /// Posts with the most records, descending
    pub top_posts: Vec<PostCount>,
}

/// Summarises a dataset
pub fn compute_statistics(dataset: &OutputDataset) -> DatasetStatistics {
    let mut per_post: HashMap<&str, PostCount> = HashMap::new();
    let mut replies = 0;
    let mut records_without_id = 0;
    let mut total_likes = 0u64;
    let mut earliest: Option<i64> = None;
    let mut latest: Option<i64> = None;

    for record in &dataset.rows {
        per_post
            .entry(record.post_url.as_str())
            .or_insert_with(|| PostCount {
                post_url: record.post_url.clone(),
                post_title: record.post_title.clone(),
                records: 0,
            })
            .records += 1;

        if record.parent_comment_id.is_some() {
            replies += 1;
        }
        if record.comment_id.is_none() {
            records_without_id += 1;
        }
        total_likes = total_likes.saturating_add(record.likes);

        if let Some(ms) = record.comment_date_ms {
            earliest = Some(earliest.map_or(ms, |e| e.min(ms)));
            latest = Some(latest.map_or(ms, |l| l.max(ms)));
        }
    }

    let posts_covered = per_post.len();
    let mut top_posts: Vec<PostCount> = per_post.into_values().collect();
    top_posts.sort_by(|a, b| {
        b.records
            .cmp(&a.records)
            .then_with(|| a.post_url.cmp(&b.post_url))
    });
    top_posts.truncate(TOP_POSTS);

    let to_datetime = |ms: i64| Utc.timestamp_millis_opt(ms).single();

    DatasetStatistics {
        generated_at: dataset.generated_at,
        source_url: dataset.source_url.clone(),
        total_records: dataset.rows.len(),
        posts_covered,
        replies,
        records_without_id,
        total_likes,
        earliest_comment: earliest.and_then(to_datetime),
        latest_comment: latest.and_then(to_datetime),
        top_posts,
    }
}

/// Loads statistics from storage
///
/// # Returns
///
/// * `Ok(Some(DatasetStatistics))` - Statistics of the stored dataset
/// * `Ok(None)` - No dataset has been written yet
/// * `Err(StorageError)` - The dataset could not be read
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<Option<DatasetStatistics>> {
    Ok(storage.load_dataset()?.as_ref().map(compute_statistics))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Overview:");
    println!("  Source: {}", stats.source_url);
    println!("  Generated at: {}", stats.generated_at.to_rfc3339());
    println!("  Total records: {}", stats.total_records);
    println!("  Posts covered: {}", stats.posts_covered);
    println!("  Replies: {}", stats.replies);
    println!("  Records without comment id: {}", stats.records_without_id);
    println!("  Total likes: {}", stats.total_likes);
    println!();

    if let (Some(earliest), Some(latest)) = (stats.earliest_comment, stats.latest_comment) {
        println!("Comment Dates:");
        println!("  Earliest: {}", earliest.to_rfc3339());
        println!("  Latest: {}", latest.to_rfc3339());
        println!();
    }

    if !stats.top_posts.is_empty() {
        println!("Top Posts by Matched Comments:");
        for post in &stats.top_posts {
            let label = post.post_title.as_deref().unwrap_or(&post.post_url);
            println!("  {:>5}  {}", post.records, label);
        }
        println!();
    }
}
