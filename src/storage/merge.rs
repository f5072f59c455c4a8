//! De-duplicating merge of crawl results
//!
//! Records are identified by post URL, comment id and a text prefix. Raw
//! comment ids are sometimes missing, so the text takes part in identity.
//! The first record seen under a key wins, which makes stored rows
//! authoritative over freshly fetched ones.

use crate::storage::OutputRecord;
use crate::text::prefix_chars;
use std::collections::HashSet;

/// Number of leading text characters that take part in record identity
pub const DEDUP_TEXT_CHARS: usize = 200;

/// Identity key of a record: `postUrl||commentId||textPrefix`
pub fn dedup_key(record: &OutputRecord) -> String {
    format!(
        "{}||{}||{}",
        record.post_url,
        record.comment_id.as_deref().unwrap_or(""),
        prefix_chars(&record.text, DEDUP_TEXT_CHARS)
    )
}

/// Merges `new` into `existing`, keeping the first record under each key
///
/// Order is preserved: surviving existing records first, then surviving new
/// ones in the order they were fetched.
pub fn merge(existing: Vec<OutputRecord>, new: Vec<OutputRecord>) -> Vec<OutputRecord> {
    let mut seen = HashSet::with_capacity(existing.len() + new.len());
    let mut merged = Vec::with_capacity(existing.len() + new.len());

    for record in existing.into_iter().chain(new) {
        if seen.insert(dedup_key(&record)) {
            merged.push(record);
        }
    }

    merged
}
