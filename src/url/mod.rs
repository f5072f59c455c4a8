//! URL handling module for Comment-Gleaner
//!
//! This module provides post URL canonicalisation, slug extraction for the id
//! lookup endpoint, and the permalink shapes used in output records.

mod normalize;
mod slug;

pub use normalize::canonical_post_url;
pub use slug::post_slug;

/// Builds the permalink of a comment under a post
///
/// # Examples
///
/// ```
/// use comment_gleaner::url::comment_url;
///
/// assert_eq!(
///     comment_url("https://example.substack.com/p/a-post", "42"),
///     "https://example.substack.com/p/a-post/comment/42"
/// );
/// ```
pub fn comment_url(post_url: &str, comment_id: &str) -> String {
    format!("{}/comment/{}", post_url.trim_end_matches('/'), comment_id)
}

/// Address of the rendered comments page of a post
pub fn rendered_comments_url(post_url: &str) -> String {
    format!("{}/comments", post_url.trim_end_matches('/'))
}
