//! Record assembly: one matched comment becomes one `OutputRecord`

use crate::crawler::lister::DocumentReference;
use crate::storage::OutputRecord;
use crate::text::to_plain_text;
use crate::thread::{AuthorMatcher, Flattened, ParentIndex, RawCommentNode};
use crate::url::comment_url;

/// Builds the persisted record for a comment of `document`
pub fn assemble_record(
    document: &DocumentReference,
    post_id: Option<&str>,
    node: &RawCommentNode,
    parents: &ParentIndex,
) -> OutputRecord {
    let flat = parents.flat_comment(node);
    let top_level = parents.thread_root(node);
    let link = |id: &Option<String>| id.as_deref().map(|id| comment_url(&document.url, id));

    OutputRecord {
        post_url: document.url.clone(),
        post_title: document.title.clone(),
        post_id: post_id.map(str::to_string),
        comment_url: link(&flat.reply_id),
        top_level_comment_url: link(&top_level),
        parent_comment_url: link(&flat.parent_reply_id),
        comment_id: flat.reply_id,
        top_level_comment_id: top_level,
        parent_comment_id: flat.parent_reply_id,
        comment_date_ms: flat.posted_at.map(|at| at.timestamp_millis()),
        likes: flat.like_count,
        text: to_plain_text(flat.body_raw.as_deref().unwrap_or_default()),
    }
}

/// Records for every comment in `flattened` written by the target identity
pub fn matching_records(
    document: &DocumentReference,
    post_id: Option<&str>,
    flattened: &Flattened,
    matcher: &AuthorMatcher,
) -> Vec<OutputRecord> {
    flattened
        .nodes
        .iter()
        .filter(|node| matcher.matches(node))
        .map(|node| assemble_record(document, post_id, node, &flattened.parents))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::flatten;
    use serde_json::json;

    fn document() -> DocumentReference {
        DocumentReference {
            url: "https://example.substack.com/p/post".to_string(),
            title: Some("Post".to_string()),
            published_at: None,
        }
    }

    #[test]
    fn test_root_record() {
        let roots = vec![json!({
            "id": 10,
            "name": "Jane",
            "body": "<p>Hello <b>there</b></p>",
            "date": "2024-01-02T03:04:05Z",
            "reaction_count": 4
        })];
        let flat = flatten(&roots);
        let matcher = AuthorMatcher::new(Some("Jane"), None);

        let records = matching_records(&document(), Some("555"), &flat, &matcher);
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.post_id.as_deref(), Some("555"));
        assert_eq!(r.post_title.as_deref(), Some("Post"));
        assert_eq!(r.comment_id.as_deref(), Some("10"));
        assert_eq!(r.top_level_comment_id.as_deref(), Some("10"));
        assert!(r.parent_comment_id.is_none());
        assert!(r.parent_comment_url.is_none());
        assert_eq!(
            r.comment_url.as_deref(),
            Some("https://example.substack.com/p/post/comment/10")
        );
        assert_eq!(r.comment_date_ms, Some(1_704_164_645_000));
        assert_eq!(r.likes, 4);
        assert_eq!(r.text, "Hello there");
    }

    #[test]
    fn test_reply_record_links_parent_and_root() {
        let roots = vec![json!({
            "id": 1,
            "name": "Someone",
            "body": "root",
            "children": [{
                "id": 2,
                "name": "Other",
                "body": "middle",
                "children": [{ "id": 3, "handle": "@Jane", "body": "deep reply" }]
            }]
        })];
        let flat = flatten(&roots);
        let matcher = AuthorMatcher::new(None, Some("jane"));

        let records = matching_records(&document(), Some("9"), &flat, &matcher);
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.comment_id.as_deref(), Some("3"));
        assert_eq!(r.parent_comment_id.as_deref(), Some("2"));
        assert_eq!(r.top_level_comment_id.as_deref(), Some("1"));
        assert_eq!(
            r.parent_comment_url.as_deref(),
            Some("https://example.substack.com/p/post/comment/2")
        );
        assert_eq!(
            r.top_level_comment_url.as_deref(),
            Some("https://example.substack.com/p/post/comment/1")
        );
    }

    #[test]
    fn test_object_id_fast_path_names_root() {
        let roots = vec![json!({
            "reply_id": "r-7",
            "id": "root-1",
            "name": "Jane",
            "body": "reply carrying its thread id"
        })];
        let flat = flatten(&roots);
        let matcher = AuthorMatcher::new(Some("Jane"), None);

        let records = matching_records(&document(), None, &flat, &matcher);
        assert_eq!(records[0].comment_id.as_deref(), Some("r-7"));
        assert_eq!(records[0].top_level_comment_id.as_deref(), Some("root-1"));
        assert!(records[0].post_id.is_none());
    }

    #[test]
    fn test_idless_comment_has_null_links() {
        let roots = vec![json!({ "name": "Jane", "body": "anonymous id" })];
        let flat = flatten(&roots);
        let matcher = AuthorMatcher::new(Some("Jane"), None);

        let records = matching_records(&document(), None, &flat, &matcher);
        assert_eq!(records.len(), 1);
        assert!(records[0].comment_id.is_none());
        assert!(records[0].comment_url.is_none());
        assert!(records[0].top_level_comment_id.is_none());
        assert!(records[0].comment_date_ms.is_none());
    }

    #[test]
    fn test_missing_body_is_empty_text() {
        let roots = vec![json!({ "id": 1, "name": "Jane" })];
        let flat = flatten(&roots);
        let matcher = AuthorMatcher::new(Some("Jane"), None);

        let records = matching_records(&document(), None, &flat, &matcher);
        assert_eq!(records[0].text, "");
    }
}
