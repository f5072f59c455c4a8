//! Typed projection of one raw comment record
//!
//! Payloads arrive as untyped JSON; [`RawCommentNode::project`] is the only
//! place that knows which keys the source has used for each field.

use crate::thread::fields::{first_array, first_count, first_id, first_string, first_timestamp};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Keys holding the specific reply's identifier, often absent on roots
pub const REPLY_ID_KEYS: &[&str] = &["reply_id", "replyId", "comment_id", "commentId"];

/// Keys holding the object identifier (the reply itself or its thread root)
pub const OBJECT_ID_KEYS: &[&str] = &["id", "object_id", "objectId"];

/// Keys under which nested replies may appear, probed in order
pub const CHILD_KEYS: &[&str] = &["children", "replies", "comments", "child_comments"];

const AUTHOR_NAME_KEYS: &[&str] = &[
    "name",
    "author_name",
    "authorName",
    "user.name",
    "author.name",
    "commenter.name",
    "user.display_name",
];

const AUTHOR_HANDLE_KEYS: &[&str] = &[
    "handle",
    "user_handle",
    "author_handle",
    "authorHandle",
    "user.handle",
    "author.handle",
    "commenter.handle",
    "username",
    "user.username",
];

const BODY_KEYS: &[&str] = &["body_html", "bodyHtml", "body", "content", "text", "html"];

const POSTED_AT_KEYS: &[&str] = &["date", "created_at", "createdAt", "posted_at", "timestamp"];

const LIKE_COUNT_KEYS: &[&str] = &[
    "reaction_count",
    "reactionCount",
    "like_count",
    "likeCount",
    "likes",
];

/// One comment as read from the source, without its children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCommentNode {
    pub reply_id: Option<String>,
    pub object_id: Option<String>,
    pub author_name: Option<String>,
    pub author_handle: Option<String>,
    pub body: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub like_count: u64,
}

impl RawCommentNode {
    /// Projects a raw record; returns `None` for anything that is not an object
    pub fn project(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        Some(Self {
            reply_id: first_id(value, REPLY_ID_KEYS),
            object_id: first_id(value, OBJECT_ID_KEYS),
            author_name: first_string(value, AUTHOR_NAME_KEYS),
            author_handle: first_string(value, AUTHOR_HANDLE_KEYS),
            body: first_string(value, BODY_KEYS),
            posted_at: first_timestamp(value, POSTED_AT_KEYS),
            like_count: like_count(value),
        })
    }

    /// Id used for parent bookkeeping: the reply id, else the object id
    pub fn canonical_id(&self) -> Option<&str> {
        self.reply_id.as_deref().or(self.object_id.as_deref())
    }
}

/// Nested replies of a raw record; the first non-empty child key wins
pub fn children_of(value: &Value) -> &[Value] {
    first_array(value, CHILD_KEYS)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Explicit counts first, then the sum of a `reactions` map such as `{"❤": 3}`
fn like_count(value: &Value) -> u64 {
    if let Some(count) = first_count(value, LIKE_COUNT_KEYS) {
        return count;
    }

    value
        .get("reactions")
        .and_then(Value::as_object)
        .map(|reactions| reactions.values().filter_map(Value::as_u64).sum())
        .unwrap_or(0)
}
