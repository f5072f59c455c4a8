//! Target identity matching

use crate::config::TargetConfig;
use crate::thread::node::RawCommentNode;

/// Decides whether a comment was written by the target identity
///
/// A comment matches when its display name equals the target name
/// (whitespace-collapsed, case-sensitive) or its handle equals the target
/// handle (lower-cased, leading `@` removed). Either is enough, since the
/// source populates one or the other inconsistently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorMatcher {
    name: Option<String>,
    handle: Option<String>,
}

impl AuthorMatcher {
    pub fn new(name: Option<&str>, handle: Option<&str>) -> Self {
        Self {
            name: name.map(normalize_name).filter(|n| !n.is_empty()),
            handle: handle.map(normalize_handle).filter(|h| !h.is_empty()),
        }
    }

    pub fn from_target(target: &TargetConfig) -> Self {
        Self::new(target.name.as_deref(), target.handle.as_deref())
    }

    pub fn matches(&self, node: &RawCommentNode) -> bool {
        self.matches_fields(node.author_name.as_deref(), node.author_handle.as_deref())
    }

    pub fn matches_fields(&self, name: Option<&str>, handle: Option<&str>) -> bool {
        let name_match = match (&self.name, name) {
            (Some(target), Some(candidate)) => *target == normalize_name(candidate),
            _ => false,
        };

        let handle_match = match (&self.handle, handle) {
            (Some(target), Some(candidate)) => *target == normalize_handle(candidate),
            _ => false,
        };

        name_match || handle_match
    }

    /// Normalized target name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Normalized target handle, if any
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }
}

/// Collapses whitespace runs to a single space and trims
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cases and strips surrounding whitespace and a leading `@`
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').trim().to_lowercase()
}
