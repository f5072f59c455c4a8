//! Thread flattening and parent resolution
//!
//! A comment payload is a forest of nested replies. [`flatten`] walks it with
//! an explicit stack and produces the nodes as a flat list plus a
//! [`ParentIndex`] mapping each canonical id to its parent's canonical id.
//! Thread roots are resolved from that index with a bounded upward walk.

use crate::thread::node::{children_of, RawCommentNode};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Hard ceiling on parent hops when resolving a thread root
pub const MAX_PARENT_WALK: usize = 500;

/// A comment with its parent link resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FlatComment {
    /// Canonical id (`reply_id ?? object_id`)
    pub reply_id: Option<String>,
    pub object_id: Option<String>,
    /// Canonical id of the nearest ancestor, `None` for thread roots
    pub parent_reply_id: Option<String>,
    pub author_name: Option<String>,
    pub author_handle: Option<String>,
    pub body_raw: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub like_count: u64,
}

/// Child id -> parent id (`None` for roots), first sighting wins
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: HashMap<String, Option<String>>,
}

impl ParentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a parent link unless the id has been seen before
    ///
    /// Returns `true` when this is the first sighting.
    pub fn record(&mut self, id: &str, parent: Option<&str>) -> bool {
        if self.parents.contains_key(id) {
            return false;
        }
        self.parents
            .insert(id.to_string(), parent.map(str::to_string));
        true
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Single lookup; an absent entry means root
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).and_then(|p| p.as_deref())
    }

    /// Walks parent links up from `id` until a node without a parent
    ///
    /// Returns `None` when the walk exceeds [`MAX_PARENT_WALK`] hops, which
    /// only happens with cyclic or absurdly deep parent data.
    pub fn root_of(&self, id: &str) -> Option<String> {
        let mut current = id;
        for _ in 0..MAX_PARENT_WALK {
            match self.parent_of(current) {
                Some(parent) => current = parent,
                None => return Some(current.to_string()),
            }
        }
        tracing::debug!(id, "Parent walk hit the step ceiling, root unresolved");
        None
    }

    /// Resolves the thread root of a node
    ///
    /// When the node carries a reply id and an object id that differ, the
    /// object id already names the thread root. Otherwise the root is found by
    /// walking the index.
    pub fn thread_root(&self, node: &RawCommentNode) -> Option<String> {
        let resolved = node.canonical_id()?;

        if let Some(object_id) = node.object_id.as_deref() {
            if object_id != resolved {
                return Some(object_id.to_string());
            }
        }

        self.root_of(resolved)
    }

    /// Builds the flat view of a node using this index for its parent link
    pub fn flat_comment(&self, node: &RawCommentNode) -> FlatComment {
        let reply_id = node.canonical_id().map(str::to_string);
        let parent_reply_id = reply_id
            .as_deref()
            .and_then(|id| self.parent_of(id))
            .map(str::to_string);

        FlatComment {
            reply_id,
            object_id: node.object_id.clone(),
            parent_reply_id,
            author_name: node.author_name.clone(),
            author_handle: node.author_handle.clone(),
            body_raw: node.body.clone(),
            posted_at: node.posted_at,
            like_count: node.like_count,
        }
    }
}

/// Output of [`flatten`]
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    /// Every distinct node; order carries no meaning
    pub nodes: Vec<RawCommentNode>,
    pub parents: ParentIndex,
}

impl Flattened {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Flattens a forest of raw comment records
///
/// Nodes without any id are kept (they can still be matched and stored) but
/// cannot take part in parent bookkeeping. A node whose id was already seen is
/// emitted once; its children are still visited.
pub fn flatten(roots: &[Value]) -> Flattened {
    let mut out = Flattened::default();
    let mut emitted: HashSet<String> = HashSet::new();

    // (record, canonical id of nearest ancestor)
    let mut stack: Vec<(&Value, Option<String>)> =
        roots.iter().rev().map(|root| (root, None)).collect();

    while let Some((value, parent)) = stack.pop() {
        let Some(node) = RawCommentNode::project(value) else {
            continue;
        };

        let id = node.canonical_id().map(str::to_string);
        if let Some(id) = id.as_deref() {
            out.parents.record(id, parent.as_deref());
        }

        let children_parent = id.clone().or(parent);
        for child in children_of(value).iter().rev() {
            stack.push((child, children_parent.clone()));
        }

        let first_sighting = match id {
            Some(id) => emitted.insert(id),
            None => true,
        };
        if first_sighting {
            out.nodes.push(node);
        }
    }

    out
}
