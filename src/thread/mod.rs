//! Comment thread handling
//!
//! This module turns loosely shaped comment payloads into typed nodes,
//! flattens nested reply trees while reconstructing parent links, and decides
//! which comments belong to the target identity.
//!
//! # Components
//!
//! - `RawCommentNode`: typed projection of one source record
//! - `flatten` / `ParentIndex`: explicit-stack traversal and thread-root resolution
//! - `AuthorMatcher`: display name / handle matching

mod author;
pub mod fields;
mod flatten;
mod node;

pub use author::{normalize_handle, normalize_name, AuthorMatcher};
pub use flatten::{flatten, FlatComment, Flattened, ParentIndex, MAX_PARENT_WALK};
pub use node::{children_of, RawCommentNode, CHILD_KEYS, OBJECT_ID_KEYS, REPLY_ID_KEYS};
