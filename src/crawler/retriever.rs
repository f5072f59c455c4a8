//! Comment retrieval for a single post
//!
//! The structured JSON endpoint is preferred. It needs the post's internal id,
//! which is resolved through a lookup keyed by the URL slug. When enabled, the
//! rendered comments page serves as a lossy fallback for posts whose JSON
//! endpoint fails permanently.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::lister::{api_root, DocumentReference};
use crate::crawler::rendered::parse_rendered_comments;
use crate::thread::fields::{first_array, first_id};
use crate::url::{post_slug, rendered_comments_url};
use crate::{FetchError, FetchResult};
use serde_json::Value;
use std::fmt;
use url::Url;

const POST_ID_KEYS: &[&str] = &["id", "post.id", "post_id"];
const COMMENT_WRAPPER_KEYS: &[&str] = &["comments"];

/// Where a post's comments came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSource {
    Json,
    Rendered,
}

impl fmt::Display for CommentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Rendered => write!(f, "rendered"),
        }
    }
}

/// Raw comment roots of one post
#[derive(Debug, Clone)]
pub struct RetrievedComments {
    pub roots: Vec<Value>,
    pub source: CommentSource,
}

/// URL of the id lookup for a slug
pub fn post_lookup_url(base: &Url, slug: &str) -> String {
    format!("{}/api/v1/posts/{}", api_root(base), slug)
}

/// URL of the full comment payload for a post id
pub fn comments_url(base: &Url, post_id: &str) -> String {
    format!(
        "{}/api/v1/post/{}/comments?all_comments=true&sort=oldest_first",
        api_root(base),
        post_id
    )
}

/// Fetches post ids and comment payloads
pub struct CommentRetriever<'a> {
    fetcher: &'a Fetcher,
    base: Url,
    rendered_fallback: bool,
}

impl<'a> CommentRetriever<'a> {
    pub fn new(fetcher: &'a Fetcher, base: Url, rendered_fallback: bool) -> Self {
        Self {
            fetcher,
            base,
            rendered_fallback,
        }
    }

    /// Resolves the internal id of a post
    ///
    /// `Ok(None)` when the URL has no slug or the lookup carries no id; the
    /// caller skips such posts.
    pub async fn resolve_post_id(&self, document: &DocumentReference) -> FetchResult<Option<String>> {
        let slug = match post_slug(&document.url) {
            Ok(slug) => slug,
            Err(e) => {
                tracing::debug!("No slug for {}: {}", document.url, e);
                return Ok(None);
            }
        };

        let payload = self
            .fetcher
            .fetch_json(&post_lookup_url(&self.base, &slug))
            .await?;
        Ok(first_id(&payload, POST_ID_KEYS))
    }

    /// Fetches all comment roots of a post in one call
    pub async fn comments(
        &self,
        document: &DocumentReference,
        post_id: &str,
    ) -> FetchResult<RetrievedComments> {
        match self.json_comments(post_id).await {
            Ok(roots) => Ok(RetrievedComments {
                roots,
                source: CommentSource::Json,
            }),
            Err(e) if self.rendered_fallback => {
                tracing::warn!(
                    "JSON comments unavailable for {} ({}), trying rendered page",
                    document.url,
                    e
                );
                let roots = self.rendered_comments(document).await?;
                Ok(RetrievedComments {
                    roots,
                    source: CommentSource::Rendered,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn json_comments(&self, post_id: &str) -> FetchResult<Vec<Value>> {
        let url = comments_url(&self.base, post_id);
        let payload = self.fetcher.fetch_json(&url).await?;
        comment_roots(payload).ok_or_else(|| FetchError::Malformed {
            url,
            message: "comment payload is neither an array nor an object with comments"
                .to_string(),
        })
    }

    async fn rendered_comments(&self, document: &DocumentReference) -> FetchResult<Vec<Value>> {
        let html = self
            .fetcher
            .fetch_html(&rendered_comments_url(&document.url))
            .await?;
        Ok(parse_rendered_comments(&html))
    }
}

/// Roots of a comment payload: a bare array or one wrapped under `comments`
fn comment_roots(payload: Value) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(_) => Some(
            first_array(&payload, COMMENT_WRAPPER_KEYS)
                .cloned()
                .unwrap_or_default(),
        ),
        _ => None,
    }
}
