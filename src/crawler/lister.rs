//! Paginated discovery of posts from the archive index
//!
//! The index is read one page at a time and handed out lazily, one
//! `DocumentReference` per call. Paging stops on the first empty page, at the
//! requested document count, or at the page budget of an incremental run.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::politeness::Politeness;
use crate::thread::fields::{first_array, first_string, first_timestamp};
use crate::url::canonical_post_url;
use crate::{FetchError, FetchResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use url::Url;

const URL_KEYS: &[&str] = &["canonical_url", "url"];
const SLUG_KEYS: &[&str] = &["slug"];
const TITLE_KEYS: &[&str] = &["title"];
const DATE_KEYS: &[&str] = &["post_date", "published_at", "date"];
const PAGE_WRAPPER_KEYS: &[&str] = &["posts"];

/// A post discovered on the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    pub url: String,
    pub title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl DocumentReference {
    /// Projects one index entry; `None` when no post URL can be derived
    pub fn from_summary(summary: &Value, base: &Url) -> Option<Self> {
        let raw = first_string(summary, URL_KEYS).or_else(|| {
            first_string(summary, SLUG_KEYS).map(|slug| format!("/p/{}", slug))
        })?;

        let url = match canonical_post_url(&raw, base) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping index entry with unusable URL {}: {}", raw, e);
                return None;
            }
        };

        Some(Self {
            url,
            title: first_string(summary, TITLE_KEYS),
            published_at: first_timestamp(summary, DATE_KEYS),
        })
    }
}

/// Root of the JSON API for a publication, without trailing slash
pub fn api_root(base: &Url) -> &str {
    base.as_str().trim_end_matches('/')
}

/// URL of one index page
pub fn index_page_url(base: &Url, offset: u64, limit: u32) -> String {
    format!(
        "{}/api/v1/archive?sort=new&offset={}&limit={}",
        api_root(base),
        offset,
        limit
    )
}

/// Lazy, bounded reader over the archive index
pub struct DocumentLister<'a> {
    fetcher: &'a Fetcher,
    base: Url,
    page_size: u32,
    politeness: Politeness,

    /// Offset of the next page to request
    offset: u64,
    /// Index position just after the last consumed entry
    cursor: u64,
    /// Buffered entries of the current page with their index position
    buffer: VecDeque<(u64, Option<DocumentReference>)>,

    max_count: usize,
    max_pages: Option<u32>,
    pages_fetched: u32,
    yielded: usize,
    exhausted: bool,
}

impl<'a> DocumentLister<'a> {
    /// Creates a lister starting at `start_offset`
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetcher
    /// * `base` - Publication base URL
    /// * `start_offset` - First index position to read (0, or a persisted offset)
    /// * `page_size` - Entries requested per index page
    /// * `max_count` - Upper bound on documents handed out
    pub fn new(
        fetcher: &'a Fetcher,
        base: Url,
        start_offset: u64,
        page_size: u32,
        max_count: usize,
    ) -> Self {
        Self {
            fetcher,
            base,
            page_size: page_size.max(1),
            politeness: Politeness::none(),
            offset: start_offset,
            cursor: start_offset,
            buffer: VecDeque::new(),
            max_count,
            max_pages: None,
            pages_fetched: 0,
            yielded: 0,
            exhausted: false,
        }
    }

    /// Limits how many index pages this lister may request
    pub fn with_page_limit(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Pause applied after every index page
    pub fn with_politeness(mut self, politeness: Politeness) -> Self {
        self.politeness = politeness;
        self
    }

    /// Next document, `Ok(None)` once the listing is finished
    ///
    /// An error means the current page could not be read; the documents
    /// already handed out and `cursor()` remain valid.
    pub async fn next_document(&mut self) -> FetchResult<Option<DocumentReference>> {
        loop {
            if self.yielded >= self.max_count {
                return Ok(None);
            }

            if let Some((position, entry)) = self.buffer.pop_front() {
                self.cursor = position;
                match entry {
                    Some(document) => {
                        self.yielded += 1;
                        return Ok(Some(document));
                    }
                    None => continue,
                }
            }

            if self.exhausted || self.page_budget_spent() {
                return Ok(None);
            }

            self.fetch_page().await?;
        }
    }

    /// Index position to resume from after this listing
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// True once the index returned an empty page
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn documents_yielded(&self) -> usize {
        self.yielded
    }

    fn page_budget_spent(&self) -> bool {
        self.max_pages
            .is_some_and(|max_pages| self.pages_fetched >= max_pages)
    }

    async fn fetch_page(&mut self) -> FetchResult<()> {
        let url = index_page_url(&self.base, self.offset, self.page_size);
        let payload = self.fetcher.fetch_json(&url).await?;
        self.pages_fetched += 1;

        let entries = page_entries(&payload).ok_or_else(|| FetchError::Malformed {
            url: url.clone(),
            message: "index page is neither an array nor an object with posts".to_string(),
        })?;

        tracing::debug!(
            "Index page at offset {} returned {} entries",
            self.offset,
            entries.len()
        );

        if entries.is_empty() {
            self.exhausted = true;
        } else {
            for entry in entries {
                self.offset += 1;
                let document = DocumentReference::from_summary(entry, &self.base);
                if document.is_none() {
                    tracing::debug!("Skipping index entry at {} without a post URL", self.offset - 1);
                }
                self.buffer.push_back((self.offset, document));
            }
        }

        self.politeness.pause().await;
        Ok(())
    }
}

/// Entries of an index page: a bare array or one wrapped under `posts`
fn page_entries(payload: &Value) -> Option<&[Value]> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(_) => Some(
            first_array(payload, PAGE_WRAPPER_KEYS)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        ),
        _ => None,
    }
}

/// Reads up to `max_count` documents from the start of the index
///
/// A page failure ends the listing early; whatever was read before it is
/// returned.
pub async fn list_documents(
    fetcher: &Fetcher,
    base: Url,
    page_size: u32,
    max_count: usize,
    politeness: Politeness,
) -> Vec<DocumentReference> {
    let mut lister =
        DocumentLister::new(fetcher, base, 0, page_size, max_count).with_politeness(politeness);
    let mut documents = Vec::new();

    loop {
        match lister.next_document().await {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Index listing stopped early: {}", e);
                break;
            }
        }
    }

    documents
}
