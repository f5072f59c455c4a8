//! Crawler coordinator - main crawl orchestration logic
//!
//! One run is strictly sequential:
//! 1. Load the stored dataset and, for incremental crawls, the crawl state
//! 2. Page through the index from the resumption offset
//! 3. For each post: resolve its id, fetch comments, flatten, match, assemble
//! 4. Merge the new records into the stored rows
//! 5. Persist the dataset, then the crawl state
//!
//! Failures on one post skip that post. A failing index page ends the
//! listing early, but whatever was collected is still persisted. Only storage
//! failures abort the run.

use crate::config::Config;
use crate::crawler::assemble::matching_records;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::lister::{api_root, DocumentLister, DocumentReference};
use crate::crawler::politeness::Politeness;
use crate::crawler::retriever::{CommentRetriever, CommentSource};
use crate::state::CrawlState;
use crate::storage::{
    merge, open_storage, JsonFileStorage, OutputDataset, OutputRecord, Storage, StorageError,
    TargetIdentity,
};
use crate::thread::{flatten, AuthorMatcher};
use crate::{ConfigError, FetchResult, Result};
use chrono::Utc;
use std::time::Instant;
use url::Url;

/// What the next run would do, derived from config and stored state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPlan {
    pub start_offset: u64,
    pub max_documents: usize,
    /// Index page budget, set for incremental runs
    pub max_pages: Option<u32>,
    /// Stored state says the index was already fully crawled
    pub already_complete: bool,
    pub state: Option<CrawlState>,
}

/// Summary of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub pages_fetched: u32,
    pub documents_seen: usize,
    pub documents_skipped: usize,
    pub comments_scanned: usize,
    /// Matching comments found in this run, before de-duplication
    pub records_matched: usize,
    /// Net growth of the dataset
    pub records_added: usize,
    pub total_records: usize,
    /// Set when index paging stopped on an error
    pub index_error: Option<String>,
    /// The crawl was already complete; only timestamps were refreshed
    pub already_complete: bool,
    /// Persisted crawl state, for incremental runs
    pub state: Option<CrawlState>,
}

/// Outcome of processing one post
enum DocumentOutcome {
    Skipped,
    Processed {
        comments: usize,
        records: Vec<OutputRecord>,
        source: CommentSource,
    },
}

/// Main crawler coordinator structure
pub struct Coordinator<S: Storage = JsonFileStorage> {
    config: Config,
    storage: S,
    fetcher: Fetcher,
    base: Url,
    matcher: AuthorMatcher,
    fresh: bool,
}

impl Coordinator<JsonFileStorage> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawler configuration
    /// * `fresh` - Ignore stored crawl state and start from the top of the index
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(GleanError)` - Bad base URL or HTTP client construction failed
    pub fn new(config: Config, fresh: bool) -> Result<Self> {
        let storage = open_storage(&config.output);
        let fetcher = Fetcher::new(&config)?;
        Self::with_parts(config, storage, fetcher, fresh)
    }
}

impl<S: Storage> Coordinator<S> {
    /// Creates a coordinator over explicit storage and fetcher
    pub fn with_parts(config: Config, storage: S, fetcher: Fetcher, fresh: bool) -> Result<Self> {
        let base = Url::parse(&config.source.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.source.base_url, e)))?;
        let matcher = AuthorMatcher::from_target(&config.target);

        Ok(Self {
            config,
            storage,
            fetcher,
            base,
            matcher,
            fresh,
        })
    }

    /// Works out where the next run starts and how far it may go
    pub fn plan(&self) -> Result<CrawlPlan> {
        let crawler = &self.config.crawler;

        if !crawler.incremental {
            return Ok(CrawlPlan {
                start_offset: 0,
                max_documents: crawler.max_posts_per_run,
                max_pages: None,
                already_complete: false,
                state: None,
            });
        }

        let state = self.load_state()?;
        let remaining = crawler
            .max_total_posts
            .saturating_sub(state.total_documents_seen);
        let max_documents = crawler
            .max_posts_per_run
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));

        Ok(CrawlPlan {
            start_offset: state.next_offset,
            max_documents,
            max_pages: Some(crawler.page_batch_size),
            already_complete: state.is_done(),
            state: Some(state),
        })
    }

    /// Runs one bounded crawl and persists the result
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::default();

        let existing = self.storage.load_dataset()?;
        let existing_rows = existing.map(|dataset| dataset.rows).unwrap_or_default();
        let existing_count = existing_rows.len();
        tracing::info!("Loaded {} stored records", existing_count);

        let plan = self.plan()?;

        if plan.already_complete {
            tracing::info!("Index already fully crawled, refreshing timestamps only");
            report.already_complete = true;
            report.total_records = existing_count;
            self.save_dataset(existing_rows)?;
            if let Some(mut state) = plan.state {
                state.touch(Utc::now());
                self.storage.save_state(&state)?;
                report.state = Some(state);
            }
            return Ok(report);
        }

        tracing::info!(
            "Crawling {} from offset {} (up to {} posts)",
            self.base,
            plan.start_offset,
            plan.max_documents
        );

        let mut lister = DocumentLister::new(
            &self.fetcher,
            self.base.clone(),
            plan.start_offset,
            self.config.crawler.page_size,
            plan.max_documents,
        )
        .with_politeness(Politeness::for_pages(&self.config.crawler));
        if let Some(max_pages) = plan.max_pages {
            lister = lister.with_page_limit(max_pages);
        }

        let retriever = CommentRetriever::new(
            &self.fetcher,
            self.base.clone(),
            self.config.crawler.rendered_fallback,
        );
        let post_pause = Politeness::for_posts(&self.config.crawler);
        let mut new_records = Vec::new();

        loop {
            let document = match lister.next_document().await {
                Ok(Some(document)) => document,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Index paging stopped early: {}", e);
                    report.index_error = Some(e.to_string());
                    break;
                }
            };

            report.documents_seen += 1;

            match self.process_document(&retriever, &document).await {
                Ok(DocumentOutcome::Processed {
                    comments,
                    records,
                    source,
                }) => {
                    tracing::info!(
                        "{}: {} comments ({}), {} matched",
                        document.url,
                        comments,
                        source,
                        records.len()
                    );
                    report.comments_scanned += comments;
                    report.records_matched += records.len();
                    new_records.extend(records);
                }
                Ok(DocumentOutcome::Skipped) => {
                    tracing::warn!("Skipping {}: no post id", document.url);
                    report.documents_skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", document.url, e);
                    report.documents_skipped += 1;
                }
            }

            post_pause.pause().await;
        }

        report.pages_fetched = lister.pages_fetched();

        let merged = merge(existing_rows, new_records);
        report.total_records = merged.len();
        report.records_added = merged.len().saturating_sub(existing_count);
        self.save_dataset(merged)?;

        if let Some(mut state) = plan.state {
            state.record_progress(
                lister.cursor(),
                lister.documents_yielded() as u64,
                lister.is_exhausted(),
                self.config.crawler.max_total_posts,
            );
            state.touch(Utc::now());
            self.storage.save_state(&state)?;
            if state.is_done() {
                tracing::info!("Index fully crawled after {} posts", state.total_documents_seen);
            }
            report.state = Some(state);
        }

        tracing::info!(
            "Run finished in {:?}: {} posts, {} skipped, {} new records, {} total",
            started.elapsed(),
            report.documents_seen,
            report.documents_skipped,
            report.records_added,
            report.total_records
        );

        Ok(report)
    }

    async fn process_document(
        &self,
        retriever: &CommentRetriever<'_>,
        document: &DocumentReference,
    ) -> FetchResult<DocumentOutcome> {
        let Some(post_id) = retriever.resolve_post_id(document).await? else {
            return Ok(DocumentOutcome::Skipped);
        };

        let retrieved = retriever.comments(document, &post_id).await?;
        let flattened = flatten(&retrieved.roots);
        let records = matching_records(document, Some(&post_id), &flattened, &self.matcher);

        Ok(DocumentOutcome::Processed {
            comments: flattened.len(),
            records,
            source: retrieved.source,
        })
    }

    /// Stored state, or a fresh one for `--fresh` runs and unreadable files
    fn load_state(&self) -> Result<CrawlState> {
        if self.fresh {
            return Ok(CrawlState::new());
        }

        match self.storage.load_state() {
            Ok(state) => Ok(state.unwrap_or_default()),
            Err(StorageError::Corrupt { path, message }) => {
                tracing::warn!(
                    "Ignoring unreadable crawl state {}: {}",
                    path.display(),
                    message
                );
                Ok(CrawlState::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save_dataset(&self, rows: Vec<OutputRecord>) -> Result<()> {
        let target = &self.config.target;
        let dataset = OutputDataset::new(
            api_root(&self.base),
            TargetIdentity {
                name: target.name.clone(),
                handle: target.handle.clone(),
            },
            rows,
            Utc::now(),
        );
        self.storage.save_dataset(&dataset)?;
        tracing::debug!("Wrote {} records", dataset.count);
        Ok(())
    }
}
