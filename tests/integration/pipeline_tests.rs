//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to stand in for the newsletter API and run full
//! crawls against temporary dataset and state files.

use comment_gleaner::config::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SourceConfig, TargetConfig, UserAgentConfig,
};
use comment_gleaner::crawler::{
    build_http_client, list_documents, Coordinator, DocumentLister, Fetcher, Politeness,
    RetryPolicy,
};
use comment_gleaner::storage::{
    JsonFileStorage, OutputDataset, OutputRecord, Storage, TargetIdentity,
};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
        },
        target: TargetConfig {
            name: Some("Jane Doe".to_string()),
            handle: Some("janedoe".to_string()),
        },
        crawler: CrawlerConfig {
            max_posts_per_run: 100,
            politeness_delay: 0,
            page_jitter_max: 0,
            post_jitter_max: 0,
            page_size: 12,
            incremental: false,
            page_batch_size: 5,
            max_total_posts: 5000,
            rendered_fallback: false,
        },
        retry: RetryConfig {
            max_attempts: 2,
            base_delay: 1,
            rate_limit_cap: 10,
            server_error_cap: 10,
            jitter_max: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestGleaner".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            dataset_path: dir.path().join("dataset.json").display().to_string(),
            state_path: dir.path().join("state.json").display().to_string(),
        },
    }
}

fn fetcher(config: &Config) -> Fetcher {
    Fetcher::with_client(
        build_http_client(&config.user_agent).unwrap(),
        RetryPolicy::from(&config.retry),
    )
}

fn storage(config: &Config) -> JsonFileStorage {
    JsonFileStorage::new(&config.output.dataset_path, &config.output.state_path)
}

fn coordinator(config: &Config, fresh: bool) -> Coordinator<JsonFileStorage> {
    Coordinator::with_parts(config.clone(), storage(config), fetcher(config), fresh)
        .expect("Failed to create coordinator")
}

fn summaries(slugs: &[&str]) -> Value {
    Value::Array(
        slugs
            .iter()
            .map(|slug| json!({ "slug": slug, "title": slug.to_uppercase() }))
            .collect(),
    )
}

async fn mount_index_page(server: &MockServer, offset: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/archive"))
        .and(query_param("offset", offset.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_post(server: &MockServer, slug: &str, id: u64, comments: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/posts/{}", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "slug": slug })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/post/{}/comments", id)))
        .and(query_param("all_comments", "true"))
        .and(query_param("sort", "oldest_first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments))
        .mount(server)
        .await;
}

fn read_dataset(config: &Config) -> Value {
    let content = std::fs::read_to_string(&config.output.dataset_path).expect("dataset written");
    serde_json::from_str(&content).expect("dataset is JSON")
}

#[tokio::test]
async fn test_pagination_stops_after_empty_page() {
    let server = MockServer::start().await;
    let page = |start: usize| -> Value {
        Value::Array(
            (start..start + 12)
                .map(|i| json!({ "slug": format!("post-{}", i) }))
                .collect(),
        )
    };

    for (offset, body) in [(0, page(0)), (12, page(12)), (24, json!([]))] {
        Mock::given(method("GET"))
            .and(path("/api/v1/archive"))
            .and(query_param("offset", offset.to_string().as_str()))
            .and(query_param("limit", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/api/v1/archive"))
        .and(query_param("offset", "36"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let base = Url::parse(&server.uri()).unwrap();

    let documents = list_documents(&fetcher(&config), base, 12, 100, Politeness::none()).await;

    assert_eq!(documents.len(), 24);
    assert!(documents[0].url.ends_with("/p/post-0"));
    assert!(documents[23].url.ends_with("/p/post-23"));
}

#[tokio::test]
async fn test_lister_respects_max_count_and_cursor() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["a", "b", "c", "d"])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let fetcher = fetcher(&config);
    let base = Url::parse(&server.uri()).unwrap();

    let mut lister = DocumentLister::new(&fetcher, base, 0, 4, 3);
    let mut seen = Vec::new();
    while let Some(document) = lister.next_document().await.unwrap() {
        seen.push(document.url);
    }

    assert_eq!(seen.len(), 3);
    assert_eq!(lister.cursor(), 3);
    assert!(!lister.is_exhausted());
}

#[tokio::test]
async fn test_entries_without_url_are_skipped() {
    let server = MockServer::start().await;
    mount_index_page(
        &server,
        0,
        json!({ "posts": [
            { "slug": "real-post", "post_date": "2024-05-01T00:00:00Z" },
            { "type": "podcast", "title": "no address" },
            { "canonical_url": "https://elsewhere.example/p/syndicated?utm_source=x" }
        ]}),
    )
    .await;
    mount_index_page(&server, 3, json!([])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let base = Url::parse(&server.uri()).unwrap();

    let documents = list_documents(&fetcher(&config), base, 12, 100, Politeness::none()).await;

    assert_eq!(documents.len(), 2);
    assert!(documents[0].published_at.is_some());
    assert_eq!(documents[1].url, "https://elsewhere.example/p/syndicated");
}

#[tokio::test]
async fn test_end_to_end_single_match() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["alpha", "beta"])).await;
    mount_index_page(&server, 2, json!([])).await;

    mount_post(
        &server,
        "alpha",
        101,
        json!([{
            "id": 1,
            "name": "Jane Doe",
            "handle": "janedoe",
            "body": "<p>Great post.</p><blockquote><p>quoted bit</p></blockquote><p>Agreed.</p>",
            "date": "2024-01-02T03:04:05Z",
            "reaction_count": 7,
            "children": [{
                "id": 2,
                "name": "Someone Else",
                "handle": "someone",
                "body": "Thanks!"
            }]
        }]),
    )
    .await;
    mount_post(&server, "beta", 202, json!({ "comments": [] })).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let report = coordinator(&config, false).run().await.expect("Crawl failed");
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.documents_seen, 2);
    assert_eq!(report.documents_skipped, 0);
    assert_eq!(report.comments_scanned, 2);
    assert_eq!(report.total_records, 1);
    assert!(report.state.is_none());

    let dataset = read_dataset(&config);
    assert_eq!(dataset["count"], 1);
    assert_eq!(dataset["sourceUrl"], server.uri());
    assert_eq!(dataset["targetIdentity"]["handle"], "janedoe");

    let row = &dataset["rows"][0];
    assert_eq!(row["postUrl"], format!("{}/p/alpha", server.uri()));
    assert_eq!(row["postTitle"], "ALPHA");
    assert_eq!(row["postId"], "101");
    assert_eq!(row["commentId"], "1");
    assert_eq!(row["topLevelCommentId"], "1");
    assert!(row["parentCommentId"].is_null());
    assert!(row["parentCommentUrl"].is_null());
    assert_eq!(
        row["commentUrl"],
        format!("{}/p/alpha/comment/1", server.uri())
    );
    assert_eq!(row["commentDateMs"], 1_704_164_645_000i64);
    assert_eq!(row["likes"], 7);
    assert_eq!(row["text"], "Great post.\n\n> quoted bit\n\nAgreed.");
}

#[tokio::test]
async fn test_matching_reply_links_to_parent() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["thread"])).await;
    mount_index_page(&server, 1, json!([])).await;

    mount_post(
        &server,
        "thread",
        7,
        json!([{
            "id": 10,
            "name": "Someone Else",
            "body": "Question?",
            "replies": [{ "id": 11, "handle": "@JaneDoe", "body": "Answer." }]
        }]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    coordinator(&config, false).run().await.expect("Crawl failed");

    let dataset = read_dataset(&config);
    let row = &dataset["rows"][0];
    assert_eq!(dataset["count"], 1);
    assert_eq!(row["commentId"], "11");
    assert_eq!(row["parentCommentId"], "10");
    assert_eq!(row["topLevelCommentId"], "10");
    assert_eq!(
        row["parentCommentUrl"],
        format!("{}/p/thread/comment/10", server.uri())
    );
}

#[tokio::test]
async fn test_existing_record_wins_on_merge() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["alpha"])).await;
    mount_index_page(&server, 1, json!([])).await;
    mount_post(
        &server,
        "alpha",
        101,
        json!([{ "id": 1, "name": "Jane Doe", "body": "Same words", "reaction_count": 50 }]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let existing = OutputRecord {
        post_url: format!("{}/p/alpha", server.uri()),
        post_title: Some("Stored title".to_string()),
        post_id: Some("101".to_string()),
        comment_id: Some("1".to_string()),
        top_level_comment_id: Some("1".to_string()),
        parent_comment_id: None,
        comment_url: None,
        top_level_comment_url: None,
        parent_comment_url: None,
        comment_date_ms: None,
        likes: 3,
        text: "Same words".to_string(),
    };
    storage(&config)
        .save_dataset(&OutputDataset::new(
            server.uri(),
            TargetIdentity::default(),
            vec![existing.clone()],
            chrono::Utc::now(),
        ))
        .unwrap();

    let report = coordinator(&config, false).run().await.expect("Crawl failed");
    assert_eq!(report.records_matched, 1);
    assert_eq!(report.records_added, 0);

    let stored = storage(&config).load_dataset().unwrap().unwrap();
    assert_eq!(stored.count, 1);
    assert_eq!(stored.rows, vec![existing]);

    // A second identical run changes nothing
    coordinator(&config, false).run().await.expect("Crawl failed");
    let again = storage(&config).load_dataset().unwrap().unwrap();
    assert_eq!(again.rows, stored.rows);
}

#[tokio::test]
async fn test_incremental_resume_and_done_short_circuit() {
    let server = MockServer::start().await;

    for (offset, body) in [
        (0, summaries(&["a", "b"])),
        (2, summaries(&["c"])),
        (3, json!([])),
    ] {
        Mock::given(method("GET"))
            .and(path("/api/v1/archive"))
            .and(query_param("offset", offset.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/posts/[a-z]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post/9/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.crawler.incremental = true;
    config.crawler.page_size = 2;
    config.crawler.page_batch_size = 1;

    // Run 1: one page of two posts
    let report = coordinator(&config, false).run().await.unwrap();
    let state = report.state.unwrap();
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.documents_seen, 2);
    assert_eq!(state.next_offset, 2);
    assert_eq!(state.total_documents_seen, 2);
    assert!(!state.done);

    // Run 2: resumes at offset 2
    let report = coordinator(&config, false).run().await.unwrap();
    let state = report.state.unwrap();
    assert_eq!(report.documents_seen, 1);
    assert_eq!(state.next_offset, 3);
    assert!(!state.done);

    // Run 3: empty page marks the crawl complete
    let report = coordinator(&config, false).run().await.unwrap();
    let state = report.state.unwrap();
    assert_eq!(report.documents_seen, 0);
    assert!(state.done);
    assert_eq!(state.total_documents_seen, 3);

    // Run 4: no requests, timestamps refreshed
    let before = storage(&config).load_dataset().unwrap().unwrap().generated_at;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let report = coordinator(&config, false).run().await.unwrap();
    assert!(report.already_complete);
    assert_eq!(report.documents_seen, 0);

    let after = storage(&config).load_dataset().unwrap().unwrap().generated_at;
    assert!(after > before);

    let persisted = storage(&config).load_state().unwrap().unwrap();
    assert!(persisted.done);
    assert!(persisted.last_run_at.is_some());
}

#[tokio::test]
async fn test_index_failure_soft_stops_and_persists() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["alpha"])).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/archive"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("blocked"))
        .expect(1)
        .mount(&server)
        .await;

    mount_post(
        &server,
        "alpha",
        101,
        json!([{ "id": 1, "handle": "JaneDoe", "body": "kept anyway" }]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.crawler.incremental = true;
    config.crawler.page_size = 1;

    let report = coordinator(&config, false)
        .run()
        .await
        .expect("index failure must not fail the run");

    assert!(report.index_error.is_some());
    assert_eq!(report.total_records, 1);

    let state = report.state.unwrap();
    assert_eq!(state.next_offset, 1);
    assert!(!state.done);

    let dataset = read_dataset(&config);
    assert_eq!(dataset["rows"][0]["text"], "kept anyway");
}

#[tokio::test]
async fn test_post_failures_are_skipped() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["no-id", "broken", "good"])).await;
    mount_index_page(&server, 3, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/no-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "?" })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    mount_post(
        &server,
        "good",
        3,
        json!([{ "id": 30, "name": "Jane  Doe", "body": "survivor" }]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let report = coordinator(&config, false).run().await.expect("Crawl failed");
    assert_eq!(report.documents_seen, 3);
    assert_eq!(report.documents_skipped, 2);
    assert_eq!(report.total_records, 1);
}

#[tokio::test]
async fn test_rendered_fallback() {
    let server = MockServer::start().await;
    mount_index_page(&server, 0, summaries(&["walled"])).await;
    mount_index_page(&server, 1, json!([])).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/walled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 55 })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/post/55/comments"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/walled/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r##"<html><body>
            <div class="comment" data-comment-id="900">
              <a class="comment-author" href="https://substack.com/@janedoe">Jane Doe</a>
              <time datetime="2024-06-01T12:00:00Z">Jun 1</time>
              <div class="comment-body"><p>From the page</p><a href="#">Share</a></div>
              <span class="like-count">4</span>
            </div>
            <div class="comment" data-comment-id="901">
              <a class="comment-author" href="https://substack.com/@other">Other</a>
              <div class="comment-body"><p>Not ours</p></div>
            </div>
            </body></html>"##,
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);

    // Disabled: the post is skipped
    let report = coordinator(&config, false).run().await.unwrap();
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(report.total_records, 0);

    // Enabled: comments come from the rendered page
    config.crawler.rendered_fallback = true;
    let report = coordinator(&config, false).run().await.unwrap();
    assert_eq!(report.documents_skipped, 0);
    assert_eq!(report.total_records, 1);

    let dataset = read_dataset(&config);
    let row = &dataset["rows"][0];
    assert_eq!(row["commentId"], "900");
    assert!(row["parentCommentId"].is_null());
    assert_eq!(row["likes"], 4);
    assert_eq!(row["text"], "From the page");
}
