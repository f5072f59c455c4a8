//! Integration tests for the rate-limited fetcher
//!
//! These tests use wiremock to simulate rate limiting, server errors and
//! permanent failures.

use comment_gleaner::config::UserAgentConfig;
use comment_gleaner::crawler::{build_http_client, Fetcher, RetryPolicy, ACCEPT_JSON};
use comment_gleaner::FetchError;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestGleaner".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Millisecond-scale backoff so retries stay fast
fn fast_fetcher(max_attempts: u32) -> Fetcher {
    let policy = RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        rate_limit_cap: Duration::from_millis(20),
        server_error_cap: Duration::from_millis(10),
        jitter_max: Duration::ZERO,
    };
    Fetcher::with_client(build_http_client(&user_agent()).unwrap(), policy)
}

#[tokio::test]
async fn test_success_sends_identity_and_accept_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/ping"))
        .and(header(
            "user-agent",
            "TestGleaner/1.0 (+https://example.com/about; test@example.com)",
        ))
        .and(header("accept", ACCEPT_JSON))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(3);
    let value = fetcher
        .fetch_json(&format!("{}/api/v1/ping", server.uri()))
        .await
        .expect("fetch should succeed");

    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(5);
    let body = fetcher
        .fetch(&format!("{}/busy", server.uri()), ACCEPT_JSON)
        .await
        .expect("fetch should succeed after retries");

    assert_eq!(body, "finally");
}

#[tokio::test]
async fn test_server_error_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(3);
    let value = fetcher
        .fetch_json(&format!("{}/flaky", server.uri()))
        .await
        .expect("fetch should succeed after one retry");

    assert!(value.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(3);
    let err = fetcher
        .fetch(&format!("{}/down", server.uri()), ACCEPT_JSON)
        .await
        .unwrap_err();

    match err {
        FetchError::ExhaustedRetries {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_status, Some(503));
        }
        other => panic!("Expected ExhaustedRetries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_exhaustion_reports_429() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(2);
    let err = fetcher
        .fetch(&format!("{}/throttled", server.uri()), ACCEPT_JSON)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(matches!(err, FetchError::ExhaustedRetries { .. }));
}

#[tokio::test]
async fn test_not_found_is_fatal_without_retry() {
    let server = MockServer::start().await;
    let long_body = format!("Not here. {}", "x".repeat(500));

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(long_body))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(5);
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()), ACCEPT_JSON)
        .await
        .unwrap_err();

    match err {
        FetchError::Fatal {
            status, snippet, ..
        } => {
            assert_eq!(status, 404);
            assert!(snippet.starts_with("Not here."));
            assert_eq!(snippet.chars().count(), 200);
        }
        other => panic!("Expected Fatal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let fetcher = fast_fetcher(3);
    let err = fetcher
        .fetch_json(&format!("{}/html", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Malformed { .. }));
}
