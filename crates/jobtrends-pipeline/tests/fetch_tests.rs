//! Fetcher tests against a mock upstream API
//!
//! Backoff timing is shrunk via `UpstreamConfig` so the retry schedule can
//! be exercised in milliseconds instead of minutes.

use std::time::{Duration, Instant};

use jobtrends_pipeline::config::UpstreamConfig;
use jobtrends_pipeline::fetch::FetchError;
use jobtrends_pipeline::JobsApiClient;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> UpstreamConfig {
    UpstreamConfig {
        api_url: format!("{}/search", server.uri()),
        api_key: "test-key".to_string(),
        api_host: "test-host".to_string(),
        timeout_secs: 5,
        max_attempts: 6,
        backoff_base_ms: 10,
        backoff_cap_secs: 1,
        politeness_delay_ms: 0,
    }
}

fn page_body(ids: &[&str]) -> serde_json::Value {
    json!({
        "status": "OK",
        "data": ids
            .iter()
            .map(|id| json!({ "job_id": id, "job_title": "Engineer" }))
            .collect::<Vec<_>>()
    })
}

#[tokio::test]
async fn fetch_page_returns_raw_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(header("X-RapidAPI-Key", "test-key"))
        .and(header("X-RapidAPI-Host", "test-host"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "50"))
        .and(query_param("query", "data science"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["a", "b"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = JobsApiClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_page(1, 50, "data science").await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["job_id"], "a");
}

#[tokio::test]
async fn empty_page_signals_end_of_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = JobsApiClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_page(3, 50, "rust").await.unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn missing_data_field_is_treated_as_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "OK" })))
        .mount(&server)
        .await;

    let client = JobsApiClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_page(1, 50, "rust").await.unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn non_success_status_fails_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = JobsApiClient::new(&test_config(&server)).unwrap();
    let err = client.fetch_page(1, 50, "rust").await.unwrap_err();

    assert!(matches!(err, FetchError::Upstream { status: 503 }));
}

#[tokio::test]
async fn retry_after_header_overrides_exponential_backoff() {
    let server = MockServer::start().await;

    // First response: 429 telling the client to wait 1 second.
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["a"])))
        .expect(1)
        .mount(&server)
        .await;

    // An exponential schedule with this base would sleep 10 seconds; seeing
    // the retry land between 1s and 3s proves Retry-After was used verbatim.
    let mut config = test_config(&server);
    config.backoff_base_ms = 10_000;
    config.backoff_cap_secs = 60;

    let client = JobsApiClient::new(&config).unwrap();
    let started = Instant::now();
    let records = client.fetch_page(1, 50, "rust").await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(records.len(), 1);
    assert!(elapsed >= Duration::from_secs(1), "retried too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "exponential backoff applied: {:?}", elapsed);
}

#[tokio::test]
async fn rate_limit_exhausted_after_attempt_cap() {
    let server = MockServer::start().await;

    // Exactly six requests expected; exhaustion must not issue a seventh.
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .expect(6)
        .mount(&server)
        .await;

    let client = JobsApiClient::new(&test_config(&server)).unwrap();
    let err = client.fetch_page(1, 50, "rust").await.unwrap_err();

    assert!(matches!(err, FetchError::RateLimitExhausted { attempts: 6 }));
    server.verify().await;
}

#[tokio::test]
async fn fetch_all_stops_on_first_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["a", "b"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    // No request for page 3 may ever be issued.
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["c"])))
        .expect(0)
        .mount(&server)
        .await;

    let client = JobsApiClient::new(&test_config(&server)).unwrap();
    let pages = client.fetch_all("rust", 50, 10).await.unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].len(), 2);
    server.verify().await;
}
