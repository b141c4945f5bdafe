use beholder::config::{CircuitBreakerSettings, RetrySettings, SearchConfig};
use beholder::{DateWindow, Error, SearchClient, SearchRequest};
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 14).unwrap(),
    )
    .unwrap()
}

fn config(server: &MockServer, max_attempts: u32) -> SearchConfig {
    SearchConfig {
        base_url: format!("{}/graph/v1/paper/search", server.uri()),
        requests_per_second: 1_000.0,
        retry: RetrySettings {
            max_attempts,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            multiplier: 1.0,
            jitter: 0.0,
        },
        ..SearchConfig::default()
    }
}

fn request() -> SearchRequest {
    SearchRequest::new(
        "diffusion models",
        &["Computer Science".to_string()],
        &window(),
        75,
    )
}

fn page() -> serde_json::Value {
    json!({
        "total": 1,
        "offset": 0,
        "data": [{
            "paperId": "abc",
            "title": "Diffusion All The Way Down",
            "publicationDate": "2025-01-10",
            "externalIds": { "DOI": "10.1234/diff.2025" },
            "abstract": "We diffuse.",
            "openAccessPdf": { "url": "https://example.org/diff.pdf", "status": "GREEN" }
        }]
    })
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page()))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(&config(&server, 5), None).unwrap();
    let papers = client.search(&request()).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].doi(), Some("10.1234/diff.2025"));
    assert_eq!(papers[0].open_access_url(), Some("https://example.org/diff.pdf"));
}

#[tokio::test]
async fn test_persistent_rate_limit_gives_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let client = SearchClient::new(&config(&server, 3), None).unwrap();
    let err = client.search(&request()).await.unwrap_err();

    match err {
        Error::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_circuit_opens_before_retries_run_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let search_config = SearchConfig {
        circuit_breaker: CircuitBreakerSettings {
            failure_threshold: 3,
            recovery_timeout_secs: 60,
        },
        ..config(&server, 10)
    };
    let client = SearchClient::new(&search_config, None).unwrap();

    let err = client.search(&request()).await.unwrap_err();
    assert!(matches!(err, Error::CircuitBreakerOpen { .. }), "got {err:?}");

    // the next watch term is refused without reaching the API
    let err = client.search(&request()).await.unwrap_err();
    assert!(matches!(err, Error::CircuitBreakerOpen { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(&config(&server, 5), None).unwrap();
    let err = client.search(&request()).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 500, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_request_carries_filters_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("query", "diffusion models"))
        .and(query_param("limit", "75"))
        .and(query_param("offset", "0"))
        .and(query_param("year", "2025"))
        .and(query_param("fieldsOfStudy", "Computer Science"))
        .and(header("x-api-key", "s2-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchClient::new(&config(&server, 1), Some("s2-secret".to_string())).unwrap();
    let papers = client.search(&request()).await.unwrap();

    assert!(papers.is_empty());
}

#[tokio::test]
async fn test_missing_data_is_an_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 0 })))
        .mount(&server)
        .await;

    let client = SearchClient::new(&config(&server, 1), None).unwrap();
    assert!(client.search(&request()).await.unwrap().is_empty());
}
