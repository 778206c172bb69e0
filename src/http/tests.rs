//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use crate::types::BackoffType;
use reqwest::Method;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client(uri: String, max_retries: u32) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(uri)
        .max_retries(max_retries)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("solidafy-extract/"));
}

#[test]
fn test_request_config_keeps_query_order() {
    let config = RequestConfig::new()
        .query("skip", "2000")
        .query("take", "1000")
        .json(serde_json::json!({"sortBy": "Id"}));

    assert_eq!(
        config.query,
        vec![
            ("skip".to_string(), "2000".to_string()),
            ("take".to_string(), "1000".to_string())
        ]
    );
    assert!(config.body.is_some());
}

#[tokio::test]
async fn test_post_with_query_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/Gift/Query"))
        .and(query_param("skip", "0"))
        .and(query_param("take", "2"))
        .and(header("Authorization", "Bearer secret"))
        .and(body_json(serde_json::json!({"sortBy": "Id"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .header("Authorization", "Bearer secret")
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let body: serde_json::Value = client
        .request_json(
            Method::POST,
            "/api/Gift/Query",
            &RequestConfig::new()
                .query("skip", "0")
                .query("take", "2")
                .json(serde_json::json!({"sortBy": "Id"})),
        )
        .await
        .unwrap();

    assert_eq!(body["list"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_retry_on_500_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = fast_client(mock_server.uri(), 3);
    let response = client
        .send(Method::GET, "/api/flaky", &RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_exhausted_server_errors_are_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = fast_client(mock_server.uri(), 2);
    let err = client
        .send(Method::GET, "/api/always-fail", &RequestConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_exhausted_rate_limit_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = fast_client(mock_server.uri(), 1);
    let err = client
        .send(Method::GET, "/api/limited", &RequestConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_seconds: 0
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/protected"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(mock_server.uri(), 3);
    let err = client
        .send(Method::GET, "/api/protected", &RequestConfig::new())
        .await
        .unwrap_err();

    match &err {
        Error::HttpStatus { status, body } => {
            assert_eq!(*status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[test]
fn test_build_url() {
    let client = fast_client("https://api.example.com/".to_string(), 0);
    assert_eq!(client.build_url("/v1/gifts"), "https://api.example.com/v1/gifts");
    assert_eq!(client.build_url("v1/gifts"), "https://api.example.com/v1/gifts");
    assert_eq!(
        client.build_url("https://other.example.com/x"),
        "https://other.example.com/x"
    );
}

#[test]
fn test_calculate_backoff() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(1000),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(800));
    assert_eq!(client.calculate_backoff(4), Duration::from_millis(1000));
    assert_eq!(client.calculate_backoff(40), Duration::from_millis(1000));

    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}
