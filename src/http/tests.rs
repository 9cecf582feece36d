//! Tests for the HTTP session

use super::*;
use crate::error::Error;
use crate::types::BackoffType;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client(max_retries: u32) -> HttpClient {
    let config = HttpClientConfig::builder()
        .max_retries(max_retries)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .build();
    HttpClient::with_config(config).unwrap()
}

fn backoff_client(backoff_type: BackoffType, initial_ms: u64, max_ms: u64) -> HttpClient {
    let config = HttpClientConfig::builder()
        .backoff(
            backoff_type,
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
        )
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_config_defaults() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.backoff_type, BackoffType::Exponential);
    assert!(config.user_agent.starts_with("collision-etl/"));
}

#[tokio::test]
async fn test_get_json_decodes_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/PublicHolidays/2021/US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"date": "2021-07-04", "name": "Independence Day"}
        ])))
        .mount(&server)
        .await;

    let url = format!("{}/PublicHolidays/2021/US", server.uri());
    let body: Vec<serde_json::Value> = fast_client(0)
        .get_json(&url, RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["name"], "Independence Day");
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collisions.csv"))
        .and(header("user-agent", "etl-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder().user_agent("etl-test/0.1").build();
    let client = HttpClient::with_config(config).unwrap();
    let response = client
        .get(&format!("{}/collisions.csv", server.uri()), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "a,b\n1,2\n");
}

#[test_case(400 ; "bad request")]
#[test_case(403 ; "forbidden")]
#[test_case(404 ; "not found")]
#[tokio::test]
async fn test_client_error_is_not_retried(status: u16) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_client(3)
        .get(&server.uri(), RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: s, ref body } if s == status && body == "nope"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = fast_client(3)
        .get(&server.uri(), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = fast_client(1)
        .get(&server.uri(), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let err = fast_client(2)
        .get(&server.uri(), RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_per_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::new().timeout(Duration::from_millis(50));
    let err = fast_client(0).get(&server.uri(), options).await.unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

#[test]
fn test_backoff_constant() {
    let client = backoff_client(BackoffType::Constant, 100, 10_000);
    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(5), Duration::from_millis(100));
}

#[test]
fn test_backoff_linear() {
    let client = backoff_client(BackoffType::Linear, 100, 10_000);
    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_backoff_exponential_is_capped() {
    let client = backoff_client(BackoffType::Exponential, 1_000, 5_000);
    assert_eq!(client.calculate_backoff(0), Duration::from_secs(1));
    assert_eq!(client.calculate_backoff(1), Duration::from_secs(2));
    assert_eq!(client.calculate_backoff(2), Duration::from_secs(4));
    assert_eq!(client.calculate_backoff(3), Duration::from_secs(5));
    assert_eq!(client.calculate_backoff(40), Duration::from_secs(5));
}
