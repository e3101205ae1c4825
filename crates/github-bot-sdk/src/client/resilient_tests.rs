//! Tests for the resilient outbound HTTP pipeline.

use super::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quick_retry_config() -> ResilientClientConfig {
    ResilientClientConfig {
        max_retries: 2,
        base_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter_factor: 0.0,
    }
}

#[tokio::test]
async fn succeeds_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client =
        ResilientClient::new(reqwest::Client::new(), "test").with_retry_config(quick_retry_config());

    let url = format!("{}/ok", server.uri());
    let response = client
        .execute_rest(|c| c.get(&url))
        .await
        .expect("should succeed");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn retries_transient_5xx_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client =
        ResilientClient::new(reqwest::Client::new(), "test").with_retry_config(quick_retry_config());

    let url = format!("{}/flaky", server.uri());
    let response = client.execute_rest(|c| c.get(&url)).await.expect("should retry and succeed");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn gives_up_after_max_retries_on_persistent_5xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client =
        ResilientClient::new(reqwest::Client::new(), "test").with_retry_config(quick_retry_config());

    let url = format!("{}/down", server.uri());
    let result = client.execute_rest(|c| c.get(&url)).await;

    assert!(matches!(result, Err(ApiError::HttpError { status: 500, .. })));
}

#[tokio::test]
async fn does_not_retry_non_retryable_4xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client =
        ResilientClient::new(reqwest::Client::new(), "test").with_retry_config(quick_retry_config());

    let url = format!("{}/missing", server.uri());
    let result = client.execute_rest(|c| c.get(&url)).await;

    assert!(matches!(result, Err(ApiError::HttpError { status: 404, .. })));
}

#[tokio::test]
async fn graphql_error_array_surfaces_as_graphql_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": null,
            "errors": [{"message": "field not found"}]
        })))
        .mount(&server)
        .await;

    let client =
        ResilientClient::new(reqwest::Client::new(), "test").with_retry_config(quick_retry_config());

    let url = format!("{}/graphql", server.uri());
    let result: Result<Value, ApiError> = client
        .execute_graphql(&url, "{ viewer { login } }", serde_json::json!({}), "Bearer x")
        .await;

    match result {
        Err(err @ ApiError::GraphQlError { ref messages }) => {
            assert_eq!(err.code(), "github_graphql_error");
            assert_eq!(messages, &["field not found".to_string()]);
        }
        other => panic!("expected graphql error, got {other:?}"),
    }
}

#[tokio::test]
async fn graphql_null_data_without_errors_surfaces_as_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": null,
            "errors": []
        })))
        .mount(&server)
        .await;

    let client =
        ResilientClient::new(reqwest::Client::new(), "test").with_retry_config(quick_retry_config());

    let url = format!("{}/graphql", server.uri());
    let result: Result<Value, ApiError> = client
        .execute_graphql(&url, "{ viewer { login } }", serde_json::json!({}), "Bearer x")
        .await;

    match result {
        Err(err @ ApiError::GraphQlNoData) => {
            assert_eq!(err.code(), "github_graphql_no_data");
        }
        other => panic!("expected no-data error, got {other:?}"),
    }
}
