use super::*;
use crate::auth::{GitHubAppId, InstallationId, JsonWebToken};
use base64::Engine;
use chrono::{Duration as ChronoDuration, Utc};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn jwt() -> JsonWebToken {
    JsonWebToken::new(
        "test-jwt-token".to_string(),
        GitHubAppId::new(12345),
        Utc::now() + ChronoDuration::hours(1),
    )
}

#[test]
fn default_config_values() {
    let config = ClientConfig::default();

    assert_eq!(config.user_agent, "github-bot-sdk/0.1.0");
    assert_eq!(config.github_api_url, "https://api.github.com");
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
}

#[test]
fn with_user_agent_and_api_url_override_defaults() {
    let config = ClientConfig::default()
        .with_user_agent("webhook-service/0.1.0")
        .with_github_api_url("https://github.enterprise.internal/api/v3");

    assert_eq!(config.user_agent, "webhook-service/0.1.0");
    assert_eq!(config.github_api_url, "https://github.enterprise.internal/api/v3");
}

#[tokio::test]
async fn get_repository_content_decodes_base64_body() {
    let mock_server = MockServer::start().await;
    let raw_content = b"name: ci\non: [push]\n";
    let encoded = base64::engine::general_purpose::STANDARD.encode(raw_content);

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/contents/.github/workflows/ci.yml"))
        .and(header("Authorization", "Bearer test-jwt-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "path": ".github/workflows/ci.yml",
            "content": encoded,
            "sha": "abc123",
        })))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let content = client
        .get_repository_content("acme", "widgets", ".github/workflows/ci.yml", None, &jwt())
        .await
        .unwrap();

    assert_eq!(content.content, raw_content);
    assert_eq!(content.sha, "abc123");
}

#[tokio::test]
async fn get_repository_content_honors_ref_query_param() {
    let mock_server = MockServer::start().await;
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"ok");

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/contents/file.yml"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "path": "file.yml",
            "content": encoded,
            "sha": "deadbeef",
        })))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let result = client
        .get_repository_content("acme", "widgets", "file.yml", Some("refs/heads/main"), &jwt())
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn get_repository_content_not_found_surfaces_as_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/contents/missing.yml"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let result = client
        .get_repository_content("acme", "widgets", "missing.yml", None, &jwt())
        .await;

    assert!(matches!(result, Err(ApiError::HttpError { status: 404, .. })));
}

#[tokio::test]
async fn create_installation_access_token_parses_response() {
    let mock_server = MockServer::start().await;
    let expires_at = Utc::now() + ChronoDuration::hours(1);

    Mock::given(method("POST"))
        .and(path("/app/installations/555/access_tokens"))
        .and(header("Authorization", "Bearer test-jwt-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_abc123",
            "expires_at": expires_at.to_rfc3339(),
        })))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let token = client
        .create_installation_access_token(InstallationId::new(555), &jwt())
        .await
        .unwrap();

    assert_eq!(token.token(), "ghs_abc123");
}

#[tokio::test]
async fn create_installation_access_token_rejects_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/555/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_string(""))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let result = client
        .create_installation_access_token(InstallationId::new(555), &jwt())
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.code(), "github_installation_token_invalid");
}

#[tokio::test]
async fn create_installation_access_token_rejects_non_2xx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/555/access_tokens"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Resource not accessible by integration"))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let result = client
        .create_installation_access_token(InstallationId::new(555), &jwt())
        .await;

    match result {
        Err(err @ ApiError::InstallationTokenFailed { status: 403, .. }) => {
            assert_eq!(err.code(), "github_installation_token_failed");
        }
        other => panic!("expected installation token failure, got {other:?}"),
    }
}

#[tokio::test]
async fn create_installation_access_token_rejects_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/555/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default().with_github_api_url(mock_server.uri());
    let client = GitHubClient::new(config).unwrap();

    let result = client
        .create_installation_access_token(InstallationId::new(555), &jwt())
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.code(), "github_installation_token_invalid_json");
}

#[test]
fn debug_output_does_not_leak_credentials() {
    let config = ClientConfig::default();
    let client = GitHubClient::new(config).unwrap();

    let debug_output = format!("{client:?}");

    assert!(debug_output.contains("GitHubClient"));
    assert!(!debug_output.contains("Bearer"));
}
