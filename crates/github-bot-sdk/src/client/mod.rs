//! GitHub API client for authenticated operations.
//!
//! Holds the small outbound REST/GraphQL surface this SDK actually needs:
//! installation access token issuance and repository content fetch, both
//! routed through the resilient timeout/breaker/retry pipeline.

pub mod circuit_breaker;
pub mod resilient;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use crate::auth::{GitHubApiClient, InstallationAccessToken, InstallationId, JsonWebToken};
use crate::error::ApiError;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitMetrics, CircuitState, WindowedCircuitBreaker};
pub use resilient::{ResilientClient, ResilientClientConfig};
pub use retry::{
    calculate_rate_limit_delay, detect_secondary_rate_limit, parse_retry_after, RateLimitInfo,
    RetryPolicy,
};

/// Configuration for GitHub API client behavior.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// GitHub API base URL (override for GitHub Enterprise)
    pub github_api_url: String,
    /// Per-attempt timeout applied at the HTTP-client level, before the
    /// resilient pipeline's own timeout wraps the call.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "github-bot-sdk/0.1.0".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }
}

/// Contents of a single file fetched from a repository, as returned by
/// GitHub's `GET /repos/{owner}/{repo}/contents/{path}` endpoint.
#[derive(Debug, Clone)]
pub struct RepositoryContent {
    pub path: String,
    pub content: Vec<u8>,
    pub sha: String,
}

/// GitHub API client for authenticated operations.
///
/// The thin outbound surface the rest of the system needs: minting
/// installation access tokens and fetching repository file contents, both
/// wrapped in the resilient timeout/breaker/retry pipeline.
pub struct GitHubClient {
    resilient: ResilientClient,
    config: ClientConfig,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ApiError::HttpClientError)?;

        Ok(Self {
            resilient: ResilientClient::new(http, "github-api"),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.resilient.circuit_state()
    }

    /// `GET /repos/{owner}/{repo}/contents/{path}`, optionally at a specific ref.
    pub async fn get_repository_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
        jwt: &JsonWebToken,
    ) -> Result<RepositoryContent, ApiError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.github_api_url, owner, repo, path
        );
        let git_ref = git_ref.map(str::to_string);

        let response = self
            .resilient
            .execute_rest(|client| {
                let mut request = client
                    .get(&url)
                    .header("Authorization", format!("Bearer {}", jwt.token()))
                    .header("Accept", "application/vnd.github+json")
                    .header("User-Agent", self.config.user_agent.clone());
                if let Some(r) = &git_ref {
                    request = request.query(&[("ref", r.as_str())]);
                }
                request
            })
            .await?;

        #[derive(serde::Deserialize)]
        struct ContentResponse {
            content: String,
            sha: String,
            path: String,
        }

        let body: ContentResponse = response.json().await.map_err(ApiError::HttpClientError)?;
        let cleaned: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| ApiError::InvalidRequest {
                message: format!("invalid base64 content: {e}"),
            })?;

        Ok(RepositoryContent {
            path: body.path,
            content: decoded,
            sha: body.sha,
        })
    }
}

#[async_trait]
impl GitHubApiClient for GitHubClient {
    async fn create_installation_access_token(
        &self,
        installation_id: InstallationId,
        jwt: &JsonWebToken,
    ) -> Result<InstallationAccessToken, ApiError> {
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.config.github_api_url,
            installation_id.as_u64()
        );

        let response = self
            .resilient
            .execute_rest(|client| {
                client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", jwt.token()))
                    .header("Accept", "application/vnd.github+json")
                    .header("User-Agent", self.config.user_agent.clone())
            })
            .await
            .map_err(|err| match err {
                ApiError::HttpError { status, message } => {
                    ApiError::InstallationTokenFailed { status, body: message }
                }
                other => other,
            })?;

        #[derive(serde::Deserialize)]
        struct AccessTokenResponse {
            token: String,
            expires_at: chrono::DateTime<chrono::Utc>,
        }

        let body_bytes = response.bytes().await.map_err(ApiError::HttpClientError)?;
        if body_bytes.is_empty() {
            return Err(ApiError::InstallationTokenInvalid);
        }

        let parsed: AccessTokenResponse = serde_json::from_slice(&body_bytes).map_err(|e| {
            ApiError::InstallationTokenInvalidJson {
                message: e.to_string(),
            }
        })?;

        Ok(InstallationAccessToken::new(
            parsed.token,
            installation_id,
            parsed.expires_at,
        ))
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
