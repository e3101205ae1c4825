//! Tests for GitHub App token management.

use super::*;
use crate::error::{ApiError, CacheError, SecretError, SigningError, ValidationError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Implementations
// ============================================================================

struct MockSecretProvider {
    app_id: GitHubAppId,
    private_key: PrivateKey,
    webhook_secret: String,
}

impl MockSecretProvider {
    fn new(app_id: u64) -> Self {
        Self {
            app_id: GitHubAppId::new(app_id),
            private_key: PrivateKey::new(b"mock-private-key-data".to_vec(), KeyAlgorithm::RS256),
            webhook_secret: "mock-webhook-secret".to_string(),
        }
    }
}

#[async_trait]
impl SecretProvider for MockSecretProvider {
    async fn get_private_key(&self) -> Result<PrivateKey, SecretError> {
        Ok(self.private_key.clone())
    }

    async fn get_app_id(&self) -> Result<GitHubAppId, SecretError> {
        Ok(self.app_id)
    }

    async fn get_webhook_secret(&self) -> Result<String, SecretError> {
        Ok(self.webhook_secret.clone())
    }

    fn cache_duration(&self) -> Duration {
        Duration::minutes(5)
    }
}

struct MockJwtSigner {
    should_fail: bool,
}

impl MockJwtSigner {
    fn new() -> Self {
        Self { should_fail: false }
    }

    fn with_failure() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl JwtSigner for MockJwtSigner {
    async fn sign_jwt(
        &self,
        claims: JwtClaims,
        _private_key: &PrivateKey,
    ) -> Result<JsonWebToken, SigningError> {
        if self.should_fail {
            return Err(SigningError::SigningFailed {
                message: "Mock signing failure".to_string(),
            });
        }

        let expires_at = Utc::now() + Duration::seconds(claims.exp - claims.iat);
        Ok(JsonWebToken::new(
            format!("mock.jwt.{}", claims.iss.as_u64()),
            claims.iss,
            expires_at,
        ))
    }

    fn validate_private_key(&self, _key: &PrivateKey) -> Result<(), ValidationError> {
        Ok(())
    }
}

struct MockGitHubApiClient {
    installation_tokens: Arc<Mutex<HashMap<InstallationId, InstallationAccessToken>>>,
    should_fail: bool,
}

impl MockGitHubApiClient {
    fn new() -> Self {
        Self {
            installation_tokens: Arc::new(Mutex::new(HashMap::new())),
            should_fail: false,
        }
    }

    fn with_failure() -> Self {
        Self {
            installation_tokens: Arc::new(Mutex::new(HashMap::new())),
            should_fail: true,
        }
    }
}

#[async_trait]
impl GitHubApiClient for MockGitHubApiClient {
    async fn create_installation_access_token(
        &self,
        installation_id: InstallationId,
        _jwt: &JsonWebToken,
    ) -> Result<InstallationAccessToken, ApiError> {
        if self.should_fail {
            return Err(ApiError::HttpError {
                status: 500,
                message: "Mock API failure".to_string(),
            });
        }

        let token = InstallationAccessToken::new(
            format!("ghs_mock_token_{}", installation_id.as_u64()),
            installation_id,
            Utc::now() + Duration::hours(1),
        );

        self.installation_tokens
            .lock()
            .unwrap()
            .insert(installation_id, token.clone());

        Ok(token)
    }
}

struct MockTokenCache {
    jwt_cache: Arc<Mutex<HashMap<GitHubAppId, JsonWebToken>>>,
    installation_cache: Arc<Mutex<HashMap<InstallationId, InstallationAccessToken>>>,
    should_fail: bool,
}

impl MockTokenCache {
    fn new() -> Self {
        Self {
            jwt_cache: Arc::new(Mutex::new(HashMap::new())),
            installation_cache: Arc::new(Mutex::new(HashMap::new())),
            should_fail: false,
        }
    }

    fn with_failure() -> Self {
        Self {
            jwt_cache: Arc::new(Mutex::new(HashMap::new())),
            installation_cache: Arc::new(Mutex::new(HashMap::new())),
            should_fail: true,
        }
    }
}

#[async_trait]
impl TokenCache for MockTokenCache {
    async fn get_jwt(&self, app_id: GitHubAppId) -> Result<Option<JsonWebToken>, CacheError> {
        if self.should_fail {
            return Err(CacheError::OperationFailed {
                message: "Mock cache failure".to_string(),
            });
        }

        Ok(self.jwt_cache.lock().unwrap().get(&app_id).cloned())
    }

    async fn store_jwt(&self, jwt: JsonWebToken) -> Result<(), CacheError> {
        if self.should_fail {
            return Err(CacheError::OperationFailed {
                message: "Mock cache failure".to_string(),
            });
        }

        self.jwt_cache.lock().unwrap().insert(jwt.app_id(), jwt.clone());
        Ok(())
    }

    async fn get_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<Option<InstallationAccessToken>, CacheError> {
        if self.should_fail {
            return Err(CacheError::OperationFailed {
                message: "Mock cache failure".to_string(),
            });
        }

        Ok(self
            .installation_cache
            .lock()
            .unwrap()
            .get(&installation_id)
            .cloned())
    }

    async fn store_installation_token(
        &self,
        token: InstallationAccessToken,
    ) -> Result<(), CacheError> {
        if self.should_fail {
            return Err(CacheError::OperationFailed {
                message: "Mock cache failure".to_string(),
            });
        }

        self.installation_cache
            .lock()
            .unwrap()
            .insert(token.installation_id(), token.clone());
        Ok(())
    }

    async fn invalidate_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<(), CacheError> {
        if self.should_fail {
            return Err(CacheError::OperationFailed {
                message: "Mock cache failure".to_string(),
            });
        }

        self.installation_cache.lock().unwrap().remove(&installation_id);
        Ok(())
    }

    fn cleanup_expired_tokens(&self) {}
}

// ============================================================================
// Test Helper Functions
// ============================================================================

fn create_test_auth(
) -> GitHubAppAuth<MockSecretProvider, MockJwtSigner, MockGitHubApiClient, MockTokenCache> {
    let config = AuthConfig::default();
    GitHubAppAuth::new(
        MockSecretProvider::new(12345),
        MockJwtSigner::new(),
        MockGitHubApiClient::new(),
        MockTokenCache::new(),
        config,
    )
}

// ============================================================================
// AuthConfig Tests
// ============================================================================

mod auth_config_tests {
    use super::*;

    #[test]
    fn test_default_auth_config() {
        let config = AuthConfig::default();

        assert_eq!(config.jwt_expiration, Duration::minutes(10));
        assert_eq!(config.jwt_refresh_margin, Duration::minutes(2));
        assert_eq!(config.token_cache_ttl, Duration::minutes(55));
        assert_eq!(config.token_refresh_margin, Duration::minutes(5));
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert_eq!(config.user_agent, "github-bot-sdk");
    }
}

// ============================================================================
// GitHubAppAuth Construction Tests
// ============================================================================

mod construction_tests {
    use super::*;

    #[test]
    fn test_create_github_app_auth() {
        let auth = create_test_auth();
        assert_eq!(auth.config().jwt_expiration, Duration::minutes(10));
    }

    #[test]
    fn test_create_with_custom_config() {
        let mut config = AuthConfig::default();
        config.github_api_url = "https://github.enterprise.local/api/v3".to_string();
        config.user_agent = "my-bot/1.0".to_string();

        let auth = GitHubAppAuth::new(
            MockSecretProvider::new(12345),
            MockJwtSigner::new(),
            MockGitHubApiClient::new(),
            MockTokenCache::new(),
            config,
        );

        assert_eq!(
            auth.config().github_api_url,
            "https://github.enterprise.local/api/v3"
        );
        assert_eq!(auth.config().user_agent, "my-bot/1.0");
    }
}

// ============================================================================
// App Token (JWT) Tests
// ============================================================================

mod app_token_tests {
    use super::*;

    #[tokio::test]
    async fn test_app_token_generates_jwt() {
        let auth = create_test_auth();

        let jwt = auth.app_token().await.expect("Should generate JWT");

        assert_eq!(jwt.app_id(), GitHubAppId::new(12345));
        assert!(!jwt.is_expired());
        assert!(jwt.token().starts_with("mock.jwt."));
    }

    #[tokio::test]
    async fn test_app_token_uses_cache() {
        let auth = create_test_auth();

        let jwt1 = auth.app_token().await.expect("First call should succeed");
        let jwt2 = auth.app_token().await.expect("Second call should succeed");

        assert_eq!(jwt1.token(), jwt2.token());
    }

    #[tokio::test]
    async fn test_app_token_signing_failure() {
        let auth = GitHubAppAuth::new(
            MockSecretProvider::new(12345),
            MockJwtSigner::with_failure(),
            MockGitHubApiClient::new(),
            MockTokenCache::new(),
            AuthConfig::default(),
        );

        let result = auth.app_token().await;

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), AuthError::SigningError(_)));
    }

    #[tokio::test]
    async fn test_app_token_cache_failure_fallback() {
        let auth = GitHubAppAuth::new(
            MockSecretProvider::new(12345),
            MockJwtSigner::new(),
            MockGitHubApiClient::new(),
            MockTokenCache::with_failure(),
            AuthConfig::default(),
        );

        let result = auth.app_token().await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().app_id(), GitHubAppId::new(12345));
    }
}

// ============================================================================
// Installation Token Tests
// ============================================================================

mod installation_token_tests {
    use super::*;

    #[tokio::test]
    async fn test_installation_token_exchange() {
        let auth = create_test_auth();
        let installation_id = InstallationId::new(54321);

        let token = auth
            .installation_token(installation_id)
            .await
            .expect("Should get installation token");

        assert_eq!(token.installation_id(), installation_id);
        assert!(!token.is_expired());
        assert!(token.token().contains("ghs_mock_token"));
    }

    #[tokio::test]
    async fn test_installation_token_caching() {
        let auth = create_test_auth();
        let installation_id = InstallationId::new(54321);

        let token1 = auth
            .installation_token(installation_id)
            .await
            .expect("First call");
        let token2 = auth
            .installation_token(installation_id)
            .await
            .expect("Second call");

        assert_eq!(token1.token(), token2.token());
    }

    #[tokio::test]
    async fn test_installation_token_api_failure() {
        let auth = GitHubAppAuth::new(
            MockSecretProvider::new(12345),
            MockJwtSigner::new(),
            MockGitHubApiClient::with_failure(),
            MockTokenCache::new(),
            AuthConfig::default(),
        );

        let result = auth.installation_token(InstallationId::new(99999)).await;

        assert!(result.is_err());
    }
}

// ============================================================================
// Refresh Token Tests
// ============================================================================

mod refresh_token_tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let auth = create_test_auth();
        let installation_id = InstallationId::new(54321);

        let _token1 = auth.installation_token(installation_id).await.unwrap();

        let token2 = auth
            .refresh_installation_token(installation_id)
            .await
            .unwrap();

        assert_eq!(token2.installation_id(), installation_id);
    }
}
