//! GitHub App authentication types and interfaces.
//!
//! This module provides core authentication types for GitHub Apps including:
//! - ID types (`GitHubAppId`, `InstallationId`)
//! - Token types (`JsonWebToken`, `InstallationAccessToken`)
//! - Authentication trait interfaces
//!
//! See `github-bot-sdk-specs/modules/auth.md` for complete specification.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ApiError, AuthError, CacheError, SecretError, SigningError, ValidationError};

pub mod cache;
pub mod jwt;
pub mod tokens;

pub use cache::InMemoryTokenCache;
pub use jwt::{JwtGenerator, RS256JwtGenerator};
pub use tokens::{AuthConfig, GitHubAppAuth};

// ============================================================================
// Core ID Types
// ============================================================================

/// GitHub App identifier assigned during app registration.
///
/// This is a globally unique identifier for your GitHub App, found in the
/// app settings page. It's used for JWT generation and app identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitHubAppId(u64);

impl GitHubAppId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GitHubAppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GitHubAppId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<u64>().map_err(|_| ValidationError::InvalidFormat {
            field: "github_app_id".to_string(),
            message: "must be a positive integer".to_string(),
        })?;
        Ok(Self::new(id))
    }
}

/// GitHub App installation identifier for specific accounts.
///
/// When a GitHub App is installed on an organization or user account, GitHub
/// assigns an installation ID. This ID is used to obtain installation tokens
/// and perform operations on behalf of that installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationId(u64);

impl InstallationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstallationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<u64>().map_err(|_| ValidationError::InvalidFormat {
            field: "installation_id".to_string(),
            message: "must be a positive integer".to_string(),
        })?;
        Ok(Self::new(id))
    }
}

// ============================================================================
// Token Types
// ============================================================================

/// JWT token for GitHub App authentication.
///
/// JSON Web Tokens (JWTs) are used to authenticate as a GitHub App. They have
/// a maximum lifetime of 10 minutes and are used to obtain installation tokens.
///
/// The token string is never exposed in Debug output for security.
#[derive(Clone)]
pub struct JsonWebToken {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    app_id: GitHubAppId,
}

impl JsonWebToken {
    pub fn new(token: String, app_id: GitHubAppId, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            issued_at: Utc::now(),
            expires_at,
            app_id,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn app_id(&self) -> GitHubAppId {
        self.app_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn expires_soon(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

impl std::fmt::Debug for JsonWebToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebToken")
            .field("app_id", &self.app_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Installation-scoped access token for outbound GitHub API calls.
///
/// Matches the minimal value type required by the intake/dispatch pipeline:
/// a token string plus an expiry instant, with a safety skew applied when
/// checking expiration so a token isn't handed out moments before GitHub
/// would reject it.
#[derive(Clone)]
pub struct InstallationAccessToken {
    token: String,
    installation_id: InstallationId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Safety margin subtracted from `expires_at` before treating a token as usable.
pub const TOKEN_EXPIRY_SKEW: Duration = Duration::seconds(60);

impl InstallationAccessToken {
    pub fn new(token: String, installation_id: InstallationId, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            installation_id,
            issued_at: Utc::now(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` is within `TOKEN_EXPIRY_SKEW` of `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + TOKEN_EXPIRY_SKEW
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True if `expires_at` falls within `margin` of now (for proactive refresh).
    pub fn expires_soon(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

impl std::fmt::Debug for InstallationAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationAccessToken")
            .field("installation_id", &self.installation_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Private key for JWT signing.
///
/// Stores the cryptographic key material for signing JWTs. The key data
/// is never exposed in Debug output for security.
#[derive(Clone)]
pub struct PrivateKey {
    key_data: Vec<u8>,
    algorithm: KeyAlgorithm,
}

impl PrivateKey {
    pub fn new(key_data: Vec<u8>, algorithm: KeyAlgorithm) -> Self {
        Self { key_data, algorithm }
    }

    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }

    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .field("key_data", &"<REDACTED>")
            .finish()
    }
}

/// Key algorithm for JWT signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    RS256,
}

/// JWT claims structure for GitHub App authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer (GitHub App ID)
    pub iss: GitHubAppId,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp, max 10 minutes from iat)
    pub exp: i64,
}

// ============================================================================
// Trait Definitions
// ============================================================================

/// Issues and refreshes installation tokens for outbound GitHub calls.
///
/// This is the SDK-level realization of the `Authenticate(installation_id)`
/// operation: callers never see JWTs directly, only installation tokens.
#[async_trait::async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Obtain (generating if necessary) an App-level JWT.
    async fn app_token(&self) -> Result<JsonWebToken, AuthError>;

    /// Obtain a cached or freshly issued installation access token.
    async fn installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<InstallationAccessToken, AuthError>;

    /// Force-invalidate the cached token and issue a new one.
    async fn refresh_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<InstallationAccessToken, AuthError>;
}

/// Interface for retrieving GitHub App secrets from secure storage.
#[async_trait::async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_private_key(&self) -> Result<PrivateKey, SecretError>;

    async fn get_app_id(&self) -> Result<GitHubAppId, SecretError>;

    async fn get_webhook_secret(&self) -> Result<String, SecretError>;

    fn cache_duration(&self) -> Duration;
}

/// Interface for caching authentication tokens securely.
#[async_trait::async_trait]
pub trait TokenCache: Send + Sync {
    async fn get_jwt(&self, app_id: GitHubAppId) -> Result<Option<JsonWebToken>, CacheError>;

    async fn store_jwt(&self, jwt: JsonWebToken) -> Result<(), CacheError>;

    async fn get_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<Option<InstallationAccessToken>, CacheError>;

    async fn store_installation_token(
        &self,
        token: InstallationAccessToken,
    ) -> Result<(), CacheError>;

    async fn invalidate_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<(), CacheError>;

    /// Best-effort maintenance hook; not on the correctness-critical path.
    fn cleanup_expired_tokens(&self);
}

/// Interface for JWT token generation and signing.
#[async_trait::async_trait]
pub trait JwtSigner: Send + Sync {
    async fn sign_jwt(
        &self,
        claims: JwtClaims,
        private_key: &PrivateKey,
    ) -> Result<JsonWebToken, SigningError>;

    fn validate_private_key(&self, key: &PrivateKey) -> Result<(), ValidationError>;
}

/// Interface for the small slice of the GitHub REST surface this SDK needs.
#[async_trait::async_trait]
pub trait GitHubApiClient: Send + Sync {
    /// `POST /app/installations/{id}/access_tokens`.
    async fn create_installation_access_token(
        &self,
        installation_id: InstallationId,
        jwt: &JsonWebToken,
    ) -> Result<InstallationAccessToken, ApiError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
