//! Token caching implementation for GitHub App authentication.
//!
//! Provides thread-safe, TTL-aware caching for JWT and installation tokens.
//! The expiry checks used here (`JsonWebToken::expires_soon` /
//! `InstallationAccessToken::is_expired`) are already skew-aware, so this
//! cache itself only needs to track "do we have a token, and is it that
//! token's own business whether it's stale".

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{GitHubAppId, InstallationAccessToken, InstallationId, JsonWebToken, TokenCache};
use crate::error::CacheError;

/// In-memory token cache.
///
/// Thread-safe caching for both JWT and installation tokens, with stale
/// entries dropped lazily by `cleanup_expired_tokens`.
pub struct InMemoryTokenCache {
    jwt_cache: Arc<RwLock<HashMap<GitHubAppId, JsonWebToken>>>,
    installation_cache: Arc<RwLock<HashMap<InstallationId, InstallationAccessToken>>>,
}

impl InMemoryTokenCache {
    /// Create a new in-memory token cache.
    pub fn new() -> Self {
        Self {
            jwt_cache: Arc::new(RwLock::new(HashMap::new())),
            installation_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get_jwt(&self, app_id: GitHubAppId) -> Result<Option<JsonWebToken>, CacheError> {
        let cache = self.jwt_cache.read().map_err(|_| CacheError::OperationFailed {
            message: "jwt cache lock poisoned".to_string(),
        })?;
        Ok(cache.get(&app_id).cloned())
    }

    async fn store_jwt(&self, jwt: JsonWebToken) -> Result<(), CacheError> {
        let mut cache = self.jwt_cache.write().map_err(|_| CacheError::OperationFailed {
            message: "jwt cache lock poisoned".to_string(),
        })?;
        cache.insert(jwt.app_id(), jwt);
        Ok(())
    }

    async fn get_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<Option<InstallationAccessToken>, CacheError> {
        let cache = self
            .installation_cache
            .read()
            .map_err(|_| CacheError::OperationFailed {
                message: "installation cache lock poisoned".to_string(),
            })?;
        Ok(cache.get(&installation_id).cloned())
    }

    async fn store_installation_token(&self, token: InstallationAccessToken) -> Result<(), CacheError> {
        let mut cache =
            self.installation_cache
                .write()
                .map_err(|_| CacheError::OperationFailed {
                    message: "installation cache lock poisoned".to_string(),
                })?;
        cache.insert(token.installation_id(), token);
        Ok(())
    }

    async fn invalidate_installation_token(
        &self,
        installation_id: InstallationId,
    ) -> Result<(), CacheError> {
        let mut cache =
            self.installation_cache
                .write()
                .map_err(|_| CacheError::OperationFailed {
                    message: "installation cache lock poisoned".to_string(),
                })?;
        cache.remove(&installation_id);
        Ok(())
    }

    fn cleanup_expired_tokens(&self) {
        if let Ok(mut cache) = self.jwt_cache.write() {
            cache.retain(|_, jwt| !jwt.is_expired());
        }
        if let Ok(mut cache) = self.installation_cache.write() {
            cache.retain(|_, token| !token.is_expired());
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
