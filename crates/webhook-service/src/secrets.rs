//! Secret handling: a `Zeroizing`-wrapped holder for loaded credentials, plus
//! the two provider bridges that hand those secrets to `github_bot_sdk` and
//! `webhook_core` without either crate knowing where they came from.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration as StdDuration;
use zeroize::Zeroizing;

use github_bot_sdk::auth::{GitHubAppId, PrivateKey, SecretProvider};
use github_bot_sdk::error::SecretError;
use webhook_core::ports::WebhookSecretProvider;

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// A secret value that is zeroed on drop. Holds the webhook HMAC secret and
/// the App's RSA private key PEM, the two values that must never linger in
/// a core dump or a log line.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(REDACTED)")
    }
}

/// Resolves `app.private_key`: a path to a PEM file if it names one that
/// exists on disk, otherwise the value itself treated as inline PEM.
pub fn load_private_key_pem(raw: &str) -> Result<Secret, ServiceError> {
    if Path::new(raw).is_file() {
        let contents = std::fs::read_to_string(raw).map_err(|e| ServiceError::Configuration {
            message: format!("failed to read private key file `{raw}`: {e}"),
        })?;
        Ok(Secret::new(contents))
    } else {
        Ok(Secret::new(raw.to_string()))
    }
}

/// Bridges the loaded configuration to `github_bot_sdk::auth::SecretProvider`,
/// the seam `GitHubAppAuth` is generic over.
pub struct ConfigSecretProvider {
    app_id: GitHubAppId,
    private_key_pem: Secret,
    webhook_secret: Secret,
}

impl ConfigSecretProvider {
    pub fn new(config: &ServiceConfig, private_key_pem: Secret) -> Self {
        Self {
            app_id: GitHubAppId::new(config.app.app_id),
            private_key_pem,
            webhook_secret: Secret::new(config.webhook_secret.clone()),
        }
    }
}

#[async_trait]
impl SecretProvider for ConfigSecretProvider {
    async fn get_private_key(&self) -> Result<PrivateKey, SecretError> {
        PrivateKey::from_pem(self.private_key_pem.expose()).map_err(|e| SecretError::InvalidFormat {
            key: format!("app.private_key: {e}"),
        })
    }

    async fn get_app_id(&self) -> Result<GitHubAppId, SecretError> {
        Ok(self.app_id)
    }

    async fn get_webhook_secret(&self) -> Result<String, SecretError> {
        Ok(self.webhook_secret.expose().to_string())
    }

    fn cache_duration(&self) -> StdDuration {
        StdDuration::from_secs(5 * 60)
    }
}

/// Bridges the same configured webhook secret to `webhook_core`'s narrower
/// port, so the intake pipeline doesn't need to depend on `github_bot_sdk`'s
/// broader `SecretProvider` just to read one field.
pub struct ConfigWebhookSecretProvider {
    webhook_secret: Secret,
}

impl ConfigWebhookSecretProvider {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            webhook_secret: Secret::new(config.webhook_secret.clone()),
        }
    }
}

#[async_trait]
impl WebhookSecretProvider for ConfigWebhookSecretProvider {
    async fn webhook_secret(&self) -> Result<Option<String>, String> {
        Ok(Some(self.webhook_secret.expose().to_string()))
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
