//! Configuration surface (spec section 6), loaded the way the teacher loads
//! its own: `config` crate, layered defaults -> `config/default.toml` ->
//! `config/{RUN_ENV}.toml` -> environment variables prefixed `WEBHOOK_` and
//! nested via `__` (e.g. `WEBHOOK_REPLAY__MAX_RETRY_ATTEMPTS`).

use config::{Config as RawConfig, ConfigError as RawConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::error::ServiceError;

/// `persistence.provider`. Only `in_memory` is backed by this binary; the
/// others are accepted by the schema but rejected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceProvider {
    InMemory,
    Sqlite,
    Postgres,
}

/// `cache.provider` / `idempotency.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyValueProvider {
    InMemory,
    Redis,
}

/// `replay_queue.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueProvider {
    InMemory,
    Filesystem,
    Redis,
}

/// `dead_letter_queue.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterProvider {
    InMemory,
    Filesystem,
    Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub shutdown_grace_period_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_grace_period_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceSettings {
    pub provider: PersistenceProvider,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            provider: PersistenceProvider::InMemory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub provider: KeyValueProvider,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            provider: KeyValueProvider::InMemory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencySettings {
    pub provider: KeyValueProvider,
}

impl Default for IdempotencySettings {
    fn default() -> Self {
        Self {
            provider: KeyValueProvider::InMemory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayQueueSettings {
    pub provider: QueueProvider,
    /// Base directory for the `filesystem` provider; ignored otherwise.
    pub filesystem_path: String,
}

impl Default for ReplayQueueSettings {
    fn default() -> Self {
        Self {
            provider: QueueProvider::InMemory,
            filesystem_path: "./data/replay-queue".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeadLetterQueueSettings {
    pub provider: DeadLetterProvider,
    pub filesystem_path: String,
}

impl Default for DeadLetterQueueSettings {
    fn default() -> Self {
        Self {
            provider: DeadLetterProvider::InMemory,
            filesystem_path: "./data/dead-letters".to_string(),
        }
    }
}

/// Replay worker backoff policy, spelled the way the configuration surface
/// names it (seconds as plain numbers, not `Duration`s) before being
/// converted into a [`webhook_core::ReplayPolicy`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaySettings {
    pub max_retry_attempts: u32,
    pub initial_backoff_seconds: u64,
    pub max_backoff_seconds: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
    pub poll_interval_seconds: u64,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        let policy = webhook_core::ReplayPolicy::default();
        Self {
            max_retry_attempts: policy.max_attempts,
            initial_backoff_seconds: policy.initial_backoff.as_secs(),
            max_backoff_seconds: policy.max_backoff.as_secs(),
            backoff_multiplier: policy.multiplier,
            jitter_factor: policy.jitter_factor,
            poll_interval_seconds: policy.poll_interval.as_secs(),
        }
    }
}

impl ReplaySettings {
    pub fn to_policy(&self) -> webhook_core::ReplayPolicy {
        webhook_core::ReplayPolicy {
            max_attempts: self.max_retry_attempts,
            initial_backoff: Duration::from_secs(self.initial_backoff_seconds),
            max_backoff: Duration::from_secs(self.max_backoff_seconds),
            multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
        }
    }
}

/// Matches `webhook_core::config::ArrayMergeStrategy` but deserializes from
/// the plain lowercase strings the configuration surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayMergeStrategySetting {
    Replace,
    Concatenate,
    DeepMergeByIndex,
}

impl From<ArrayMergeStrategySetting> for webhook_core::ArrayMergeStrategy {
    fn from(value: ArrayMergeStrategySetting) -> Self {
        match value {
            ArrayMergeStrategySetting::Replace => webhook_core::ArrayMergeStrategy::Replace,
            ArrayMergeStrategySetting::Concatenate => webhook_core::ArrayMergeStrategy::Concatenate,
            ArrayMergeStrategySetting::DeepMergeByIndex => webhook_core::ArrayMergeStrategy::DeepMergeByIndex,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfigSettings {
    pub enable_github_directory_cascade: bool,
    pub enable_organization_config: bool,
    pub enable_extends_key: bool,
    pub max_extends_depth: u8,
    pub array_merge_strategy: ArrayMergeStrategySetting,
    pub default_file_name: String,
}

impl Default for RepositoryConfigSettings {
    fn default() -> Self {
        let options = webhook_core::RepositoryConfigOptions::default();
        Self {
            enable_github_directory_cascade: options.enable_github_directory_cascade,
            enable_organization_config: options.enable_organization_config,
            enable_extends_key: options.enable_extends_key,
            max_extends_depth: options.max_extends_depth,
            array_merge_strategy: ArrayMergeStrategySetting::Replace,
            default_file_name: options.default_file_name,
        }
    }
}

impl RepositoryConfigSettings {
    pub fn to_options(&self) -> webhook_core::RepositoryConfigOptions {
        webhook_core::RepositoryConfigOptions {
            enable_github_directory_cascade: self.enable_github_directory_cascade,
            enable_organization_config: self.enable_organization_config,
            enable_extends_key: self.enable_extends_key,
            max_extends_depth: self.max_extends_depth,
            array_merge_strategy: self.array_merge_strategy.into(),
            default_file_name: self.default_file_name.clone(),
            ..webhook_core::RepositoryConfigOptions::default()
        }
    }
}

/// The App-JWT credentials needed for installation auth (spec section 4.4).
/// `private_key` carries either an inline PEM blob or a filesystem path;
/// [`crate::secrets::load_private_key_pem`] resolves which.
#[derive(Debug, Clone, Deserialize)]
pub struct AppCredentials {
    pub app_id: u64,
    pub private_key: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// The full, validated configuration surface of spec section 6.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub webhook_secret: String,
    pub app: AppCredentials,
    pub base_url: Option<String>,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub idempotency: IdempotencySettings,
    #[serde(default)]
    pub replay_queue: ReplayQueueSettings,
    #[serde(default)]
    pub dead_letter_queue: DeadLetterQueueSettings,
    #[serde(default)]
    pub replay: ReplaySettings,
    #[serde(default)]
    pub repository_config: RepositoryConfigSettings,
}

impl ServiceConfig {
    /// Loads configuration from (in increasing precedence): built-in
    /// defaults, `config/default.toml`, `config/{RUN_ENV}.toml`, then
    /// environment variables prefixed `WEBHOOK_` with `__` as the nesting
    /// separator (e.g. `WEBHOOK_SERVER__PORT=9000`).
    pub fn load() -> Result<Self, ServiceError> {
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        let raw = RawConfig::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(Environment::with_prefix("WEBHOOK").separator("__"))
            .build()
            .map_err(config_error)?;

        let config: Self = raw.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.webhook_secret.is_empty() {
            return Err(ServiceError::Configuration {
                message: "webhook_secret must not be empty".to_string(),
            });
        }
        self.replay.to_policy().validate().map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        match self.persistence.provider {
            PersistenceProvider::InMemory => {}
            PersistenceProvider::Sqlite => {
                return Err(ServiceError::UnsupportedProvider {
                    setting: "persistence.provider".to_string(),
                    provider: "sqlite".to_string(),
                })
            }
            PersistenceProvider::Postgres => {
                return Err(ServiceError::UnsupportedProvider {
                    setting: "persistence.provider".to_string(),
                    provider: "postgres".to_string(),
                })
            }
        }
        if self.cache.provider == KeyValueProvider::Redis {
            return Err(ServiceError::UnsupportedProvider {
                setting: "cache.provider".to_string(),
                provider: "redis".to_string(),
            });
        }
        if self.idempotency.provider == KeyValueProvider::Redis {
            return Err(ServiceError::UnsupportedProvider {
                setting: "idempotency.provider".to_string(),
                provider: "redis".to_string(),
            });
        }
        if self.replay_queue.provider == QueueProvider::Redis {
            return Err(ServiceError::UnsupportedProvider {
                setting: "replay_queue.provider".to_string(),
                provider: "redis".to_string(),
            });
        }
        if self.dead_letter_queue.provider == DeadLetterProvider::Database {
            return Err(ServiceError::UnsupportedProvider {
                setting: "dead_letter_queue.provider".to_string(),
                provider: "database".to_string(),
            });
        }
        Ok(())
    }
}

fn config_error(err: RawConfigError) -> ServiceError {
    ServiceError::Configuration {
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
