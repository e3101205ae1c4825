//! Startup wiring (spec section 6/4.4): turns a loaded [`ServiceConfig`]
//! into the concrete adapters, installation-auth stack, and pipeline/worker
//! pair the binary actually runs. Grounded on the teacher's
//! `queue-keeper-api::lib::start_server` -- a single function that builds
//! `AppState` and hands back what `main.rs` needs to serve and shut down.

use std::sync::Arc;

use github_bot_sdk::auth::{AuthConfig, AuthenticationProvider, GitHubAppAuth, InMemoryTokenCache, RS256JwtGenerator};
use github_bot_sdk::client::{ClientConfig, GitHubClient};
use github_bot_sdk::webhook::SignatureValidator;
use webhook_core::adapters::{InMemoryDeadLetterStore, InMemoryDeliveryStore, InMemoryIdempotencyStore};
use webhook_core::ports::{Clock, DeadLetterStore, DeliveryStore, IdempotencyStore, ReplayQueue, SystemClock};
use webhook_core::{EventRouter, IntakePipeline, Metrics as CoreMetrics, RepositoryConfigLoader};

use crate::adapters::{FilesystemDeadLetterQueue, FilesystemReplayQueue, GitHubContentFetcher, InMemoryReplayQueue};
use crate::config::{DeadLetterProvider, QueueProvider, ServiceConfig};
use crate::error::ServiceError;
use crate::http::AppState;
use crate::metrics::PrometheusMetrics;
use crate::secrets::{load_private_key_pem, ConfigSecretProvider, ConfigWebhookSecretProvider};
use crate::worker::ReplayWorker;

/// Everything `main.rs` needs to serve traffic and run the replay worker,
/// assembled from one [`ServiceConfig`].
pub struct Application {
    pub state: AppState,
    pub worker: ReplayWorker,
    /// Exposed so a future repository-config HTTP surface or handler can
    /// resolve cascading per-repository config; unused by the intake
    /// pipeline itself, which only routes and persists.
    pub repository_config_loader: Arc<RepositoryConfigLoader>,
}

/// Builds the full dependency graph for `config`: storage adapters selected
/// by provider, the installation-auth stack, the repository config loader,
/// the event router (no handler is registered by default -- see
/// `EventRouter::handler_count` for the opt-in readiness check this leaves
/// room for), the intake pipeline, and the replay worker.
pub fn build(config: &ServiceConfig) -> Result<Application, ServiceError> {
    let metrics = Arc::new(PrometheusMetrics::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let delivery_store: Arc<dyn DeliveryStore> = Arc::new(InMemoryDeliveryStore::new());
    let idempotency_store: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new());
    let ingress_idempotency: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new());

    let replay_queue: Arc<dyn ReplayQueue> = match config.replay_queue.provider {
        QueueProvider::InMemory => Arc::new(InMemoryReplayQueue::new()),
        QueueProvider::Filesystem => Arc::new(FilesystemReplayQueue::new(config.replay_queue.filesystem_path.clone())),
        QueueProvider::Redis => {
            return Err(ServiceError::UnsupportedProvider {
                setting: "replay_queue.provider".to_string(),
                provider: "redis".to_string(),
            })
        }
    };

    let dead_letters: Arc<dyn DeadLetterStore> = match config.dead_letter_queue.provider {
        DeadLetterProvider::InMemory => Arc::new(InMemoryDeadLetterStore::new()),
        DeadLetterProvider::Filesystem => {
            Arc::new(FilesystemDeadLetterQueue::new(config.dead_letter_queue.filesystem_path.clone()))
        }
        DeadLetterProvider::Database => {
            return Err(ServiceError::UnsupportedProvider {
                setting: "dead_letter_queue.provider".to_string(),
                provider: "database".to_string(),
            })
        }
    };

    let webhook_secrets: Arc<dyn webhook_core::ports::WebhookSecretProvider> =
        Arc::new(ConfigWebhookSecretProvider::new(config));

    let private_key_pem = load_private_key_pem(&config.app.private_key)?;
    let signature_secret_provider: Arc<dyn github_bot_sdk::auth::SecretProvider> =
        Arc::new(ConfigSecretProvider::new(config, private_key_pem.clone()));
    let signature_validator = Arc::new(SignatureValidator::new(signature_secret_provider));

    let secret_provider = ConfigSecretProvider::new(config, private_key_pem.clone());

    let jwt_signer = RS256JwtGenerator::new(
        github_bot_sdk::auth::PrivateKey::from_pem(private_key_pem.expose()).map_err(|e| ServiceError::Configuration {
            message: format!("app.private_key: {e}"),
        })?,
    );

    let client_config = ClientConfig::default()
        .with_user_agent(format!("webhook-service/{}", env!("CARGO_PKG_VERSION")));
    let api_client = GitHubClient::new(client_config).map_err(|e| ServiceError::AdapterInit {
        message: format!("failed to build GitHub API client: {e}"),
    })?;
    let token_cache = InMemoryTokenCache::new();
    let auth_config = AuthConfig {
        github_api_url: config
            .base_url
            .clone()
            .unwrap_or_else(|| AuthConfig::default().github_api_url),
        ..AuthConfig::default()
    };

    let auth: Arc<dyn AuthenticationProvider> = Arc::new(GitHubAppAuth::new(
        secret_provider,
        jwt_signer,
        api_client,
        token_cache,
        auth_config,
    ));

    let content_client = Arc::new(GitHubClient::new(ClientConfig::default()).map_err(|e| ServiceError::AdapterInit {
        message: format!("failed to build GitHub content-fetch client: {e}"),
    })?);
    let content_fetcher = GitHubContentFetcher::new(content_client, Arc::clone(&auth));
    let repository_config_loader = Arc::new(RepositoryConfigLoader::new(
        Arc::new(content_fetcher),
        config.repository_config.to_options(),
    ));

    // No business handlers are registered by default -- `handler_count`-based
    // readiness stays off unless a deployment adds registrations here before
    // the router is wrapped (`register` takes `&mut self`).
    let router = EventRouter::new();
    let router = Arc::new(router);

    let pipeline = Arc::new(
        IntakePipeline::new(
            signature_validator,
            webhook_secrets,
            delivery_store,
            idempotency_store,
            Arc::clone(&clock),
            router,
            Arc::clone(&metrics) as Arc<dyn CoreMetrics>,
        )
        .with_auth(auth),
    );

    let state = AppState::new(Arc::clone(&pipeline), ingress_idempotency, Arc::clone(&metrics));

    let worker = ReplayWorker::new(
        replay_queue,
        dead_letters,
        pipeline,
        config.replay.to_policy(),
        clock,
        Arc::clone(&metrics) as Arc<dyn CoreMetrics>,
    );

    Ok(Application {
        state,
        worker,
        repository_config_loader,
    })
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
