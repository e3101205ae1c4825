//! # webhook-core
//!
//! Domain core of the GitHub App webhook runtime: the data model, storage/
//! idempotency/queue port traits, the event router and handler registry, the
//! webhook intake pipeline, and the repository-file configuration loader.
//!
//! No I/O driver lives in this crate. It depends on [`github_bot_sdk`] for
//! installation auth, the resilient outbound HTTP pipeline, and webhook
//! signature validation, and exposes trait boundaries for everything else
//! (durable storage, the replay queue, the dead-letter store) so the service
//! crate can supply concrete adapters at startup.

pub mod adapters;
pub mod config;
pub mod error;
pub mod intake;
pub mod metrics;
pub mod model;
pub mod ports;
pub mod replay_policy;
pub mod router;

pub use config::{ArrayMergeStrategy, RepositoryConfigLoader, RepositoryConfigOptions, RepositoryContentFetcher};
pub use error::{ConfigLoaderError, IntakeError, QueueError, ReplayError, RouterError};
pub use intake::{IntakePipeline, ProcessOutcome, IDEMPOTENCY_TTL};
pub use metrics::{Metrics, NoopMetrics, RecordingMetrics};
pub use model::{
    DeadLetterItem, EnqueueReplayCommand, HandlerRegistration, IdempotencyKey, ProcessWebhookCommand,
    RepositoryConfigPath, WebhookDelivery, WEBHOOK_DELIVERY_SCHEMA_VERSION,
};
pub use ports::{Clock, DeadLetterStore, DeliveryStore, IdempotencyStore, ReplayQueue, SystemClock, WebhookSecretProvider};
pub use replay_policy::ReplayPolicy;
pub use router::{EventRouter, Handler, HandlerContext, IssueRef, PullRequestRef, RepositoryInfo};
