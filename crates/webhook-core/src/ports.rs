//! Port traits the intake pipeline, replay worker, and config loader depend
//! on. No I/O driver lives in this crate; concrete adapters (Postgres,
//! Redis, the filesystem) are the service crate's concern, selected at
//! startup from configuration. This module only carries the trait
//! boundaries plus the in-memory reference implementations used by tests
//! and by default (non-production) wiring.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::QueueError;
use crate::model::{DeadLetterItem, EnqueueReplayCommand, IdempotencyKey, WebhookDelivery};

/// Durable delivery storage. The webhook-intake use case exclusively owns
/// write access; everything else only reads.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn find_by_delivery_id(&self, delivery_id: &str) -> Result<Option<WebhookDelivery>, String>;

    async fn save(&self, delivery: WebhookDelivery) -> Result<(), String>;
}

/// Distributed fast-path dedup. Acquisition is atomic "set-if-absent" with a
/// TTL; failure to acquire is non-fatal to callers since the delivery store
/// is the authoritative dedup source.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Returns `true` if this call was the first to acquire the key.
    async fn try_acquire(&self, key: &IdempotencyKey, ttl: Duration) -> Result<bool, String>;
}

/// A clock abstraction so intake timestamps are testable without sleeping or
/// patching global time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// `Clock` backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Supplies the webhook secret used to validate inbound signatures. Kept as
/// its own narrow port (rather than reusing `github_bot_sdk::auth::SecretProvider`
/// directly) so the intake pipeline's dependency surface stays exactly the
/// one field spec section 4.1 needs.
#[async_trait]
pub trait WebhookSecretProvider: Send + Sync {
    async fn webhook_secret(&self) -> Result<Option<String>, String>;
}

/// FIFO-ish (not strictly ordered) replay queue. Guarantees at-least-once
/// dequeue; an implementation choice (in-memory, filesystem, Redis) is a
/// configuration concern of the service crate.
#[async_trait]
pub trait ReplayQueue: Send + Sync {
    async fn enqueue(&self, command: EnqueueReplayCommand) -> Result<(), QueueError>;

    async fn dequeue(&self) -> Result<Option<EnqueueReplayCommand>, QueueError>;
}

/// Sink for commands whose processing exceeded `max_attempts`.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    async fn save(&self, item: DeadLetterItem) -> Result<(), QueueError>;

    async fn list(&self) -> Result<Vec<DeadLetterItem>, QueueError>;
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
