//! Data model (spec section 3): the flat, immutable records threaded through
//! the intake pipeline, replay queue, and dead-letter store.
//!
//! These are tagged-variant-free records on purpose: no inheritance, no
//! polymorphic hierarchy. A delivery once persisted is never mutated; the
//! replay types are values, not entities, and their "mutation" methods all
//! return a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Current schema version written to every persisted `WebhookDelivery`, so
/// the storage port can evolve the row/document shape later without a
/// breaking change.
pub const WEBHOOK_DELIVERY_SCHEMA_VERSION: u8 = 1;

/// A single, durably persisted webhook delivery.
///
/// `delivery_id` is globally unique (GitHub's `X-GitHub-Delivery` value); a
/// delivery once persisted is never edited. Retention is bounded by an
/// external policy not prescribed by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub delivery_id: String,
    pub event_name: String,
    pub event_action: Option<String>,
    pub received_at: DateTime<Utc>,
    pub payload: Value,
    pub installation_id: Option<u64>,
    pub schema_version: u8,
}

impl WebhookDelivery {
    pub fn new(
        delivery_id: impl Into<String>,
        event_name: impl Into<String>,
        event_action: Option<String>,
        received_at: DateTime<Utc>,
        payload: Value,
        installation_id: Option<u64>,
    ) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            event_name: event_name.into(),
            event_action,
            received_at,
            payload,
            installation_id,
            schema_version: WEBHOOK_DELIVERY_SCHEMA_VERSION,
        }
    }
}

/// The immutable reconstruction of an intake call. Drives both first-time
/// processing (built straight from the HTTP request) and replayed processing
/// (rehydrated from a queued `EnqueueReplayCommand`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessWebhookCommand {
    pub delivery_id: String,
    pub event_name: String,
    pub payload: Value,
    pub installation_id: Option<u64>,
    pub raw_payload: Vec<u8>,
    pub signature: String,
}

impl ProcessWebhookCommand {
    pub fn new(
        delivery_id: impl Into<String>,
        event_name: impl Into<String>,
        payload: Value,
        installation_id: Option<u64>,
        raw_payload: Vec<u8>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            event_name: event_name.into(),
            payload,
            installation_id,
            raw_payload,
            signature: signature.into(),
        }
    }

    /// The `action` field of the payload, if present and a string.
    pub fn event_action(&self) -> Option<String> {
        self.payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Wraps a `ProcessWebhookCommand` with an attempt counter for the replay
/// queue. `attempt` starts at 0 for a never-yet-replayed delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueReplayCommand {
    pub command: ProcessWebhookCommand,
    pub attempt: u32,
}

impl EnqueueReplayCommand {
    pub fn first_attempt(command: ProcessWebhookCommand) -> Self {
        Self { command, attempt: 0 }
    }

    /// Returns a new value with `attempt + 1`; `self` is left unmodified.
    pub fn next_attempt(&self) -> Self {
        Self {
            command: self.command.clone(),
            attempt: self.attempt + 1,
        }
    }
}

/// A command that exceeded `max_attempts` and was diverted to the
/// dead-letter store. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterItem {
    pub id: Uuid,
    pub command: EnqueueReplayCommand,
    pub reason: String,
    /// When the *last* processing attempt failed.
    pub failed_at: DateTime<Utc>,
    /// When the DLQ write itself happened; usually equal to `failed_at` but
    /// kept distinct since the write can be delayed by queue backpressure.
    pub moved_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl DeadLetterItem {
    pub fn new(
        command: EnqueueReplayCommand,
        reason: impl Into<String>,
        failed_at: DateTime<Utc>,
        moved_at: DateTime<Utc>,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
            reason: reason.into(),
            failed_at,
            moved_at,
            last_error,
        }
    }
}

/// Opaque wrapper around a delivery id used as the idempotency store's key.
/// Equality is ordinal (plain string equality).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn from_delivery_id(delivery_id: impl Into<String>) -> Self {
        Self(delivery_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single entry in the handler registry. `event_pattern` is an exact event
/// name, `*`, or `event.*`; `action_pattern` of `None` or `Some("*")` matches
/// any action. `name` is carried purely for tracing/log correlation and is
/// never used for matching.
#[derive(Clone)]
pub struct HandlerRegistration {
    pub event_pattern: String,
    pub action_pattern: Option<String>,
    pub name: &'static str,
}

/// Identifies a repository-hosted configuration file to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfigPath {
    pub owner: String,
    pub repository: String,
    pub path: String,
    pub git_ref: Option<String>,
}

impl RepositoryConfigPath {
    /// `<file>` at the repository root.
    pub fn root(owner: impl Into<String>, repository: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            path: file.into(),
            git_ref: None,
        }
    }

    /// `.github/<file>` within the target repository.
    pub fn dot_github(
        owner: impl Into<String>,
        repository: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        let file = file.into();
        Self {
            owner: owner.into(),
            repository: repository.into(),
            path: format!(".github/{file}"),
            git_ref: None,
        }
    }

    /// `<file>` within the organization's own `.github` repository.
    pub fn organization_default(owner: impl Into<String>, file: impl Into<String>) -> Self {
        let owner = owner.into();
        Self {
            owner: owner.clone(),
            repository: ".github".to_string(),
            path: file.into(),
            git_ref: None,
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
