//! Error taxonomy for the webhook core.
//!
//! Every variant carries a stable string `code()` matching the taxonomy in
//! spec section 7 of the webhook-runtime specification; tests assert on the
//! code, not on `Display` text, since the latter is free to change.

use thiserror::Error;

/// Errors from the webhook intake pipeline (signature check, duplicate
/// detection, persistence, idempotency, routing).
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("webhook signature did not match the configured secret")]
    SignatureInvalid,

    #[error("webhook secret is not configured")]
    SecretUnavailable,

    #[error("webhook secret is configured but empty")]
    SecretEmpty,

    #[error("delivery store read failed: {message}")]
    StorageReadFailed { message: String },

    #[error("delivery store write failed: {message}")]
    StorageWriteFailed { message: String },

    #[error("failed to construct delivery record: {message}")]
    DeliveryCreationFailed { message: String },
}

impl IntakeError {
    /// Stable error code, matching spec section 7.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SignatureInvalid => "webhook_signature_invalid",
            Self::SecretUnavailable => "webhook_secret_unavailable",
            Self::SecretEmpty => "webhook_secret_empty",
            Self::StorageReadFailed { .. } => "storage_read_failed",
            Self::StorageWriteFailed { .. } => "storage_write_failed",
            Self::DeliveryCreationFailed { .. } => "webhook_delivery_creation_failed",
        }
    }

    /// True for infrastructure failures a replay attempt might clear up.
    /// `SignatureInvalid` and the secret-configuration errors are not
    /// retryable: replaying the same bytes against the same secret can only
    /// fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageReadFailed { .. } | Self::StorageWriteFailed { .. }
        )
    }
}

/// Errors from registering or dispatching through the event router.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("handler {handler} failed: {message}")]
    HandlerFailed { handler: String, message: String },

    #[error("handler context is missing required field: {field}")]
    MissingField { field: String },
}

impl RouterError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::HandlerFailed { .. } => "webhook_routing_error",
            Self::MissingField { .. } => "webhook_context_field_missing",
        }
    }
}

/// Errors from the repository-file configuration loader.
#[derive(Debug, Error)]
pub enum ConfigLoaderError {
    #[error("failed to fetch {owner}/{repo}/{path}: {message}")]
    FetchFailed {
        owner: String,
        repo: String,
        path: String,
        message: String,
    },

    #[error("failed to parse YAML for {owner}/{repo}/{path}: {message}")]
    ParseFailed {
        owner: String,
        repo: String,
        path: String,
        message: String,
    },

    #[error("_extends value `{value}` is not a valid `owner/repo[:file]` reference")]
    InvalidExtendsReference { value: String },

    #[error("_extends chain exceeded max_extends_depth ({max_depth})")]
    ExtendsDepthExceeded { max_depth: u8 },
}

impl ConfigLoaderError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "repository_config_fetch_failed",
            Self::ParseFailed { .. } => "repository_config_parse_failed",
            Self::InvalidExtendsReference { .. } => "repository_config_invalid_extends",
            Self::ExtendsDepthExceeded { .. } => "repository_config_extends_depth_exceeded",
        }
    }
}

/// Errors surfaced by a `ReplayQueue` or `DeadLetterStore` port implementation.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue operation failed: {message}")]
    OperationFailed { message: String },

    #[error("queue is unavailable: {message}")]
    Unavailable { message: String },
}

impl QueueError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OperationFailed { .. } => "replay_queue_operation_failed",
            Self::Unavailable { .. } => "replay_queue_unavailable",
        }
    }
}

/// Errors from the replay worker loop itself (distinct from `IntakeError`,
/// which is what the worker is replaying).
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid replay policy: {message}")]
    InvalidPolicy { message: String },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl ReplayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPolicy { .. } => "replay_policy_invalid",
            Self::Queue(e) => e.code(),
            Self::Intake(e) => e.code(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
