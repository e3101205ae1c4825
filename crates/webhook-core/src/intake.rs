//! Webhook intake pipeline (spec section 4.1): signature validation,
//! duplicate detection, persistence, best-effort idempotency acquisition,
//! and handler fan-out, run as a railway pipeline where each step
//! short-circuits on failure.

use github_bot_sdk::auth::AuthenticationProvider;
use github_bot_sdk::webhook::SignatureValidator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::IntakeError;
use crate::metrics::Metrics;
use crate::model::{IdempotencyKey, ProcessWebhookCommand, WebhookDelivery};
use crate::ports::{Clock, DeliveryStore, IdempotencyStore, WebhookSecretProvider};
use crate::router::{EventRouter, HandlerContext};

/// TTL applied to the idempotency key acquired after persistence.
pub const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Sentinel outcome distinguishing "short-circuited because this delivery
/// was already processed" from "processed for the first time". Both map to
/// success at the HTTP boundary; router invocation only happens for the
/// latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Processed,
    Duplicate,
}

/// Wires the signature validator, delivery store, idempotency store, clock,
/// event router, and metrics sink together into the `Process` operation of
/// spec section 4.1.
pub struct IntakePipeline {
    signature_validator: Arc<SignatureValidator>,
    /// Checked ahead of HMAC computation so a missing or blank webhook
    /// secret is reported with its own code instead of collapsing into
    /// `SignatureInvalid`.
    webhook_secrets: Arc<dyn WebhookSecretProvider>,
    delivery_store: Arc<dyn DeliveryStore>,
    idempotency_store: Arc<dyn IdempotencyStore>,
    clock: Arc<dyn Clock>,
    router: Arc<EventRouter>,
    metrics: Arc<dyn Metrics>,
    /// Installation auth wired into every `HandlerContext`, if the caller
    /// configured one (no outbound GitHub calls are possible without it).
    auth: Option<Arc<dyn AuthenticationProvider>>,
    /// When false, handler dispatch is spawned onto a separate task so a
    /// slow handler cannot stall the caller past the ingress deadline. Tests
    /// set this to `true` to observe dispatch synchronously.
    pub dispatch_inline: bool,
    /// Threaded into every `HandlerContext`; handlers use it to log actions
    /// instead of performing them.
    pub dry_run: bool,
}

impl IntakePipeline {
    pub fn new(
        signature_validator: Arc<SignatureValidator>,
        webhook_secrets: Arc<dyn WebhookSecretProvider>,
        delivery_store: Arc<dyn DeliveryStore>,
        idempotency_store: Arc<dyn IdempotencyStore>,
        clock: Arc<dyn Clock>,
        router: Arc<EventRouter>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            signature_validator,
            webhook_secrets,
            delivery_store,
            idempotency_store,
            clock,
            router,
            metrics,
            auth: None,
            dispatch_inline: false,
            dry_run: false,
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthenticationProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Runs the full railway pipeline for one command, first-time or
    /// replayed.
    pub async fn process(&self, command: ProcessWebhookCommand) -> Result<ProcessOutcome, IntakeError> {
        let started = Instant::now();
        let event_name = command.event_name.clone();
        let outcome = self.process_inner(command).await;
        self.metrics.record_duration(
            "webhook.processing.duration",
            &[("event", event_name.as_str())],
            started.elapsed(),
        );
        outcome
    }

    async fn process_inner(&self, command: ProcessWebhookCommand) -> Result<ProcessOutcome, IntakeError> {
        // Step 1: validate signature. The secret is checked for presence
        // ahead of HMAC computation so a missing or blank configuration
        // reports its own code instead of a generic signature mismatch.
        match self.webhook_secrets.webhook_secret().await {
            Ok(Some(secret)) if secret.is_empty() => return Err(IntakeError::SecretEmpty),
            Ok(Some(_)) => {}
            Ok(None) => return Err(IntakeError::SecretUnavailable),
            Err(_) => return Err(IntakeError::SecretUnavailable),
        }
        let valid = self
            .signature_validator
            .validate(&command.raw_payload, &command.signature)
            .await
            .map_err(|_| IntakeError::SignatureInvalid)?;
        if !valid {
            self.metrics.increment_counter("webhook.signature_invalid", &[]);
            return Err(IntakeError::SignatureInvalid);
        }

        // Step 2: duplicate check (defense in depth ahead of persistence).
        let existing = self
            .delivery_store
            .find_by_delivery_id(&command.delivery_id)
            .await
            .map_err(|message| IntakeError::StorageReadFailed { message })?;
        if existing.is_some() {
            self.metrics.increment_counter("webhook.duplicate", &[]);
            return Ok(ProcessOutcome::Duplicate);
        }

        // Step 3: persist.
        let received_at = self.clock.now();
        let event_action = command.event_action();
        let delivery = WebhookDelivery::new(
            command.delivery_id.clone(),
            command.event_name.clone(),
            event_action.clone(),
            received_at,
            command.payload.clone(),
            command.installation_id,
        );
        self.delivery_store
            .save(delivery)
            .await
            .map_err(|message| IntakeError::StorageWriteFailed { message })?;

        // Step 4: best-effort idempotency acquisition. A failure here is
        // never fatal: the delivery store write above already committed.
        let key = IdempotencyKey::from_delivery_id(&command.delivery_id);
        if let Err(err) = self.idempotency_store.try_acquire(&key, IDEMPOTENCY_TTL).await {
            warn!(delivery_id = %command.delivery_id, error = %err, "idempotency key acquisition failed (non-fatal)");
        }

        self.metrics.increment_counter("webhook.processed", &[("event", command.event_name.as_str())]);
        info!(delivery_id = %command.delivery_id, event = %command.event_name, "webhook delivery persisted");

        // Step 5: route to handlers, after commit. Never fails the pipeline.
        let installation_id = command.installation_id.map(github_bot_sdk::auth::InstallationId::new);
        let context = HandlerContext::new(
            command.delivery_id.clone(),
            command.event_name.clone(),
            event_action,
            command.payload,
            installation_id,
            self.auth.clone(),
            self.dry_run,
        );
        let router = Arc::clone(&self.router);
        let metrics = Arc::clone(&self.metrics);
        if self.dispatch_inline {
            router.dispatch(&context, metrics.as_ref()).await;
        } else {
            tokio::spawn(async move {
                router.dispatch(&context, metrics.as_ref()).await;
            });
        }

        Ok(ProcessOutcome::Processed)
    }
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
