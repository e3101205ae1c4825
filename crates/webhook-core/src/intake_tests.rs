use super::*;
use crate::adapters::{InMemoryDeliveryStore, InMemoryIdempotencyStore};
use crate::metrics::RecordingMetrics;
use crate::ports::WebhookSecretProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use github_bot_sdk::auth::{GitHubAppId, SecretProvider};
use github_bot_sdk::error::SecretError;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

struct FixedSecretProvider {
    secret: String,
}

#[async_trait]
impl SecretProvider for FixedSecretProvider {
    async fn get_private_key(&self) -> Result<github_bot_sdk::auth::PrivateKey, SecretError> {
        unimplemented!("not exercised by intake tests")
    }

    async fn get_app_id(&self) -> Result<GitHubAppId, SecretError> {
        Ok(GitHubAppId::new(1))
    }

    async fn get_webhook_secret(&self) -> Result<String, SecretError> {
        Ok(self.secret.clone())
    }

    fn cache_duration(&self) -> ChronoDuration {
        ChronoDuration::minutes(5)
    }
}

enum FixedWebhookSecret {
    Present(String),
    Missing,
}

#[async_trait]
impl WebhookSecretProvider for FixedWebhookSecret {
    async fn webhook_secret(&self) -> Result<Option<String>, String> {
        match self {
            Self::Present(secret) => Ok(Some(secret.clone())),
            Self::Missing => Ok(None),
        }
    }
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn sign(secret: &str, payload: &[u8]) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn pipeline(secret: &str) -> IntakePipeline {
    pipeline_with_secret(secret, FixedWebhookSecret::Present(secret.to_string()))
}

fn pipeline_with_secret(secret: &str, webhook_secret: FixedWebhookSecret) -> IntakePipeline {
    let validator = Arc::new(github_bot_sdk::webhook::SignatureValidator::new(Arc::new(FixedSecretProvider {
        secret: secret.to_string(),
    })));
    let mut pipeline = IntakePipeline::new(
        validator,
        Arc::new(webhook_secret),
        Arc::new(InMemoryDeliveryStore::new()),
        Arc::new(InMemoryIdempotencyStore::new()),
        Arc::new(FixedClock(Utc::now())),
        Arc::new(EventRouter::new()),
        Arc::new(RecordingMetrics::new()),
    );
    pipeline.dispatch_inline = true;
    pipeline
}

#[tokio::test]
async fn valid_first_time_delivery_persists_and_reports_processed() {
    let secret = "s3cr3t";
    let payload = br#"{"action":"opened","issue":{"number":42}}"#.to_vec();
    let signature = sign(secret, &payload);
    let pipeline = pipeline(secret);

    let command = ProcessWebhookCommand::new(
        "d-1",
        "issues",
        serde_json::from_slice(&payload).unwrap(),
        None,
        payload,
        signature,
    );

    let outcome = pipeline.process(command).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Processed);
}

#[tokio::test]
async fn duplicate_delivery_short_circuits_without_a_second_row() {
    let secret = "s3cr3t";
    let payload = br#"{"action":"opened"}"#.to_vec();
    let signature = sign(secret, &payload);
    let pipeline = pipeline(secret);

    let command = ProcessWebhookCommand::new(
        "d-1",
        "issues",
        json!({"action": "opened"}),
        None,
        payload.clone(),
        signature.clone(),
    );
    assert_eq!(pipeline.process(command.clone()).await.unwrap(), ProcessOutcome::Processed);
    assert_eq!(pipeline.process(command).await.unwrap(), ProcessOutcome::Duplicate);
}

#[tokio::test]
async fn invalid_signature_is_rejected_before_persistence() {
    let secret = "s3cr3t";
    let payload = br#"{"action":"opened"}"#.to_vec();
    let bad_signature = format!("sha256={}", "0".repeat(64));
    let pipeline = pipeline(secret);

    let command = ProcessWebhookCommand::new(
        "d-1",
        "issues",
        json!({"action": "opened"}),
        None,
        payload,
        bad_signature,
    );

    let error = pipeline.process(command).await.unwrap_err();
    assert_eq!(error.code(), "webhook_signature_invalid");
}

#[tokio::test]
async fn missing_webhook_secret_is_rejected_before_signature_check() {
    let secret = "s3cr3t";
    let payload = br#"{"action":"opened"}"#.to_vec();
    let signature = sign(secret, &payload);
    let pipeline = pipeline_with_secret(secret, FixedWebhookSecret::Missing);

    let command = ProcessWebhookCommand::new(
        "d-1",
        "issues",
        json!({"action": "opened"}),
        None,
        payload,
        signature,
    );

    let error = pipeline.process(command).await.unwrap_err();
    assert_eq!(error.code(), "webhook_secret_unavailable");
}

#[tokio::test]
async fn empty_webhook_secret_is_rejected_before_signature_check() {
    let secret = "s3cr3t";
    let payload = br#"{"action":"opened"}"#.to_vec();
    let signature = sign(secret, &payload);
    let pipeline = pipeline_with_secret(secret, FixedWebhookSecret::Present(String::new()));

    let command = ProcessWebhookCommand::new(
        "d-1",
        "issues",
        json!({"action": "opened"}),
        None,
        payload,
        signature,
    );

    let error = pipeline.process(command).await.unwrap_err();
    assert_eq!(error.code(), "webhook_secret_empty");
}
