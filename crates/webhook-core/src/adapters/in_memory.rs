use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::error::QueueError;
use crate::model::{DeadLetterItem, WebhookDelivery};
use crate::ports::{DeadLetterStore, DeliveryStore, IdempotencyStore};

/// In-memory `DeliveryStore`, keyed by `delivery_id`.
#[derive(Default)]
pub struct InMemoryDeliveryStore {
    deliveries: RwLock<HashMap<String, WebhookDelivery>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn find_by_delivery_id(&self, delivery_id: &str) -> Result<Option<WebhookDelivery>, String> {
        let deliveries = self.deliveries.read().map_err(|_| "delivery store lock poisoned".to_string())?;
        Ok(deliveries.get(delivery_id).cloned())
    }

    async fn save(&self, delivery: WebhookDelivery) -> Result<(), String> {
        let mut deliveries = self.deliveries.write().map_err(|_| "delivery store lock poisoned".to_string())?;
        deliveries.insert(delivery.delivery_id.clone(), delivery);
        Ok(())
    }
}

/// In-memory `IdempotencyStore` with lazy TTL expiry (checked on access, not
/// via a background sweep).
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: RwLock<HashMap<String, Instant>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn try_acquire(&self, key: &crate::model::IdempotencyKey, ttl: Duration) -> Result<bool, String> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| "idempotency store lock poisoned".to_string())?;

        if let Some(expires_at) = entries.get(key.as_str()) {
            if *expires_at > now {
                return Ok(false);
            }
        }

        entries.insert(key.as_str().to_string(), now + ttl);
        Ok(true)
    }
}

/// In-memory `DeadLetterStore`; `list()` returns insertion order.
#[derive(Default)]
pub struct InMemoryDeadLetterStore {
    items: RwLock<Vec<DeadLetterItem>>,
}

impl InMemoryDeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeadLetterStore for InMemoryDeadLetterStore {
    async fn save(&self, item: DeadLetterItem) -> Result<(), QueueError> {
        let mut items = self.items.write().map_err(|_| QueueError::OperationFailed {
            message: "dead-letter store lock poisoned".to_string(),
        })?;
        items.push(item);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DeadLetterItem>, QueueError> {
        let items = self.items.read().map_err(|_| QueueError::OperationFailed {
            message: "dead-letter store lock poisoned".to_string(),
        })?;
        Ok(items.clone())
    }
}

#[cfg(test)]
#[path = "in_memory_tests.rs"]
mod tests;
