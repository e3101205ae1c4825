//! In-memory `ReplayQueue`, grounded on webhook-core's own
//! `adapters::in_memory` idiom (a single `RwLock`-guarded collection, no
//! background maintenance). FIFO via `VecDeque`; `dequeue` pops the front.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::RwLock;

use webhook_core::error::QueueError;
use webhook_core::model::EnqueueReplayCommand;
use webhook_core::ports::ReplayQueue;

#[derive(Default)]
pub struct InMemoryReplayQueue {
    items: RwLock<VecDeque<EnqueueReplayCommand>>,
}

impl InMemoryReplayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReplayQueue for InMemoryReplayQueue {
    async fn enqueue(&self, command: EnqueueReplayCommand) -> Result<(), QueueError> {
        let mut items = self.items.write().map_err(|_| QueueError::OperationFailed {
            message: "replay queue lock poisoned".to_string(),
        })?;
        items.push_back(command);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<EnqueueReplayCommand>, QueueError> {
        let mut items = self.items.write().map_err(|_| QueueError::OperationFailed {
            message: "replay queue lock poisoned".to_string(),
        })?;
        Ok(items.pop_front())
    }
}

#[cfg(test)]
#[path = "in_memory_queue_tests.rs"]
mod tests;
