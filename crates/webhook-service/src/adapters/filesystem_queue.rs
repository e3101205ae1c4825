//! Filesystem-backed `ReplayQueue` and `DeadLetterStore`, grounded on the
//! teacher's `FilesystemBlobStorage` atomic write pattern: serialize to a
//! `.tmp` sibling, flush, then `rename` into place so a crash mid-write never
//! leaves a partially written file where a reader can find it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use webhook_core::error::QueueError;
use webhook_core::model::{DeadLetterItem, EnqueueReplayCommand};
use webhook_core::ports::{DeadLetterStore, ReplayQueue};

async fn write_atomic(path: &Path, json: &str) -> Result<(), QueueError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| QueueError::OperationFailed {
            message: format!("failed to create directory {}: {e}", parent.display()),
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).await.map_err(|e| QueueError::OperationFailed {
        message: format!("failed to create temp file {}: {e}", temp_path.display()),
    })?;
    file.write_all(json.as_bytes()).await.map_err(|e| QueueError::OperationFailed {
        message: format!("failed to write {}: {e}", temp_path.display()),
    })?;
    file.flush().await.map_err(|e| QueueError::OperationFailed {
        message: format!("failed to flush {}: {e}", temp_path.display()),
    })?;

    fs::rename(&temp_path, path).await.map_err(|e| QueueError::OperationFailed {
        message: format!("failed to rename {} to {}: {e}", temp_path.display(), path.display()),
    })?;
    Ok(())
}

/// Names a queue entry so that lexical order matches enqueue order: a
/// zero-padded millisecond timestamp keeps dequeue roughly FIFO even with
/// concurrent writers, and the UUID suffix breaks ties.
fn entry_file_name() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    format!("{millis:020}-{}.json", Uuid::new_v4())
}

/// Lists `*.json` entries in `dir` in filename (i.e. enqueue) order. Returns
/// an empty list if the directory does not yet exist.
async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, QueueError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut read_dir = fs::read_dir(dir).await.map_err(|e| QueueError::OperationFailed {
        message: format!("failed to read directory {}: {e}", dir.display()),
    })?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(|e| QueueError::OperationFailed {
        message: format!("failed to read directory entry: {e}"),
    })? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Durable replay queue: one JSON file per pending command under `base_path`.
#[derive(Debug, Clone)]
pub struct FilesystemReplayQueue {
    base_path: PathBuf,
}

impl FilesystemReplayQueue {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl ReplayQueue for FilesystemReplayQueue {
    async fn enqueue(&self, command: EnqueueReplayCommand) -> Result<(), QueueError> {
        let path = self.base_path.join(entry_file_name());
        let json = serde_json::to_string(&command).map_err(|e| QueueError::OperationFailed {
            message: format!("failed to serialize replay command: {e}"),
        })?;
        write_atomic(&path, &json).await
    }

    async fn dequeue(&self) -> Result<Option<EnqueueReplayCommand>, QueueError> {
        let entries = sorted_entries(&self.base_path).await?;
        let Some(path) = entries.into_iter().next() else {
            return Ok(None);
        };

        let json = fs::read_to_string(&path).await.map_err(|e| QueueError::OperationFailed {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let command: EnqueueReplayCommand =
            serde_json::from_str(&json).map_err(|e| QueueError::OperationFailed {
                message: format!("failed to deserialize {}: {e}", path.display()),
            })?;

        fs::remove_file(&path).await.map_err(|e| QueueError::OperationFailed {
            message: format!("failed to remove {}: {e}", path.display()),
        })?;

        Ok(Some(command))
    }
}

/// Durable dead-letter sink: one JSON file per item, never removed by this
/// adapter; operators are expected to inspect and clear `base_path` out of
/// band.
#[derive(Debug, Clone)]
pub struct FilesystemDeadLetterStore {
    base_path: PathBuf,
}

impl FilesystemDeadLetterStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl DeadLetterStore for FilesystemDeadLetterStore {
    async fn save(&self, item: DeadLetterItem) -> Result<(), QueueError> {
        let path = self.base_path.join(format!("{}.json", item.id));
        let json = serde_json::to_string_pretty(&item).map_err(|e| QueueError::OperationFailed {
            message: format!("failed to serialize dead-letter item: {e}"),
        })?;
        write_atomic(&path, &json).await
    }

    async fn list(&self) -> Result<Vec<DeadLetterItem>, QueueError> {
        let entries = sorted_entries(&self.base_path).await?;
        let mut items = Vec::with_capacity(entries.len());
        for path in entries {
            let json = fs::read_to_string(&path).await.map_err(|e| QueueError::OperationFailed {
                message: format!("failed to read {}: {e}", path.display()),
            })?;
            let item: DeadLetterItem = serde_json::from_str(&json).map_err(|e| QueueError::OperationFailed {
                message: format!("failed to deserialize {}: {e}", path.display()),
            })?;
            items.push(item);
        }
        Ok(items)
    }
}

#[cfg(test)]
#[path = "filesystem_queue_tests.rs"]
mod tests;
