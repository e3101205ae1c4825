//! Cancellation signal (spec section 5): a single flag `main.rs` flips once
//! on SIGINT/SIGTERM, fanned out to axum's graceful-shutdown future and the
//! replay worker's poll loop so both stop accepting new work at the same
//! instant and the configured grace period starts counting down once, not
//! twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cheaply cloneable; every clone observes the same underlying flag.
#[derive(Clone)]
pub struct ShutdownHandle {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Flips the flag and wakes every pending `triggered()` waiter. A second
    /// call is a no-op.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already triggered, otherwise waits. The
    /// `Notified` future is created before the flag check so a `trigger()`
    /// racing in between is never missed.
    pub async fn triggered(&self) {
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
