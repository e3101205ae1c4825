//! Replay queue worker (spec section 4.3): single-consumer-per-host poll of
//! the replay queue with bounded exponential backoff, escalating to the
//! dead-letter queue once `max_attempts` is reached. The poll/sleep/dequeue
//! loop itself lives here rather than in `webhook-core` because it needs
//! `tokio::select!` against a shutdown signal, which that crate deliberately
//! stays ignorant of.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use webhook_core::model::EnqueueReplayCommand;
use webhook_core::ports::{Clock, DeadLetterStore, ReplayQueue};
use webhook_core::{DeadLetterItem, IntakePipeline, Metrics, ProcessOutcome, ReplayPolicy};

/// Drives the `Queued -> InFlight -> (Done | Requeued | DeadLettered)` state
/// machine of spec section 4.3 against whatever `ReplayQueue` and
/// `DeadLetterStore` the service was configured with.
pub struct ReplayWorker {
    queue: Arc<dyn ReplayQueue>,
    dead_letters: Arc<dyn DeadLetterStore>,
    pipeline: Arc<IntakePipeline>,
    policy: ReplayPolicy,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn Metrics>,
}

impl ReplayWorker {
    pub fn new(
        queue: Arc<dyn ReplayQueue>,
        dead_letters: Arc<dyn DeadLetterStore>,
        pipeline: Arc<IntakePipeline>,
        policy: ReplayPolicy,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            queue,
            dead_letters,
            pipeline,
            policy,
            clock,
            metrics,
        }
    }

    /// Polls until `shutdown` carries `true`. Stops issuing new dequeues
    /// between iterations once the signal arrives; a command already
    /// in flight is allowed to finish (requeue or dead-letter as normal)
    /// before the loop returns.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_interval_secs = self.policy.poll_interval.as_secs(), "replay worker starting");

        while !*shutdown.borrow() {
            tokio::select! {
                dequeued = self.queue.dequeue() => {
                    match dequeued {
                        Ok(Some(command)) => self.process_one(command).await,
                        Ok(None) => self.sleep_or_shutdown(self.policy.poll_interval, &mut shutdown).await,
                        Err(err) => {
                            warn!(error = %err, "replay queue dequeue failed");
                            self.sleep_or_shutdown(self.policy.poll_interval, &mut shutdown).await;
                        }
                    }
                }
                _ = shutdown.changed() => {}
            }
        }

        info!("replay worker stopped");
    }

    async fn sleep_or_shutdown(&self, duration: std::time::Duration, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = shutdown.changed() => {}
        }
    }

    /// One iteration of the worker loop body for a single dequeued command.
    async fn process_one(&self, command: EnqueueReplayCommand) {
        if self.policy.should_dead_letter(command.attempt) {
            self.dead_letter(command, "max_attempts_exceeded", None).await;
            return;
        }

        let delay = self.policy.delay_for_attempt(command.attempt);
        tokio::time::sleep(delay).await;

        let to_process = command.command.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let join_result = tokio::spawn(async move { pipeline.process(to_process).await }).await;

        match join_result {
            Ok(Ok(ProcessOutcome::Processed | ProcessOutcome::Duplicate)) => {
                self.metrics.increment_counter("webhook_replay_success", &[]);
            }
            Ok(Err(err)) => {
                warn!(
                    delivery_id = %command.command.delivery_id,
                    attempt = command.attempt,
                    error = %err,
                    "replay attempt failed, requeuing"
                );
                if let Err(enqueue_err) = self.queue.enqueue(command.next_attempt()).await {
                    warn!(error = %enqueue_err, "failed to requeue replay command");
                }
                self.metrics.increment_counter("webhook_replay_retry", &[]);
            }
            Err(join_err) => {
                let message = join_err.to_string();
                warn!(
                    delivery_id = %command.command.delivery_id,
                    attempt = command.attempt,
                    error = %message,
                    "replay attempt panicked"
                );
                let next = command.next_attempt();
                if self.policy.should_dead_letter(next.attempt) {
                    self.dead_letter(next, "replay_task_panicked", Some(message)).await;
                } else {
                    if let Err(enqueue_err) = self.queue.enqueue(next).await {
                        warn!(error = %enqueue_err, "failed to requeue replay command after panic");
                    }
                    self.metrics.increment_counter("webhook_replay_error_retry", &[]);
                }
            }
        }
    }

    async fn dead_letter(&self, command: EnqueueReplayCommand, reason: &str, last_error: Option<String>) {
        let now = self.clock.now();
        let delivery_id = command.command.delivery_id.clone();
        let item = DeadLetterItem::new(command, reason, now, now, last_error);
        match self.dead_letters.save(item).await {
            Ok(()) => {
                info!(delivery_id = %delivery_id, reason, "replay command moved to dead-letter queue");
            }
            Err(err) => {
                warn!(delivery_id = %delivery_id, error = %err, "failed to write dead-letter item");
            }
        }
        self.metrics.increment_counter("webhook_replay_dlq_moved", &[]);
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
