use crate::inference::InferenceClient;
use crate::metrics::{PipelineStats, StatsSnapshot};
use common::interface::FeatureStore;
use common::model::config::WorkerConfig;
use common::model::{FeatureRecord, TaskEvent};
use errors::TaskError;
use log::{error, info, warn};
use queue::TaskQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::Instrument;


/// Pause after a failed pop (e.g. Redis connection lost) before trying again.
const POP_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounded retry for feature-store writes. Delay grows linearly:
/// `backoff * attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreRetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for StoreRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl StoreRetryPolicy {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            attempts: config.store_retry_attempts,
            backoff: Duration::from_millis(config.store_retry_backoff_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// What became of one popped payload.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Classified and written; the record now in the store.
    Stored(FeatureRecord),
    /// Payload could not be decoded and was dropped.
    Rejected(TaskError),
    /// Every store attempt failed; the task was dropped.
    StoreFailed {
        user_id: String,
        error: errors::Error,
    },
}

impl TaskOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, TaskOutcome::Stored(_))
    }

    pub fn record(&self) -> Option<&FeatureRecord> {
        match self {
            TaskOutcome::Stored(record) => Some(record),
            _ => None,
        }
    }
}

/// Sequential task loop: pop, decode, classify, store.
///
/// At most one task is in flight per processor. A bad payload, an inference
/// failure or an exhausted store retry only affects the task at hand; the
/// loop keeps popping.
pub struct TaskProcessor {
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn FeatureStore>,
    inference: InferenceClient,
    stats: Arc<PipelineStats>,
    retry: StoreRetryPolicy,
}

impl TaskProcessor {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn FeatureStore>,
        inference: InferenceClient,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            queue,
            store,
            inference,
            stats,
            retry: StoreRetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: StoreRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Runs until `shutdown` fires (or its sender is dropped) or the queue
    /// closes. The signal only interrupts the wait for the next item; a task
    /// that was already popped is finished first.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> StatsSnapshot {
        info!("Worker listening for tasks...");

        loop {
            let popped = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Task processor received shutdown signal");
                    break;
                }
                popped = self.queue.pop() => popped,
            };

            match popped {
                Ok(raw) => {
                    self.handle(&raw).await;
                }
                Err(e) if e.is_queue_closed() => {
                    info!("Task queue closed");
                    break;
                }
                Err(e) => {
                    error!(
                        "Failed to pop from task queue: {e}. Retrying in {}s...",
                        POP_RETRY_DELAY.as_secs()
                    );
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(POP_RETRY_DELAY) => {}
                    }
                }
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            "Task processor loop ended: processed={} threats={} rejected={} store_failures={}",
            snapshot.processed, snapshot.threats, snapshot.rejected, snapshot.store_failures
        );
        snapshot
    }

    /// Processes one raw queue payload end to end.
    pub async fn handle(&self, raw: &[u8]) -> TaskOutcome {
        let event = match TaskEvent::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping toxic message ({} bytes): {e}", raw.len());
                self.stats.record_rejected();
                return TaskOutcome::Rejected(e);
            }
        };

        let span = tracing::info_span!(
            "task",
            message_id = %event.message_id,
            user_id = %event.user_id
        );
        self.process(event).instrument(span).await
    }

    async fn process(&self, event: TaskEvent) -> TaskOutcome {
        let verdict = self.inference.classify(&event.content).await;

        if verdict.is_risky {
            warn!("[RISK DETECTED] User {}: {}", event.user_id, verdict.reason);
        } else {
            info!("[SAFE] User {}: {}", event.user_id, verdict.reason);
        }

        let record = FeatureRecord::from_verdict(&event.user_id, &verdict);
        if let Err(error) = self.store_with_retry(&record).await {
            error!(
                "Dropping task {} for user {}: feature store write failed: {error}",
                event.message_id, event.user_id
            );
            self.stats.record_store_failure();
            return TaskOutcome::StoreFailed {
                user_id: event.user_id,
                error,
            };
        }

        // threats are a subset of processed
        if record.risky {
            self.stats.record_threat();
        }
        self.stats.record_processed();
        TaskOutcome::Stored(record)
    }

    async fn store_with_retry(&self, record: &FeatureRecord) -> errors::Result<()> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.upsert(record).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Feature store write for {} failed (attempt {attempt}/{attempts}): {e}; retrying in {delay:?}",
                        record.key()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
