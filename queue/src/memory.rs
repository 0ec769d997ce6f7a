use crate::TaskQueue;
use async_trait::async_trait;
use errors::Result;
use errors::error::QueueError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify};

/// In-process task queue with the same push / blocking-pop contract as the
/// Redis list. Used by tests and single-process runs.
///
/// After [`MemoryQueue::close`] the remaining items are still handed out;
/// once drained, `pop` fails with [`QueueError::Closed`].
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
    closed: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn push(&self, payload: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(QueueError::Closed.into());
        }
        self.items.lock().await.push_back(payload.to_vec());
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Result<Vec<u8>> {
        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.notify.notified();
            if let Some(item) = self.items.lock().await.pop_front() {
                return Ok(item);
            }
            if self.is_closed() {
                return Err(QueueError::Closed.into());
            }
            notified.await;
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.items.lock().await.len())
    }
}
