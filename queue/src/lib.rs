pub mod memory;
pub mod redis;


use async_trait::async_trait;
use errors::Result;

pub use memory::MemoryQueue;
pub use redis::RedisQueue;

/// Shared FIFO of serialized tasks.
///
/// Each pushed item is handed to exactly one `pop` caller. `pop` suspends
/// until an item is available and must be cancel-safe to drop while waiting,
/// so a worker can race it against a shutdown signal.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn push(&self, payload: &[u8]) -> Result<()>;

    async fn pop(&self) -> Result<Vec<u8>>;

    /// Number of items waiting, if the backend can tell cheaply.
    async fn len(&self) -> Result<usize>;
}
