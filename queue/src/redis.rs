use crate::TaskQueue;
use async_trait::async_trait;
use common::model::config::RedisConfig;
use deadpool_redis::redis;
use errors::Result;
use errors::error::QueueError;
use log::{debug, info};

/// Task queue backed by a Redis list: `RPUSH` to enqueue, `BLPOP` to take.
///
/// Redis hands a popped element to exactly one blocked client, which is the
/// only mutual exclusion the workers need.
pub struct RedisQueue {
    pool: deadpool_redis::Pool,
    key: String,
}

impl RedisQueue {
    pub fn new(redis_config: &RedisConfig, key: &str) -> Result<Self> {
        let pool = utils::connector::create_redis_pool(
            &redis_config.redis_host,
            redis_config.redis_port,
            redis_config.redis_db,
            &redis_config.redis_username,
            &redis_config.redis_password,
            redis_config.pool_size,
        )
        .map_err(|e| QueueError::ConnectionFailed(Box::new(e)))?;

        info!(
            "Task queue on redis://{}:{}/{} key {}",
            redis_config.redis_host, redis_config.redis_port, redis_config.redis_db, key
        );
        Ok(Self::with_pool(pool, key))
    }

    pub fn with_pool(pool: deadpool_redis::Pool, key: &str) -> Self {
        Self {
            pool,
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::ConnectionFailed(Box::new(e)).into())
    }
}

#[async_trait]
impl TaskQueue for RedisQueue {
    async fn push(&self, payload: &[u8]) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("RPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::PushFailed(Box::new(e)))?;
        Ok(())
    }

    async fn pop(&self) -> Result<Vec<u8>> {
        let mut conn = self.conn().await?;
        loop {
            // BLOCK 0: wait until an element arrives. Dropping this future
            // (shutdown) leaves the pooled connection to discard the reply.
            let reply: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
                .arg(&self.key)
                .arg(0)
                .query_async(&mut conn)
                .await
                .map_err(|e| QueueError::PopFailed(Box::new(e)))?;

            match reply {
                Some((_, payload)) => return Ok(payload),
                None => debug!("BLPOP on {} returned nil, waiting again", self.key),
            }
        }
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn().await?;
        let len: usize = redis::cmd("LLEN")
            .arg(&self.key)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::PopFailed(Box::new(e)))?;
        Ok(len)
    }
}
