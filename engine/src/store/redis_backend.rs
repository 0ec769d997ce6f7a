use async_trait::async_trait;
use common::interface::FeatureStore;
use common::model::config::RedisConfig;
use common::model::feature::USER_RISK_PREFIX;
use common::model::FeatureRecord;
use deadpool_redis::redis;
use deadpool_redis::Pool;
use errors::{Result, StoreError};
use log::warn;
use std::collections::HashMap;

/// Feature store on Redis hashes: `user_risk:{user_id}` -> `{risky, reason}`.
#[derive(Clone)]
pub struct RedisFeatureStore {
    pool: Pool,
}

impl RedisFeatureStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(redis_config: &RedisConfig) -> Result<Self> {
        let pool = utils::connector::create_redis_pool(
            &redis_config.redis_host,
            redis_config.redis_port,
            redis_config.redis_db,
            &redis_config.redis_username,
            &redis_config.redis_password,
            redis_config.pool_size,
        )
        .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()).into())
    }

    async fn hgetall(
        conn: &mut deadpool_redis::Connection,
        key: &str,
    ) -> Result<HashMap<String, String>> {
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(conn)
            .await
            .map_err(|e| StoreError::Redis(Box::new(e)))?;
        Ok(fields)
    }

    async fn scan_keys(conn: &mut deadpool_redis::Connection) -> Result<Vec<String>> {
        let pattern = format!("{USER_RISK_PREFIX}*");
        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(conn)
                .await
                .map_err(|e| StoreError::Redis(Box::new(e)))?;

            keys.extend(batch);
            cursor = next_cursor;

            if cursor == 0 {
                break;
            }
        }
        // SCAN may return a key more than once.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl FeatureStore for RedisFeatureStore {
    async fn upsert(&self, record: &FeatureRecord) -> Result<()> {
        let mut conn = self.conn().await?;
        let mut cmd = redis::cmd("HSET");
        cmd.arg(record.key());
        for (field, value) in record.fields() {
            cmd.arg(field).arg(value);
        }
        let _: i64 = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Redis(Box::new(e)))?;
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<FeatureRecord>> {
        let mut conn = self.conn().await?;
        let fields = Self::hgetall(&mut conn, &FeatureRecord::key_for(user_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(FeatureRecord::from_fields(user_id, &fields)?))
    }

    async fn list(&self) -> Result<Vec<FeatureRecord>> {
        let mut conn = self.conn().await?;
        let keys = Self::scan_keys(&mut conn).await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(user_id) = FeatureRecord::user_id_from_key(&key) else {
                continue;
            };
            let fields = Self::hgetall(&mut conn, &key).await?;
            if fields.is_empty() {
                // deleted between SCAN and HGETALL
                continue;
            }
            match FeatureRecord::from_fields(user_id, &fields) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable feature record: {e}"),
            }
        }
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Redis(Box::new(e)))?;
        Ok(())
    }
}
