use async_trait::async_trait;
use common::interface::FeatureStore;
use common::model::FeatureRecord;
use dashmap::DashMap;
use errors::Result;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process feature store keyed like the Redis one.
#[derive(Default)]
pub struct LocalFeatureStore {
    records: DashMap<String, FeatureRecord>,
    writes: AtomicU64,
}

impl LocalFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total upserts accepted, including overwrites.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl FeatureStore for LocalFeatureStore {
    async fn upsert(&self, record: &FeatureRecord) -> Result<()> {
        self.records.insert(record.key(), record.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<FeatureRecord>> {
        Ok(self
            .records
            .get(&FeatureRecord::key_for(user_id))
            .map(|r| r.value().clone()))
    }

    async fn list(&self) -> Result<Vec<FeatureRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::RiskVerdict;

    #[tokio::test]
    async fn test_upsert_overwrites_and_is_idempotent() {
        let store = LocalFeatureStore::new();
        let first = FeatureRecord::from_verdict("u1", &RiskVerdict::risky("threat"));
        let second = FeatureRecord::from_verdict("u1", &RiskVerdict::safe("greeting"));

        store.upsert(&first).await.unwrap();
        store.upsert(&second).await.unwrap();
        store.upsert(&second).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 3);
        assert_eq!(store.get("u1").await.unwrap(), Some(second));
        assert!(store.get("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_returns_every_user() {
        let store = LocalFeatureStore::new();
        for user in ["a", "b", "c"] {
            let record = FeatureRecord::from_verdict(user, &RiskVerdict::safe("ok"));
            store.upsert(&record).await.unwrap();
        }
        let mut users: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        users.sort();
        assert_eq!(users, vec!["a", "b", "c"]);
    }
}
