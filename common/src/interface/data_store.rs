use crate::model::FeatureRecord;
use async_trait::async_trait;
use errors::Result;

/// Shared per-user verdict store.
///
/// `upsert` is a single-key write with no read-before-write: repeating it
/// with the same record leaves the store unchanged, and the last writer wins.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn upsert(&self, record: &FeatureRecord) -> Result<()>;

    async fn get(&self, user_id: &str) -> Result<Option<FeatureRecord>>;

    /// Every record under the `user_risk:` prefix, in no particular order.
    async fn list(&self) -> Result<Vec<FeatureRecord>>;

    async fn ping(&self) -> Result<()>;
}
