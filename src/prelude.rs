// Models and traits
pub use ::common::interface::FeatureStore;
pub use ::common::model::{Config, FeatureRecord, RiskVerdict, TaskEvent};

// Errors
pub use ::errors::{Error, ErrorKind, Result};

// Pipeline
pub use ::engine::inference::{Classifier, InferenceClient, OllamaClassifier};
pub use ::engine::store::{LocalFeatureStore, RedisFeatureStore};
pub use ::engine::{TaskOutcome, TaskProcessor, Worker};
pub use ::queue::{MemoryQueue, RedisQueue, TaskQueue};
