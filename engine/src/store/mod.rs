mod local_backend;
mod redis_backend;

pub use local_backend::LocalFeatureStore;
pub use redis_backend::RedisFeatureStore;
