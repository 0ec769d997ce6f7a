pub mod api;
pub mod inference;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod store;
pub mod worker;

pub use processor::{StoreRetryPolicy, TaskOutcome, TaskProcessor};
pub use worker::Worker;
