pub mod error;

pub use error::{
    BoxError, ConfigError, Error, ErrorKind, InferenceError, QueueError, Result, StoreError,
    TaskError,
};
