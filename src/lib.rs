//! vigil: content risk pipeline.
//!
//! `vigil-worker` pops tasks from a Redis list, classifies each message with
//! an Ollama model and keeps the latest verdict per user in Redis hashes.
//! `vigil-api` serves those verdicts over HTTP.

pub mod prelude;

pub use common;
pub use engine;
pub use errors;
pub use queue;
pub use utils;
