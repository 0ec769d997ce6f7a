use super::logger_config::LoggerConfig;
use errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// API Configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Api {
    /// Port number for the read API server
    pub port: u16,
}

impl Default for Api {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Redis Configuration
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis server hostname
    pub redis_host: String,
    /// Redis server port
    pub redis_port: u16,
    /// Redis database index
    pub redis_db: u16,
    /// Optional Redis username
    pub redis_username: Option<String>,
    /// Optional Redis password
    pub redis_password: Option<String>,
    /// Connection pool size
    pub pool_size: Option<usize>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            redis_host: "redis".to_string(),
            redis_port: 6379,
            redis_db: 0,
            redis_username: None,
            redis_password: None,
            pool_size: None,
        }
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("redis_db", &self.redis_db)
            .field("redis_username", &self.redis_username)
            .field(
                "redis_password",
                &self.redis_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Task queue Configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct QueueConfig {
    /// Redis list holding serialized tasks
    pub key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            key: "ml_task_queue".to_string(),
        }
    }
}

/// Inference service Configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base address of the Ollama-compatible service
    pub addr: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Hard per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            addr: "http://ollama:11434".to_string(),
            model: "qwen2.5:3b".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Worker loop Configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Port of the worker's Prometheus endpoint
    pub metrics_port: u16,
    /// Attempts per feature-store write before the task is dropped
    pub store_retry_attempts: u32,
    /// Linear backoff step between store attempts, in milliseconds
    pub store_retry_backoff_ms: u64,
    /// Interval between inference readiness probes at startup, in seconds
    pub ready_retry_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 8001,
            store_retry_attempts: 3,
            store_retry_backoff_ms: 500,
            ready_retry_secs: 5,
        }
    }
}

/// Top-level service configuration. Every section has defaults, so an empty
/// file (or no file at all) yields a usable config.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Application instance name
    pub name: String,
    pub redis: RedisConfig,
    pub queue: QueueConfig,
    pub inference: InferenceConfig,
    pub worker: WorkerConfig,
    pub api: Api,
    pub logger: LoggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "vigil".to_string(),
            redis: RedisConfig::default(),
            queue: QueueConfig::default(),
            inference: InferenceConfig::default(),
            worker: WorkerConfig::default(),
            api: Api::default(),
            logger: LoggerConfig::default(),
        }
    }
}

/// Env var naming the optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "VIGIL_CONFIG";

impl Config {
    /// Loads configuration from a TOML file
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// File named by `VIGIL_CONFIG` (if set), then process env overrides.
    pub fn resolve() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies the deployment env vars on top of the current values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("REDIS_HOST") {
            self.redis.redis_host = host;
        }
        if let Some(port) = get("REDIS_PORT") {
            self.redis.redis_port = parse_env("REDIS_PORT", port)?;
        }
        if let Some(db) = get("REDIS_DB") {
            self.redis.redis_db = parse_env("REDIS_DB", db)?;
        }
        if let Some(password) = get("REDIS_PASSWORD") {
            self.redis.redis_password = Some(password);
        }
        if let Some(addr) = get("OLLAMA_ADDR") {
            self.inference.addr = addr.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.inference.model = model;
        }
        if let Some(key) = get("TASK_QUEUE") {
            self.queue.key = key;
        }
        if let Some(port) = get("METRICS_PORT") {
            self.worker.metrics_port = parse_env("METRICS_PORT", port)?;
        }
        if let Some(port) = get("API_PORT") {
            self.api.port = parse_env("API_PORT", port)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logger.level = level;
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
