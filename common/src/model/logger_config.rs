use serde::{Deserialize, Serialize};

/// `[logger]` section of the service config.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    /// Filter directive, e.g. "info" or "info,engine=debug". `RUST_LOG` wins.
    pub level: String,
    /// Emit JSON lines instead of the compact text format
    pub json: bool,
    /// Write to the console
    pub console: bool,
    /// Optional daily-rolling log file
    pub file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            console: true,
            file_path: None,
        }
    }
}
