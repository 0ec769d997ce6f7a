use common::model::logger_config::LoggerConfig;
use std::path::PathBuf;

/// Maps the `[logger]` config section onto the subscriber setup and installs it.
pub fn init_logging(config: &LoggerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = utils::logger::LoggerConfig::new()
        .with_level(&config.level)
        .with_console(config.console)
        .with_json(config.json);
    if let Some(path) = config.file_path.as_deref().filter(|p| !p.trim().is_empty()) {
        logger = logger.with_file_path(PathBuf::from(path));
    }
    logger.init()
}
