pub mod config;
pub mod feature;
pub mod logger_config;
pub mod task;
pub mod verdict;

pub use config::Config;
pub use feature::FeatureRecord;
pub use task::TaskEvent;
pub use verdict::RiskVerdict;
