use common::model::Config;
use engine::logging::init_logging;
use engine::worker::{spawn_signal_handler, Worker};
use log::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = init_logging(&config.logger) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let worker = match Worker::from_config(config) {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to build worker: {e}");
            std::process::exit(1);
        }
    };
    spawn_signal_handler(worker.shutdown_handle());

    match worker.run().await {
        Ok(stats) => info!(
            "Exiting: processed={} threats={} rejected={}",
            stats.processed, stats.threats, stats.rejected
        ),
        Err(e) => {
            error!("Worker failed: {e}");
            std::process::exit(1);
        }
    }
}
