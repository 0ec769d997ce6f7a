use common::model::Config;
use engine::api::{self, ApiState};
use engine::logging::init_logging;
use engine::store::RedisFeatureStore;
use engine::worker::spawn_signal_handler;
use log::{error, info};
use queue::RedisQueue;
use std::sync::Arc;
use tokio::sync::broadcast;

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

    let store = match RedisFeatureStore::from_config(&config.redis) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create feature store: {e}");
            std::process::exit(1);
        }
    };
    let queue = match RedisQueue::new(&config.redis, &config.queue.key) {
        Ok(queue) => queue,
        Err(e) => {
            error!("Failed to create task queue: {e}");
            std::process::exit(1);
        }
    };
    let prometheus_handle = engine::metrics::install_recorder()
        .map_err(|e| error!("Failed to install Prometheus recorder: {e}"))
        .ok();

    let state = ApiState::new(Arc::new(store))
        .with_queue(Arc::new(queue))
        .with_prometheus(prometheus_handle);

    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_signal_handler(shutdown_tx.clone());

    let server = match api::serve(api::router(state), config.api.port, shutdown_tx.subscribe()).await
    {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind API port {}: {e}", config.api.port);
            std::process::exit(1);
        }
    };
    if let Err(e) = server.await {
        error!("API server task failed: {e}");
    }
    info!("API stopped");
}
