use crate::api::{self, ApiState};
use crate::inference::{InferenceClient, OllamaClassifier};
use crate::metrics::{self, PipelineStats, StatsSnapshot};
use crate::processor::{StoreRetryPolicy, TaskProcessor};
use crate::store::RedisFeatureStore;
use common::interface::FeatureStore;
use common::model::Config;
use errors::{Error, ErrorKind, Result};
use log::{error, info, warn};
use metrics_exporter_prometheus::PrometheusHandle;
use queue::{RedisQueue, TaskQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Worker process: Redis queue in, Ollama verdicts out to the feature store,
/// with a `/metrics` + `/health` listener on the side.
pub struct Worker {
    config: Config,
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn FeatureStore>,
    classifier: Arc<OllamaClassifier>,
    stats: Arc<PipelineStats>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Worker {
    pub fn from_config(config: Config) -> Result<Self> {
        let queue = RedisQueue::new(&config.redis, &config.queue.key)?;
        let store = RedisFeatureStore::from_config(&config.redis)?;
        let classifier = OllamaClassifier::from_config(&config.inference)?;
        let (shutdown_tx, _) = broadcast::channel(4);
        Ok(Self {
            config,
            queue: Arc::new(queue),
            store: Arc::new(store),
            classifier: Arc::new(classifier),
            stats: Arc::new(PipelineStats::new()),
            shutdown_tx,
        })
    }

    /// Sender side of the shutdown broadcast; sending once stops the worker.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Runs until shutdown. Fails only on startup problems: an unreachable
    /// feature store or a metrics port that cannot be bound.
    pub async fn run(self) -> Result<StatsSnapshot> {
        info!(
            "Starting {} worker: queue={} model={} ollama={}",
            self.config.name,
            self.config.queue.key,
            self.config.inference.model,
            self.classifier.addr()
        );

        self.store.ping().await?;
        info!(
            "Feature store reachable at {}:{}",
            self.config.redis.redis_host, self.config.redis.redis_port
        );

        let prometheus_handle = install_metrics();
        let state = ApiState::new(self.store.clone()).with_prometheus(prometheus_handle);
        let server = api::serve(
            api::worker_router(state),
            self.config.worker.metrics_port,
            self.shutdown_tx.subscribe(),
        )
        .await
        .map_err(|e| {
            Error::with_message(
                ErrorKind::Service,
                format!("failed to bind metrics port {}", self.config.worker.metrics_port),
                Some(e),
            )
        })?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let retry_every = Duration::from_secs(self.config.worker.ready_retry_secs.max(1));
        let snapshot = if self
            .classifier
            .wait_until_ready(retry_every, &mut shutdown_rx)
            .await
        {
            let inference = InferenceClient::new(self.classifier.clone(), self.stats.clone());
            let processor = TaskProcessor::new(
                self.queue.clone(),
                self.store.clone(),
                inference,
                self.stats.clone(),
            )
            .with_retry_policy(StoreRetryPolicy::from_config(&self.config.worker));
            processor.run(shutdown_rx).await
        } else {
            info!("Shutdown requested before the inference service became ready");
            self.stats.snapshot()
        };

        // Stop the side listener too when the loop ended on its own.
        let _ = self.shutdown_tx.send(());
        if let Err(e) = server.await {
            warn!("Metrics server task ended abnormally: {e}");
        }
        info!("Worker stopped");
        Ok(snapshot)
    }
}

fn install_metrics() -> Option<PrometheusHandle> {
    match metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to install Prometheus recorder: {e}");
            None
        }
    }
}

/// Forwards Ctrl+C and, on unix, SIGTERM into the shutdown broadcast.
pub fn spawn_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, initiating shutdown...");
        let _ = shutdown_tx.send(());
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
