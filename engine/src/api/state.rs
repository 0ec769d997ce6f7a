use common::interface::FeatureStore;
use metrics_exporter_prometheus::PrometheusHandle;
use queue::TaskQueue;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub(crate) store: Arc<dyn FeatureStore>,
    /// Present on the read API, where `POST /tasks` enqueues work.
    pub(crate) queue: Option<Arc<dyn TaskQueue>>,
    pub(crate) prometheus_handle: Option<PrometheusHandle>,
}

impl ApiState {
    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self {
            store,
            queue: None,
            prometheus_handle: None,
        }
    }

    pub fn with_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_prometheus(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.prometheus_handle = handle;
        self
    }
}
