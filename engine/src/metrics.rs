use log::info;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const TASKS_PROCESSED: &str = "tasks_processed_total";
pub const THREATS_DETECTED: &str = "threats_detected_total";
pub const TASKS_REJECTED: &str = "tasks_rejected_total";
pub const INFERENCE_FAILURES: &str = "inference_failures_total";
pub const STORE_WRITE_FAILURES: &str = "store_write_failures_total";
pub const INFERENCE_LATENCY: &str = "llm_processing_seconds";
pub const API_HITS: &str = "api_hits_total";

/// Local CPU inference is slow; buckets stretch to the request timeout.
const LATENCY_BUCKETS: [f64; 12] = [
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0,
];

/// Pipeline counters.
///
/// Every increment goes both to the process-wide `metrics` recorder (scraped
/// from `/metrics`) and to a local atomic so callers can read exact values
/// without a recorder installed.
#[derive(Debug, Default)]
pub struct PipelineStats {
    processed: AtomicU64,
    threats: AtomicU64,
    rejected: AtomicU64,
    inference_failures: AtomicU64,
    store_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub threats: u64,
    pub rejected: u64,
    pub inference_failures: u64,
    pub store_failures: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        counter!(TASKS_PROCESSED).increment(1);
    }

    pub fn record_threat(&self) {
        self.threats.fetch_add(1, Ordering::Relaxed);
        counter!(THREATS_DETECTED).increment(1);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        counter!(TASKS_REJECTED).increment(1);
    }

    pub fn record_inference_failure(&self, cause: &'static str) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
        counter!(INFERENCE_FAILURES, "cause" => cause).increment(1);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
        counter!(STORE_WRITE_FAILURES).increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            threats: self.threats.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

pub fn record_inference_latency(elapsed: Duration) {
    histogram!(INFERENCE_LATENCY).record(elapsed.as_secs_f64());
}

pub fn record_api_hit(route: &'static str) {
    counter!(API_HITS, "route" => route).increment(1);
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(INFERENCE_LATENCY.to_string()), &LATENCY_BUCKETS)
}

fn describe() {
    describe_counter!(TASKS_PROCESSED, "Total tasks analyzed and stored");
    describe_counter!(THREATS_DETECTED, "Total tasks flagged risky");
    describe_counter!(TASKS_REJECTED, "Malformed task payloads dropped");
    describe_counter!(INFERENCE_FAILURES, "Inference calls downgraded to the error verdict");
    describe_counter!(STORE_WRITE_FAILURES, "Feature store writes that exhausted retries");
    describe_histogram!(INFERENCE_LATENCY, Unit::Seconds, "Time taken by the inference service");
    describe_counter!(API_HITS, "Total read API calls");
}

/// Installs the process-wide Prometheus recorder and starts histogram upkeep.
///
/// Must be called from inside a tokio runtime.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = builder()?.install_recorder()?;
    describe();

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    info!("Prometheus recorder installed");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tracks_every_counter() {
        let stats = PipelineStats::new();
        stats.record_processed();
        stats.record_processed();
        stats.record_threat();
        stats.record_rejected();
        stats.record_inference_failure("timeout");
        stats.record_store_failure();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                processed: 2,
                threats: 1,
                rejected: 1,
                inference_failures: 1,
                store_failures: 1,
            }
        );
    }

    #[test]
    fn counters_reach_the_prometheus_exporter() {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        let stats = PipelineStats::new();

        metrics::with_local_recorder(&recorder, || {
            stats.record_processed();
            stats.record_threat();
            stats.record_inference_failure("decode");
            record_inference_latency(Duration::from_millis(300));
        });

        let rendered = handle.render();
        assert!(rendered.contains("tasks_processed_total 1"), "{rendered}");
        assert!(rendered.contains("threats_detected_total 1"), "{rendered}");
        assert!(rendered.contains("inference_failures_total{cause=\"decode\"} 1"), "{rendered}");
        assert!(rendered.contains("llm_processing_seconds_bucket"), "{rendered}");
        assert!(rendered.contains("llm_processing_seconds_count 1"), "{rendered}");
    }
}
