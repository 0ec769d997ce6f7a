use common::interface::FeatureStore;
use common::model::feature::FIELD_REASON;
use common::model::TaskEvent;
use engine::api::{self, ApiState};
use engine::inference::{InferenceClient, OllamaClassifier};
use engine::metrics::PipelineStats;
use engine::store::LocalFeatureStore;
use engine::TaskProcessor;
use queue::{MemoryQueue, TaskQueue};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_verdict(server: &MockServer, prompt: &str, verdict: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "prompt": prompt })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": verdict.to_string(),
            "done": true,
        })))
        .mount(server)
        .await;
}

async fn wait_for_writes(store: &LocalFeatureStore, writes: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.write_count() < writes {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker did not store the expected records in time");
}

#[tokio::test]
async fn test_threat_then_greeting_overwrites_user_record() {
    let server = MockServer::start().await;
    mount_verdict(
        &server,
        "I will hurt you",
        json!({"is_risky": true, "reason": "explicit threat of violence"}),
    )
    .await;
    mount_verdict(
        &server,
        "hey, how's it going",
        json!({"is_risky": false, "reason": "friendly greeting"}),
    )
    .await;

    let queue = Arc::new(MemoryQueue::new());
    let store = Arc::new(LocalFeatureStore::new());
    let stats = Arc::new(PipelineStats::new());
    let classifier =
        OllamaClassifier::new(&server.uri(), "qwen2.5:3b", Duration::from_secs(5)).unwrap();
    let processor = TaskProcessor::new(
        queue.clone(),
        store.clone(),
        InferenceClient::new(Arc::new(classifier), stats.clone()),
        stats,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let worker = tokio::spawn(async move { processor.run(shutdown_rx).await });

    let first = TaskEvent::new("m1", "u1", "I will hurt you", "2026-01-01T00:00:00Z");
    queue.push(&first.encode()).await.unwrap();
    wait_for_writes(&store, 1).await;

    let record = store.get("u1").await.unwrap().unwrap();
    assert!(record.risky);
    assert!(!record.reason.is_empty());

    let app = api::router(ApiState::new(store.clone()));
    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/user/u1/risk")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["risky"], "True");
    assert_eq!(body[FIELD_REASON], "explicit threat of violence");

    let second = TaskEvent::new("m2", "u1", "hey, how's it going", "2026-01-01T00:00:05Z");
    queue.push(&second.encode()).await.unwrap();
    wait_for_writes(&store, 2).await;

    let record = store.get("u1").await.unwrap().unwrap();
    assert!(!record.risky);
    assert_eq!(record.reason, "friendly greeting");

    shutdown_tx.send(()).unwrap();
    let snapshot = worker.await.unwrap();
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.threats, 1);
    assert_eq!(snapshot.rejected, 0);
}

#[tokio::test]
async fn test_unreachable_model_still_records_error_verdict() {
    let queue = Arc::new(MemoryQueue::new());
    let store = Arc::new(LocalFeatureStore::new());
    let stats = Arc::new(PipelineStats::new());
    let classifier =
        OllamaClassifier::new("http://127.0.0.1:9", "qwen2.5:3b", Duration::from_secs(2)).unwrap();
    let processor = TaskProcessor::new(
        queue.clone(),
        store.clone(),
        InferenceClient::new(Arc::new(classifier), stats.clone()),
        stats,
    );

    queue.push(b"{not json").await.unwrap();
    queue
        .push(&TaskEvent::new("m1", "u7", "anything", "2026-01-01T00:00:00Z").encode())
        .await
        .unwrap();
    queue.close();

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let snapshot = processor.run(shutdown_rx).await;

    assert_eq!(snapshot.rejected, 1);
    assert_eq!(snapshot.processed, 1);
    let record = store.get("u7").await.unwrap().unwrap();
    assert!(!record.risky);
    assert_eq!(record.reason, "LLM_Error");
}
