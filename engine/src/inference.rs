use crate::metrics::{record_inference_latency, PipelineStats};
use async_trait::async_trait;
use common::model::config::InferenceConfig;
use common::model::RiskVerdict;
use errors::InferenceError;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Fixed instruction sent with every classification request.
pub const SYSTEM_PROMPT: &str = "You are a Trust & Safety bot. \
Analyze the message for clear indicators of scam, harassment, or insider threat. \
Rules:\n\
1. If the text is just gibberish, broken English, or nonsense, output 'is_risky': false.\n\
2. Only flag as 'is_risky': true if there is explicit evidence of harm, theft, or violence.\n\
Output ONLY a JSON object with keys: 'is_risky' (boolean) and 'reason' (string).";

/// A remote classifier. Implementations report failures as typed errors;
/// [`InferenceClient`] turns them into the default verdict.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn try_classify(&self, text: &str) -> Result<RiskVerdict, InferenceError>;
}

/// Never-failing front of a [`Classifier`]: records latency for every call
/// and downgrades any failure to `{is_risky: false, reason: "LLM_Error"}`.
#[derive(Clone)]
pub struct InferenceClient {
    backend: Arc<dyn Classifier>,
    stats: Arc<PipelineStats>,
}

impl InferenceClient {
    pub fn new(backend: Arc<dyn Classifier>, stats: Arc<PipelineStats>) -> Self {
        Self { backend, stats }
    }

    pub async fn classify(&self, text: &str) -> RiskVerdict {
        let started = Instant::now();
        let result = self.backend.try_classify(text).await;
        record_inference_latency(started.elapsed());

        match result {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Inference failed ({}): {}", e.cause(), e);
                self.stats.record_inference_failure(e.cause());
                RiskVerdict::llm_error()
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Client for an Ollama-compatible `/api/generate` endpoint in JSON mode.
pub struct OllamaClassifier {
    client: Client,
    addr: String,
    model: String,
}

impl OllamaClassifier {
    pub fn new(addr: &str, model: &str, timeout: Duration) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| InferenceError::Transport(Box::new(e)))?;
        Ok(Self {
            client,
            addr: addr.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        Self::new(
            &config.addr,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Any HTTP answer from the service root counts as reachable.
    pub async fn ping(&self) -> Result<(), InferenceError> {
        self.client
            .get(&self.addr)
            .send()
            .await
            .map(|_| ())
            .map_err(map_transport)
    }

    /// Probes the service until it answers. Returns `false` if shutdown was
    /// signalled first.
    pub async fn wait_until_ready(
        &self,
        retry_every: Duration,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> bool {
        info!("Worker connecting to inference service at {}...", self.addr);
        loop {
            match self.ping().await {
                Ok(()) => {
                    info!("Connected to inference service at {}", self.addr);
                    return true;
                }
                Err(e) => warn!("Waiting for inference service... ({e})"),
            }
            tokio::select! {
                _ = shutdown.recv() => return false,
                _ = tokio::time::sleep(retry_every) => {}
            }
        }
    }
}

fn map_transport(e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(Box::new(e))
    }
}

#[async_trait]
impl Classifier for OllamaClassifier {
    async fn try_classify(&self, text: &str) -> Result<RiskVerdict, InferenceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: text,
            system: SYSTEM_PROMPT,
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.addr))
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout
            } else {
                InferenceError::Decode(format!("response body: {e}"))
            }
        })?;
        let generated = body
            .response
            .ok_or_else(|| InferenceError::Decode("missing `response` field".to_string()))?;

        serde_json::from_str(&generated)
            .map_err(|e| InferenceError::Decode(format!("generated verdict: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(server: &MockServer, timeout: Duration) -> OllamaClassifier {
        OllamaClassifier::new(&server.uri(), "qwen2.5:3b", timeout).unwrap()
    }

    async fn mount_generate(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    struct Failing;

    #[async_trait]
    impl Classifier for Failing {
        async fn try_classify(&self, _text: &str) -> Result<RiskVerdict, InferenceError> {
            Err(InferenceError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_sends_json_mode_request_and_parses_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:3b",
                "prompt": "I will hurt you",
                "system": SYSTEM_PROMPT,
                "stream": false,
                "format": "json",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "qwen2.5:3b",
                "response": "{\"is_risky\": true, \"reason\": \"explicit threat of violence\"}",
                "done": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let verdict = classifier(&server, Duration::from_secs(5))
            .try_classify("I will hurt you")
            .await
            .unwrap();
        assert_eq!(verdict, RiskVerdict::risky("explicit threat of violence"));
    }

    #[tokio::test]
    async fn test_server_error_is_status_failure() {
        let server = MockServer::start().await;
        mount_generate(&server, ResponseTemplate::new(503)).await;

        let err = classifier(&server, Duration::from_secs(5))
            .try_classify("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Status(503)));
    }

    #[tokio::test]
    async fn test_garbage_generated_text_is_decode_failure() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "response": "sure! {is_risky: yes" })),
        )
        .await;

        let err = classifier(&server, Duration::from_secs(5))
            .try_classify("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_response_field_is_decode_failure() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "done": true })),
        )
        .await;

        let err = classifier(&server, Duration::from_secs(5))
            .try_classify("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_failure() {
        let server = MockServer::start().await;
        mount_generate(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

        let err = classifier(&server, Duration::from_secs(5))
            .try_classify("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "{\"is_risky\": false, \"reason\": \"ok\"}" }))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let err = classifier(&server, Duration::from_millis(200))
            .try_classify("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Timeout), "{err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_failure() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let classifier =
            OllamaClassifier::new("http://127.0.0.1:9", "m", Duration::from_secs(2)).unwrap();
        let err = classifier.try_classify("hi").await.unwrap_err();
        assert!(
            matches!(err, InferenceError::Transport(_) | InferenceError::Timeout),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_client_downgrades_failures() {
        let stats = Arc::new(PipelineStats::new());
        let client = InferenceClient::new(Arc::new(Failing), stats.clone());

        let verdict = client.classify("anything").await;
        assert_eq!(verdict, RiskVerdict::llm_error());
        assert_eq!(stats.snapshot().inference_failures, 1);
    }

    #[tokio::test]
    async fn test_ready_wait_returns_once_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
            .mount(&server)
            .await;

        let (_tx, mut rx) = broadcast::channel(1);
        let ready = classifier(&server, Duration::from_secs(5))
            .wait_until_ready(Duration::from_millis(10), &mut rx)
            .await;
        assert!(ready);
    }

    #[tokio::test]
    async fn test_ready_wait_stops_on_shutdown() {
        let classifier =
            OllamaClassifier::new("http://127.0.0.1:9", "m", Duration::from_millis(200)).unwrap();
        let (tx, mut rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let ready = tokio::time::timeout(
            Duration::from_secs(5),
            classifier.wait_until_ready(Duration::from_secs(60), &mut rx),
        )
        .await
        .unwrap();
        assert!(!ready);
    }
}
