//! Chat-completion client for the orchestrator's inference endpoint.

use crate::config::{CHAT_TIMEOUT, STATUS_PROBE_TIMEOUT};
use crate::models::{ChatRequest, ChatResponse};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    data: Option<ChatPayload>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tokens_used: Option<i32>,
    #[serde(default)]
    model: Option<String>,
}

/// Seam between the executor and whatever serves completions, so tests
/// can count calls without a network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One normalized chat-completion round trip. Never errors; every
    /// failure mode lands in the response's `success`/`error` fields.
    async fn send_request(&self, request: &ChatRequest) -> ChatResponse;

    /// Whether the orchestrator process answers at all.
    async fn is_reachable(&self) -> bool;

    /// Whether the inference runtime behind it is ready to serve.
    async fn is_ready(&self) -> bool;
}

/// Stateless client for `POST /chat`.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, CHAT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Perform one chat completion. All outcomes map to a tagged
    /// [`ChatResponse`]; this function never returns an error.
    pub async fn send_request(&self, request: &ChatRequest) -> ChatResponse {
        let outcome = self
            .client
            .post(self.url("/chat"))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => return ChatResponse::failure(classify_transport_error(&err)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return ChatResponse::failure(format!("chat endpoint returned {status}: {body}"));
        }

        let envelope: ChatEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(err) => return ChatResponse::failure(format!("malformed chat response: {err}")),
        };

        if !envelope.ok {
            return ChatResponse::failure(
                envelope
                    .message
                    .unwrap_or_else(|| "chat completion failed".to_string()),
            );
        }

        match envelope.data {
            Some(payload) if !payload.content.is_empty() => {
                ChatResponse::ok(payload.content, payload.tokens_used, payload.model)
            }
            _ => ChatResponse::failure("chat completion returned no content"),
        }
    }

    /// Best-effort probe of the inference runtime. Never errors.
    pub async fn check_availability(&self) -> bool {
        self.probe("/runtime/status").await
    }

    /// Best-effort probe of the orchestrator itself. Never errors.
    pub async fn check_reachable(&self) -> bool {
        self.probe("/status").await
    }

    async fn probe(&self, path: &str) -> bool {
        let outcome = self
            .client
            .get(self.url(path))
            .timeout(STATUS_PROBE_TIMEOUT)
            .send()
            .await;
        match outcome {
            Ok(response) if response.status().is_success() => response
                .json::<ChatEnvelope>()
                .await
                .map(|envelope| envelope.ok)
                .unwrap_or(false),
            _ => false,
        }
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn send_request(&self, request: &ChatRequest) -> ChatResponse {
        LlmClient::send_request(self, request).await
    }

    async fn is_reachable(&self) -> bool {
        self.check_reachable().await
    }

    async fn is_ready(&self) -> bool {
        self.check_availability().await
    }
}

fn classify_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out; the model may still be loading on a slow system".to_string()
    } else if err.is_connect() {
        "backend unreachable; start the desktop app and try again".to_string()
    } else {
        format!("chat request failed: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model_id: "mistral:7b".to_string(),
            messages: vec![ChatMessage::user("hello")],
            temperature: None,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn successful_completion_maps_content_and_usage() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "data": {"content": "hi there", "tokensUsed": 42, "model": "mistral:7b"}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri())?;
        let response = client.send_request(&request()).await;

        assert!(response.success);
        assert_eq!(response.content, "hi there");
        assert_eq!(response.tokens_used, Some(42));
        assert_eq!(response.model.as_deref(), Some("mistral:7b"));
        assert!(response.error.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn application_failure_carries_server_message() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "message": "model not loaded"})),
            )
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri())?;
        let response = client.send_request(&request()).await;

        assert!(!response.success);
        assert_eq!(response.content, "");
        assert_eq!(response.error.as_deref(), Some("model not loaded"));
        Ok(())
    }

    #[tokio::test]
    async fn non_2xx_includes_status_and_body() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri())?;
        let response = client.send_request(&request()).await;

        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.contains("503"));
        assert!(error.contains("overloaded"));
        Ok(())
    }

    #[tokio::test]
    async fn timeout_yields_timeout_class_failure() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "data": {"content": "late"}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = LlmClient::with_timeout(server.uri(), Duration::from_millis(100))?;
        let response = client.send_request(&request()).await;

        assert!(!response.success);
        assert_eq!(response.content, "");
        assert!(response.error.unwrap().contains("timed out"));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_is_actionable() -> Result<()> {
        // Nothing listens on this port.
        let client = LlmClient::new("http://127.0.0.1:1")?;
        let response = client.send_request(&request()).await;

        assert!(!response.success);
        assert!(response.error.unwrap().contains("backend unreachable"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_content_never_reports_success() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"content": ""}})),
            )
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri())?;
        let response = client.send_request(&request()).await;
        assert!(!response.success);
        Ok(())
    }

    #[tokio::test]
    async fn availability_probe_never_errors() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runtime/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = LlmClient::new(server.uri())?;
        assert!(client.check_availability().await);

        let dead = LlmClient::new("http://127.0.0.1:1")?;
        assert!(!dead.check_availability().await);
        Ok(())
    }
}
