//! Request/response transport to the orchestrator's local HTTP endpoint.

use crate::config::{HTTP_TIMEOUT, STATUS_PROBE_TIMEOUT};
use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard response envelope used by every orchestrator HTTP endpoint.
/// Non-2xx statuses and non-JSON bodies are failures, never parsed as
/// success.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of the transport status query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub ready_state: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorHttp {
    client: Client,
    base_url: String,
}

impl OrchestratorHttp {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_envelope(&self, path: &str) -> Result<Envelope> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("orchestrator returned {status} for {path}");
        }
        Ok(response.json().await?)
    }

    fn unwrap_data(envelope: Envelope, what: &str) -> Result<Value> {
        if !envelope.ok {
            bail!(
                "{what} failed: {}",
                envelope.message.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        envelope
            .data
            .ok_or_else(|| anyhow!("{what} returned no data"))
    }

    /// Fetch a named template over the request/response path.
    pub async fn fetch_template(&self, name: &str) -> Result<String> {
        let envelope = self.get_envelope(&format!("/templates/{name}")).await?;
        let data = Self::unwrap_data(envelope, "template fetch")?;
        data.as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("template payload is not a string"))
    }

    /// Paths of files changed in the connected editor workspace.
    pub async fn changed_files(&self) -> Result<Vec<String>> {
        let envelope = self.get_envelope("/files/changed").await?;
        let data = Self::unwrap_data(envelope, "changed-files query")?;
        Ok(serde_json::from_value(data)?)
    }

    /// Single round trip to the transport status query. Callers treat any
    /// failure as "down" rather than propagating it.
    pub async fn status(&self) -> Result<ConnectionStatus> {
        let response = self
            .client
            .get(self.url("/status"))
            .timeout(STATUS_PROBE_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("status endpoint returned {}", response.status());
        }
        let envelope: Envelope = response.json().await?;
        let data = Self::unwrap_data(envelope, "status query")?;
        Ok(serde_json::from_value(data)?)
    }

    /// Read one opaque value from the key-value configuration store.
    /// A missing key is `Ok(None)`; transport problems are errors.
    pub async fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.url("/get"))
            .query(&[("key", key)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("key-value store returned {status} for key {key}");
        }
        let envelope: Envelope = response.json().await?;
        if !envelope.ok {
            return Ok(None);
        }
        Ok(envelope.data.and_then(|value| match value {
            Value::String(text) => Some(text),
            Value::Null => None,
            other => Some(other.to_string()),
        }))
    }

    /// Enumerate keys present in the configuration store.
    pub async fn kv_keys(&self) -> Result<Vec<String>> {
        let envelope = self.get_envelope("/keys").await?;
        let data = Self::unwrap_data(envelope, "key enumeration")?;
        Ok(serde_json::from_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn template_fetch_returns_content() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/templates/panel"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "data": "<div>panel</div>"})),
            )
            .mount(&server)
            .await;

        let transport = OrchestratorHttp::new(server.uri())?;
        assert_eq!(transport.fetch_template("panel").await?, "<div>panel</div>");
        Ok(())
    }

    #[tokio::test]
    async fn non_2xx_is_a_failure() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/templates/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transport = OrchestratorHttp::new(server.uri())?;
        let result = transport.fetch_template("broken").await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn non_json_body_is_a_failure() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/templates/odd"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let transport = OrchestratorHttp::new(server.uri())?;
        assert!(transport.fetch_template("odd").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn kv_get_maps_missing_keys_to_none() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("key", "absent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "message": "no such key"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("key", "present"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": "value"})),
            )
            .mount(&server)
            .await;

        let transport = OrchestratorHttp::new(server.uri())?;
        assert_eq!(transport.kv_get("absent").await?, None);
        assert_eq!(transport.kv_get("present").await?, Some("value".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn status_parses_ready_state() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"ok": true, "data": {"isConnected": true, "readyState": 1}}),
            ))
            .mount(&server)
            .await;

        let transport = OrchestratorHttp::new(server.uri())?;
        let status = transport.status().await?;
        assert!(status.is_connected);
        assert_eq!(status.ready_state, Some(1));
        Ok(())
    }
}
