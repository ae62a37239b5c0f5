//! Capability surface UI components use to talk to the orchestrator.

mod extended;

pub use extended::{reset_shared_bridge, shared_bridge, BridgeContext, ExtendedBridge, RaceOutcome};

use crate::config::BridgeConfig;
use crate::errors::{BridgeError, BridgeResult};
use crate::events::{EventKind, EventManager, Subscription};
use crate::llm::LlmClient;
use crate::models::{ChatMessage, ChatRequest};
use crate::transport::{ChannelMessage, RealtimeChannel};
use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Placement of the UI surface this bridge serves. Fixed per execution
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    SidePanel,
}

/// Minimal contract every UI surface needs: fire-and-forget commands,
/// event subscription, and one-shot AI requests.
pub struct Bridge {
    events: Arc<EventManager>,
    channel: Arc<dyn RealtimeChannel>,
    llm: LlmClient,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(channel: Arc<dyn RealtimeChannel>, config: BridgeConfig) -> Result<Self> {
        let events = Arc::new(EventManager::new());
        events.attach(&channel);
        let llm = LlmClient::new(config.orchestrator_host.clone())?;
        Ok(Self {
            events,
            channel,
            llm,
            config,
        })
    }

    /// Fire-and-forget command toward the orchestrator. Transport
    /// failures are logged, never surfaced to the caller.
    pub fn send_message(&self, kind: &str, payload: Value) {
        let channel = Arc::clone(&self.channel);
        let message = ChannelMessage::new(kind, payload);
        let kind = kind.to_string();
        tokio::spawn(async move {
            if let Err(err) = channel.send(message).await {
                tracing::warn!(kind = %kind, error = %err, "failed to forward message");
            }
        });
    }

    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.subscribe(event, handler)
    }

    /// Single chat-completion round trip with the bridge's default model.
    pub async fn request_ai(&self, prompt: &str, context: Option<&str>) -> BridgeResult<String> {
        let mut messages = Vec::new();
        if let Some(context) = context {
            messages.push(ChatMessage::system(context));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatRequest {
            model_id: self.config.chat_model.clone(),
            messages,
            temperature: None,
            max_tokens: None,
        };
        let response = self.llm.send_request(&request).await;
        if response.success {
            Ok(response.content)
        } else {
            Err(BridgeError::ChatCompletion(
                response
                    .error
                    .unwrap_or_else(|| "chat completion failed".to_string()),
            ))
        }
    }

    /// Ask the editor to open a file, optionally at a line.
    pub fn open_file(&self, path: &str, line: Option<u32>) {
        let mut payload = json!({ "path": path });
        if let Some(line) = line {
            payload["line"] = json!(line);
        }
        self.send_message(EventKind::OPEN_FILE, payload);
    }

    pub fn panel(&self) -> Panel {
        Panel::SidePanel
    }

    pub(crate) fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub(crate) fn config(&self) -> &BridgeConfig {
        &self.config
    }
}
