//! Agent execution: a stored agent definition plus an input event turn
//! into one concrete model invocation.

pub mod models;
pub mod prompt;
pub mod settings;

pub use models::{map_model, ProviderKind};
pub use prompt::{build_prompt, DEFAULT_USER_PROMPT};
pub use settings::{resolve_settings, DEFAULT_SETTINGS_KEY};

use crate::config::{AGENT_CHAT_TIMEOUT, BridgeConfig};
use crate::errors::BridgeError;
use crate::llm::{ChatBackend, LlmClient};
use crate::models::{AgentRecord, ChatMessage, ChatRequest, LlmSettings};
use crate::store::{ConfigStore, HttpConfigStore};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Temperature for agent-triggered completions, lower than interactive
/// chat so small local models stay on task.
pub const AGENT_TEMPERATURE: f32 = 0.3;

/// Token budget for agent-triggered completions.
pub const AGENT_MAX_TOKENS: i32 = 1024;

/// Prefix under which agent definitions live in the store.
const AGENT_KEY_PREFIX: &str = "agents.";

/// Input event carried into one execution.
#[derive(Debug, Clone, Default)]
pub struct AgentInput {
    /// Raw input text; the generic instruction is used when absent.
    pub text: Option<String>,
    /// Serialized into the system prompt's context block when present.
    pub context: Option<Value>,
    /// Per-call settings override (e.g. an agent-box selection).
    pub settings: Option<LlmSettings>,
}

impl AgentInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Tagged outcome of one execution. The executor never panics or errors
/// past this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub content: String,
    pub tokens_used: Option<i32>,
    pub agent_id: String,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn failure(agent_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: String::new(),
            tokens_used: None,
            agent_id: agent_id.to_string(),
            error: Some(error.into()),
        }
    }
}

/// Runs stored agents: load configuration, gate on the reasoning
/// capability, resolve settings, build the prompt, map the model, and
/// invoke the backend.
pub struct AgentExecutor {
    store: Arc<dyn ConfigStore>,
    backend: Arc<dyn ChatBackend>,
    fallback: LlmSettings,
}

impl AgentExecutor {
    pub fn new(store: Arc<dyn ConfigStore>, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            store,
            backend,
            fallback: LlmSettings::fallback(),
        }
    }

    /// Executor wired to the orchestrator's HTTP endpoints.
    pub fn over_orchestrator(config: &BridgeConfig) -> Result<Self> {
        let store = Arc::new(HttpConfigStore::new(config.orchestrator_host.clone())?);
        let backend = Arc::new(LlmClient::with_timeout(
            config.orchestrator_host.clone(),
            AGENT_CHAT_TIMEOUT,
        )?);
        Ok(Self::new(store, backend))
    }

    /// Replace the hard fallback settings. The default is a documented
    /// product choice, not a protocol constant.
    pub fn with_fallback(mut self, fallback: LlmSettings) -> Self {
        self.fallback = fallback;
        self
    }

    /// Store key for an agent identifier. Numeric identifiers are
    /// zero-padded to two digits: agent `7` lives under `agents.agent07`.
    pub fn agent_key(agent_id: &str) -> String {
        match agent_id.trim().parse::<u64>() {
            Ok(number) => format!("{AGENT_KEY_PREFIX}agent{number:02}"),
            Err(_) => format!("{AGENT_KEY_PREFIX}{}", agent_id.trim()),
        }
    }

    /// Execute one agent against one input event.
    pub async fn execute(&self, agent_id: &str, input: AgentInput) -> ExecutionResult {
        match self.run(agent_id, input).await {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(agent_id, error = %err, "agent execution failed");
                ExecutionResult::failure(agent_id, err.to_string())
            }
        }
    }

    async fn run(&self, agent_id: &str, input: AgentInput) -> Result<ExecutionResult, BridgeError> {
        let record = self.load_record(agent_id).await?;
        // Local gate, before any settings lookup or network call.
        let reasoning = record.reasoning(agent_id)?;

        let resolved = resolve_settings(
            input.settings.as_ref(),
            &reasoning,
            self.store.as_ref(),
            &self.fallback,
        )
        .await;
        let model_id = map_model(&resolved)?;

        let (system, user) = build_prompt(&reasoning, input.text.as_deref(), input.context.as_ref());

        if !self.backend.is_reachable().await {
            return Err(BridgeError::TransportUnreachable);
        }
        if !self.backend.is_ready().await {
            return Err(BridgeError::RuntimeNotReady);
        }

        let request = ChatRequest {
            model_id,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: Some(AGENT_TEMPERATURE),
            max_tokens: Some(AGENT_MAX_TOKENS),
        };
        tracing::debug!(agent_id, model = %request.model_id, "invoking agent completion");
        let response = self.backend.send_request(&request).await;

        Ok(ExecutionResult {
            success: response.success,
            content: response.content,
            tokens_used: response.tokens_used,
            agent_id: agent_id.to_string(),
            error: response.error,
        })
    }

    async fn load_record(&self, agent_id: &str) -> Result<AgentRecord, BridgeError> {
        let key = Self::agent_key(agent_id);
        let raw = self
            .store
            .get(&key)
            .await
            .map_err(|_| BridgeError::AgentNotFound(agent_id.to_string()))?
            .ok_or_else(|| BridgeError::AgentNotFound(agent_id.to_string()))?;
        serde_json::from_str(&raw).map_err(|_| BridgeError::AgentNotFound(agent_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_are_zero_padded_and_prefixed() {
        assert_eq!(AgentExecutor::agent_key("7"), "agents.agent07");
        assert_eq!(AgentExecutor::agent_key("42"), "agents.agent42");
        assert_eq!(AgentExecutor::agent_key(" 7 "), "agents.agent07");
    }

    #[test]
    fn named_ids_pass_through_under_the_prefix() {
        assert_eq!(AgentExecutor::agent_key("scout"), "agents.scout");
    }
}
