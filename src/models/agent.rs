use crate::errors::BridgeError;
use serde::{Deserialize, Serialize};

/// Capability names as they appear in stored agent records.
pub mod capability {
    pub const REASONING: &str = "reasoning";
    pub const MEMORY: &str = "memory";
    pub const IMAGE_GENERATION: &str = "image_generation";
    pub const AUTOMATION: &str = "automation";
}

/// Declarative reasoning block of an agent definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningConfig {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
}

/// Persisted agent definition as stored in the configuration store.
///
/// The stored shape keeps capabilities as plain strings with an optional
/// reasoning block beside them; `capability_model` lifts that into the
/// tagged [`AgentCapability`] form used by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub reasoning: Option<ReasoningConfig>,
}

/// Typed view of a declared capability.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCapability {
    Reasoning(ReasoningConfig),
    Memory,
    ImageGeneration,
    Automation,
    Unknown(String),
}

impl AgentRecord {
    /// Lift the stored string set into tagged capabilities. A declared
    /// `reasoning` capability without a reasoning block is kept as
    /// `Unknown`, which `reasoning` reports as a missing configuration.
    pub fn capability_model(&self) -> Vec<AgentCapability> {
        self.capabilities
            .iter()
            .map(|name| match name.as_str() {
                capability::REASONING => match &self.reasoning {
                    Some(config) => AgentCapability::Reasoning(config.clone()),
                    None => AgentCapability::Unknown(name.clone()),
                },
                capability::MEMORY => AgentCapability::Memory,
                capability::IMAGE_GENERATION => AgentCapability::ImageGeneration,
                capability::AUTOMATION => AgentCapability::Automation,
                other => AgentCapability::Unknown(other.to_string()),
            })
            .collect()
    }

    /// Reasoning configuration for this agent, or the precise local error
    /// explaining why it cannot execute. Performs no I/O.
    pub fn reasoning(&self, agent_id: &str) -> Result<ReasoningConfig, BridgeError> {
        if !self
            .capabilities
            .iter()
            .any(|name| name == capability::REASONING)
        {
            return Err(BridgeError::ReasoningNotEnabled(agent_id.to_string()));
        }

        self.capability_model()
            .into_iter()
            .find_map(|cap| match cap {
                AgentCapability::Reasoning(config) => Some(config),
                _ => None,
            })
            .ok_or_else(|| BridgeError::ReasoningConfigMissing(agent_id.to_string()))
    }
}
