use serde::{Deserialize, Serialize};

/// Provider and model pair selecting which backend serves a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
}

impl LlmSettings {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Last-resort settings when no other source resolves. A local
    /// Ollama-class runtime with a small general model; embedders can
    /// override it through the executor rather than patching this value.
    pub fn fallback() -> Self {
        Self::new("ollama", "mistral-7b")
    }
}
