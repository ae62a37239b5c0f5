//! Mapping from abstract provider/model settings to concrete runtime
//! model identifiers.

use crate::errors::BridgeError;
use crate::models::LlmSettings;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Provider families this core knows how to route.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Meta,
    Mistral,
    Ollama,
}

impl ProviderKind {
    /// Names a configuration may use for this provider.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Meta => &["meta", "llama"],
            ProviderKind::Mistral => &["mistral"],
            ProviderKind::Ollama => &["ollama", "local"],
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let needle = value.trim().to_ascii_lowercase();
        Self::iter().find(|kind| kind.aliases().contains(&needle.as_str()))
    }
}

/// Friendly model names with a known runtime identifier.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("mistral-7b", "mistral:7b"),
    ("llama-3-8b", "llama3:8b"),
    ("llama-3-70b", "llama3:70b"),
];

/// Map settings to the runtime model identifier. Unrecognized model
/// tokens within a known provider fall back to a verbatim form rather
/// than failing; unknown providers fail without contacting any backend.
pub fn map_model(settings: &LlmSettings) -> Result<String, BridgeError> {
    let kind = ProviderKind::parse(&settings.provider)
        .ok_or_else(|| BridgeError::UnsupportedProvider(settings.provider.clone()))?;
    let model = settings.model.trim();

    let mapped = match kind {
        ProviderKind::Meta => match model.strip_prefix("llama-3-") {
            Some(size) => format!("llama3:{size}"),
            None => format!("llama3:{model}"),
        },
        ProviderKind::Mistral => match model.strip_prefix("mistral-") {
            Some(size) => format!("mistral:{size}"),
            None => format!("mistral:{model}"),
        },
        // Ollama-class settings name runtime models directly; known
        // friendly names are translated, anything else passes through.
        ProviderKind::Ollama => MODEL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == model)
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| model.to_string()),
    };
    Ok(mapped)
}
