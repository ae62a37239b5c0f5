//! LLM settings resolution.

use crate::models::{LlmSettings, ReasoningConfig};
use crate::store::ConfigStore;

/// Store key holding the process-wide default settings record.
pub const DEFAULT_SETTINGS_KEY: &str = "settings.llm_default";

/// Resolve which provider/model applies, highest precedence first:
/// per-call override, settings embedded in the reasoning block, the
/// process-wide default from the store, then the hard fallback. Lookup
/// failures are treated as "absent"; resolution itself cannot fail.
pub async fn resolve_settings(
    overrides: Option<&LlmSettings>,
    reasoning: &ReasoningConfig,
    store: &dyn ConfigStore,
    fallback: &LlmSettings,
) -> LlmSettings {
    if let Some(settings) = overrides {
        return settings.clone();
    }

    if let (Some(provider), Some(model)) = (&reasoning.llm_provider, &reasoning.llm_model) {
        return LlmSettings::new(provider.clone(), model.clone());
    }

    match store.get(DEFAULT_SETTINGS_KEY).await {
        Ok(Some(raw)) => match serde_json::from_str::<LlmSettings>(&raw) {
            Ok(settings) => return settings,
            Err(err) => {
                tracing::warn!(error = %err, "stored default settings are malformed, ignoring");
            }
        },
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(error = %err, "settings store lookup failed, using fallback");
        }
    }

    fallback.clone()
}
