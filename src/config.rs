//! Fixed endpoints and timing constants for talking to the orchestrator.

use std::time::Duration;

/// Request/response transport of the local orchestrator.
pub const DEFAULT_ORCHESTRATOR_HOST: &str = "http://localhost:7317";

/// Model used for interactive `request_ai` round trips.
pub const DEFAULT_CHAT_MODEL: &str = "mistral:7b";

/// Overall bound for plain request/response calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Realtime-channel fallback window for template loads.
pub const ASSET_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Realtime-channel fallback window for changed-file queries.
pub const CHANGED_FILES_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort probes (connection status, runtime readiness).
pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Interactive chat completion bound.
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Agent-triggered chat completion bound.
pub const AGENT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay before a long-lived channel listener reconnects after a close.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Settings for one bridge instance. Timeouts default to the constants
/// above but stay overridable so embedders and tests are not pinned to
/// wall-clock waits.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub orchestrator_host: String,
    pub chat_model: String,
    pub asset_timeout: Duration,
    pub changed_files_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            orchestrator_host: DEFAULT_ORCHESTRATOR_HOST.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            asset_timeout: ASSET_LOAD_TIMEOUT,
            changed_files_timeout: CHANGED_FILES_TIMEOUT,
        }
    }
}

impl BridgeConfig {
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            orchestrator_host: host.into(),
            ..Self::default()
        }
    }
}
