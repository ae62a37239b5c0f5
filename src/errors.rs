use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by the bridge and the agent executor.
///
/// Every public entry point converts internal errors into one of these
/// variants (or into a tagged result value) so callers can map each kind
/// to actionable recovery guidance.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum BridgeError {
    #[error("orchestrator is not reachable; start the desktop app and try again")]
    TransportUnreachable,

    #[error("request timed out: {0}")]
    RequestTimeout(String),

    #[error("timed out loading template '{0}'")]
    AssetLoadTimeout(String),

    #[error("asset load failed: {0}")]
    AssetLoad(String),

    #[error("chat completion failed: {0}")]
    ChatCompletion(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("reasoning is not enabled for agent {0}")]
    ReasoningNotEnabled(String),

    #[error("agent {0} has no reasoning configuration")]
    ReasoningConfigMissing(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("inference runtime is not ready; start the local model runtime")]
    RuntimeNotReady,
}

pub type BridgeResult<T> = Result<T, BridgeError>;
