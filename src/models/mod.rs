pub mod agent;
pub mod message;
pub mod settings;

pub use agent::{AgentCapability, AgentRecord, ReasoningConfig};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role};
pub use settings::LlmSettings;
