pub mod channel;
pub mod http;

pub use channel::{ChannelMessage, LocalChannel, RealtimeChannel, RemoteEnd};
pub use http::{ConnectionStatus, OrchestratorHttp};
