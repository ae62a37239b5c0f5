//! Realtime channel abstraction over the orchestrator's push transport.
//!
//! The platform relay hands this core already-deserialized `{type, ...}`
//! messages, so the channel is modeled as an injected trait rather than a
//! concrete socket: production wires in a connection-backed implementation
//! (reconnecting with [`crate::config::RECONNECT_BACKOFF`] on close), and
//! tests use the in-memory [`LocalChannel`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Typed message carried on the realtime channel in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl ChannelMessage {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            kind: kind.into(),
            payload,
        }
    }
}

/// Bidirectional push transport to the orchestrator.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Send one message toward the orchestrator.
    async fn send(&self, message: ChannelMessage) -> Result<()>;

    /// Subscribe to messages arriving from the orchestrator.
    fn inbound(&self) -> broadcast::Receiver<ChannelMessage>;

    fn is_connected(&self) -> bool;
}

const CHANNEL_BUFFER: usize = 64;

/// In-memory channel implementation. The paired [`RemoteEnd`] plays the
/// orchestrator side: it observes outbound traffic and injects inbound
/// messages.
pub struct LocalChannel {
    outbound: broadcast::Sender<ChannelMessage>,
    inbound: broadcast::Sender<ChannelMessage>,
    connected: Arc<AtomicBool>,
}

impl LocalChannel {
    pub fn pair() -> (Arc<Self>, RemoteEnd) {
        let (outbound, _) = broadcast::channel(CHANNEL_BUFFER);
        let (inbound, _) = broadcast::channel(CHANNEL_BUFFER);
        let connected = Arc::new(AtomicBool::new(true));

        let channel = Arc::new(Self {
            outbound: outbound.clone(),
            inbound: inbound.clone(),
            connected: Arc::clone(&connected),
        });
        let remote = RemoteEnd {
            outbound,
            inbound,
            connected,
        };
        (channel, remote)
    }
}

#[async_trait]
impl RealtimeChannel for LocalChannel {
    async fn send(&self, message: ChannelMessage) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            bail!("realtime channel is disconnected");
        }
        // Fire-and-forget: delivery with no listener on the far side is
        // not an error.
        let _ = self.outbound.send(message);
        Ok(())
    }

    fn inbound(&self) -> broadcast::Receiver<ChannelMessage> {
        self.inbound.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Orchestrator-side handle for a [`LocalChannel`] pair.
#[derive(Clone)]
pub struct RemoteEnd {
    outbound: broadcast::Sender<ChannelMessage>,
    inbound: broadcast::Sender<ChannelMessage>,
    connected: Arc<AtomicBool>,
}

impl RemoteEnd {
    /// Inject a message as if the orchestrator pushed it.
    pub fn push(&self, kind: &str, payload: Value) {
        let _ = self.inbound.send(ChannelMessage::new(kind, payload));
    }

    /// Observe messages the client side has sent.
    pub fn outbound(&self) -> broadcast::Receiver<ChannelMessage> {
        self.outbound.subscribe()
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn outbound_messages_reach_the_remote_end() {
        let (channel, remote) = LocalChannel::pair();
        let mut observed = remote.outbound();

        channel
            .send(ChannelMessage::new("trigger.execute", json!({"id": 3})))
            .await
            .unwrap();

        let message = observed.recv().await.unwrap();
        assert_eq!(message.kind, "trigger.execute");
        assert_eq!(message.payload["id"], 3);
    }

    #[tokio::test]
    async fn send_fails_after_disconnect() {
        let (channel, remote) = LocalChannel::pair();
        remote.disconnect();

        let result = channel
            .send(ChannelMessage::new("asset.get", json!({})))
            .await;
        assert!(result.is_err());
        assert!(!channel.is_connected());
    }

    #[test]
    fn wire_shape_uses_type_tag() {
        let message = ChannelMessage::new("asset.result", json!({"name": "panel"}));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "asset.result");
        assert_eq!(value["payload"]["name"], "panel");

        let parsed: ChannelMessage =
            serde_json::from_value(json!({"type": "asset.error", "payload": {}})).unwrap();
        assert_eq!(parsed.kind, "asset.error");
    }
}
