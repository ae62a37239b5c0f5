//! In-process publish/subscribe registry bridging inbound channel
//! messages into typed event callbacks.

use crate::transport::{ChannelMessage, RealtimeChannel};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Event kinds exchanged with the orchestrator, `<category>.<action>`.
pub struct EventKind;

impl EventKind {
    pub const GET_ASSET: &'static str = "asset.get";
    pub const ASSET_RESULT: &'static str = "asset.result";
    pub const ASSET_ERROR: &'static str = "asset.error";

    pub const GET_CHANGED_FILES: &'static str = "files.get_changed";
    pub const CHANGED_FILES_RESULT: &'static str = "files.changed_result";
    pub const CHANGED_FILES_ERROR: &'static str = "files.changed_error";

    pub const TRIGGER_EXECUTE: &'static str = "trigger.execute";
    pub const OPEN_FILE: &'static str = "editor.open_file";
}

type Handler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    handlers: HashMap<String, Vec<(u64, Handler)>>,
    next_id: u64,
    closed: bool,
}

impl Registry {
    fn remove(&mut self, event: &str, id: u64) {
        if let Some(entries) = self.handlers.get_mut(event) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                // No dangling empty sets.
                self.handlers.remove(event);
            }
        }
    }
}

/// Handle returned by [`EventManager::subscribe`]. Cancelling (or
/// dropping) removes exactly this handler; cancelling twice is a no-op.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    event: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    fn inert() -> Self {
        Self {
            registry: Weak::new(),
            event: String::new(),
            id: 0,
            active: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().unwrap().remove(&self.event, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Publish/subscribe registry for orchestrator events.
///
/// Handlers run synchronously in registration order. A handler error is
/// logged and never stops later handlers nor reaches the emitter.
pub struct EventManager {
    registry: Arc<Mutex<Registry>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            pump: Mutex::new(None),
        }
    }

    /// Start forwarding inbound channel messages into `emit`.
    pub fn attach(&self, channel: &Arc<dyn RealtimeChannel>) {
        let mut inbound = channel.inbound();
        let registry = Arc::clone(&self.registry);
        let handle = tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(ChannelMessage { kind, payload, .. }) => {
                        Self::dispatch(&registry, &kind, &payload);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event pump lagged behind the channel");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.pump.lock().unwrap() = Some(handle);
    }

    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap();
        if registry.closed {
            return Subscription::inert();
        }
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event: event.to_string(),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Invoke every handler registered for `event`, in registration
    /// order. No-op after `destroy`.
    pub fn emit(&self, event: &str, data: &Value) {
        Self::dispatch(&self.registry, event, data);
    }

    fn dispatch(registry: &Arc<Mutex<Registry>>, event: &str, data: &Value) {
        // Snapshot under the lock so handlers can subscribe or cancel
        // re-entrantly without deadlocking.
        let handlers: Vec<Handler> = {
            let registry = registry.lock().unwrap();
            if registry.closed {
                return;
            }
            registry
                .handlers
                .get(event)
                .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in handlers {
            if let Err(err) = handler(data) {
                tracing::warn!(event, error = %err, "event handler failed");
            }
        }
    }

    /// Number of live handlers for an event name.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registry
            .lock()
            .unwrap()
            .handlers
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Detach the channel pump and drop every subscription. Afterwards
    /// `emit` is a no-op and `subscribe` returns an inert handle.
    pub fn destroy(&self) {
        if let Some(handle) = self.pump.lock().unwrap().take() {
            handle.abort();
        }
        let mut registry = self.registry.lock().unwrap();
        registry.closed = true;
        registry.handlers.clear();
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter_handler(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn subscribe_then_cancel_leaves_no_handlers() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let subscription = events.subscribe("panel.open", counter_handler(&hits));
        subscription.cancel();
        events.emit("panel.open", &json!({}));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(events.subscriber_count("panel.open"), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let events = EventManager::new();
        let first = events.subscribe("panel.open", |_| Ok(()));
        let second = events.subscribe("panel.open", |_| Ok(()));

        first.cancel();
        first.cancel();
        assert_eq!(events.subscriber_count("panel.open"), 1);
        drop(second);
        assert_eq!(events.subscriber_count("panel.open"), 0);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let events = EventManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<_> = (0..3)
            .map(|index| {
                let order = Arc::clone(&order);
                events.subscribe("tick", move |_| {
                    order.lock().unwrap().push(index);
                    Ok(())
                })
            })
            .collect();

        events.emit("tick", &json!({}));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn failing_handler_does_not_stop_later_handlers() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = events.subscribe("tick", |_| anyhow::bail!("handler exploded"));
        let _good = events.subscribe("tick", counter_handler(&hits));

        events.emit("tick", &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_silences_emit_and_subscribe() {
        let events = EventManager::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let _kept = events.subscribe("tick", counter_handler(&hits));

        events.destroy();
        events.emit("tick", &json!({}));
        let late = events.subscribe("tick", counter_handler(&hits));
        events.emit("tick", &json!({}));
        late.cancel();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn attached_channel_messages_reach_subscribers() {
        use crate::transport::LocalChannel;

        let (channel, remote) = LocalChannel::pair();
        let events = EventManager::new();
        let channel: Arc<dyn RealtimeChannel> = channel;
        events.attach(&channel);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = events.subscribe(EventKind::ASSET_RESULT, move |payload| {
            sink.lock().unwrap().push(payload.clone());
            Ok(())
        });

        remote.push(EventKind::ASSET_RESULT, json!({"name": "panel"}));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["name"], "panel");
    }
}
