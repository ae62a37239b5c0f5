//! Extended bridge: asset loading with transport fallback, status
//! polling, trigger fan-out, and the shared-instance lifecycle.

use super::{Bridge, Panel};
use crate::config::BridgeConfig;
use crate::errors::{BridgeError, BridgeResult};
use crate::events::{EventKind, Subscription};
use crate::transport::{ConnectionStatus, OrchestratorHttp, RealtimeChannel};
use anyhow::Result;
use lazy_static::lazy_static;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// How a two-phase load resolved. The HTTP path runs to completion
/// before the realtime-channel race begins; within the race the first of
/// {matching result, matching error, timeout} wins and the losers are
/// deactivated in the same tick.
#[derive(Debug)]
pub enum RaceOutcome {
    WonByHttp(Value),
    WonByChannelSuccess(Value),
    WonByChannelError(String),
    WonByTimeout,
}

/// Everything an ExtendedBridge needs, assembled at the composition
/// root. Sharing one instance per process is an explicit choice made
/// through [`shared_bridge`], not implicit global state inside the type.
pub struct BridgeContext {
    pub channel: Arc<dyn RealtimeChannel>,
    pub config: BridgeConfig,
}

impl BridgeContext {
    pub fn new(channel: Arc<dyn RealtimeChannel>, config: BridgeConfig) -> Self {
        Self { channel, config }
    }
}

pub struct ExtendedBridge {
    inner: Bridge,
    http: OrchestratorHttp,
}

impl ExtendedBridge {
    pub fn new(context: BridgeContext) -> Result<Self> {
        let BridgeContext { channel, config } = context;
        let http = OrchestratorHttp::new(config.orchestrator_host.clone())?;
        let inner = Bridge::new(channel, config)?;
        Ok(Self { inner, http })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.inner
    }

    pub fn send_message(&self, kind: &str, payload: Value) {
        self.inner.send_message(kind, payload);
    }

    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.subscribe(event, handler)
    }

    pub async fn request_ai(&self, prompt: &str, context: Option<&str>) -> BridgeResult<String> {
        self.inner.request_ai(prompt, context).await
    }

    pub fn open_file(&self, path: &str, line: Option<u32>) {
        self.inner.open_file(path, line);
    }

    pub fn panel(&self) -> Panel {
        self.inner.panel()
    }

    /// Inject a synthetic event; subscribers cannot tell it apart from a
    /// transport-originated one.
    pub fn emit(&self, event: &str, data: &Value) {
        self.inner.events().emit(event, data);
    }

    /// Live handler count for an event name. Diagnostic surface used to
    /// verify subscription cleanup.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner.events().subscriber_count(event)
    }

    /// Load a named template: request/response transport first, realtime
    /// channel as fallback.
    pub async fn load_template(&self, name: &str) -> BridgeResult<String> {
        let outcome = match self.http.fetch_template(name).await {
            Ok(content) => RaceOutcome::WonByHttp(Value::String(content)),
            Err(err) => {
                tracing::debug!(template = name, error = %err, "http template fetch failed, falling back to realtime channel");
                self.channel_race(
                    EventKind::GET_ASSET,
                    json!({ "name": name }),
                    EventKind::ASSET_RESULT,
                    EventKind::ASSET_ERROR,
                    ("name", name),
                    self.inner.config().asset_timeout,
                )
                .await
            }
        };

        match outcome {
            RaceOutcome::WonByHttp(value) => value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| BridgeError::AssetLoad(format!("template '{name}' payload is not text"))),
            RaceOutcome::WonByChannelSuccess(payload) => payload
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    BridgeError::AssetLoad(format!("template '{name}' result carried no content"))
                }),
            RaceOutcome::WonByChannelError(message) => Err(BridgeError::AssetLoad(message)),
            RaceOutcome::WonByTimeout => Err(BridgeError::AssetLoadTimeout(name.to_string())),
        }
    }

    /// Files changed in the connected editor. Best effort: every failure
    /// mode degrades to an empty list.
    pub async fn cursor_changed_files(&self) -> Vec<String> {
        let outcome = match self.http.changed_files().await {
            Ok(files) => RaceOutcome::WonByHttp(json!(files)),
            Err(err) => {
                tracing::debug!(error = %err, "http changed-files query failed, falling back to realtime channel");
                let request_id = Uuid::new_v4().to_string();
                self.channel_race(
                    EventKind::GET_CHANGED_FILES,
                    json!({ "requestId": request_id }),
                    EventKind::CHANGED_FILES_RESULT,
                    EventKind::CHANGED_FILES_ERROR,
                    ("requestId", &request_id),
                    self.inner.config().changed_files_timeout,
                )
                .await
            }
        };

        match outcome {
            RaceOutcome::WonByHttp(value) => string_list(&value),
            RaceOutcome::WonByChannelSuccess(payload) => payload
                .get("files")
                .map(string_list)
                .unwrap_or_default(),
            RaceOutcome::WonByChannelError(message) => {
                tracing::warn!(error = %message, "changed-files query failed on both transports");
                Vec::new()
            }
            RaceOutcome::WonByTimeout => Vec::new(),
        }
    }

    /// Connection status of the orchestrator transport. Unknown is
    /// reported as down, never as an error.
    pub async fn connection_status(&self) -> ConnectionStatus {
        match self.http.status().await {
            Ok(status) => status,
            Err(err) => {
                tracing::debug!(error = %err, "status query failed, reporting disconnected");
                ConnectionStatus::default()
            }
        }
    }

    /// Fire-and-forget agent trigger fan-out.
    pub fn send_trigger(&self, id: &str, context: Value) {
        self.send_message(
            EventKind::TRIGGER_EXECUTE,
            json!({ "id": id, "context": context }),
        );
    }

    /// Poll the status endpoint with a recurring timer until the
    /// orchestrator answers or the attempts run out.
    pub async fn wait_for_orchestrator(&self, attempts: u32, interval: Duration) -> bool {
        let mut ticker = tokio::time::interval(interval);
        for _ in 0..attempts {
            ticker.tick().await;
            if self.connection_status().await.is_connected {
                return true;
            }
        }
        false
    }

    pub fn destroy(&self) {
        self.inner.events().destroy();
    }

    /// Realtime-channel phase of a two-phase load: register one-shot
    /// subscriptions for the result and error events filtered by a
    /// correlation field, send the command, and race them against the
    /// timeout. Exactly one outcome is produced per call.
    async fn channel_race(
        &self,
        command: &str,
        command_payload: Value,
        result_event: &str,
        error_event: &str,
        correlate: (&str, &str),
        timeout: Duration,
    ) -> RaceOutcome {
        let (field, value) = correlate;

        // Both handlers race for one take-once sender, so whichever
        // matching event is dispatched first decides the outcome even
        // when the other is already queued behind it.
        let (winner_tx, winner_rx) = oneshot::channel::<RaceOutcome>();
        let slot = Arc::new(Mutex::new(Some(winner_tx)));

        let wanted = value.to_string();
        let key = field.to_string();
        let success_slot = Arc::clone(&slot);
        let result_sub = self.inner.events().subscribe(result_event, move |payload| {
            if payload.get(&key).and_then(Value::as_str) != Some(wanted.as_str()) {
                return Ok(());
            }
            if let Some(tx) = success_slot.lock().unwrap().take() {
                let _ = tx.send(RaceOutcome::WonByChannelSuccess(payload.clone()));
            }
            Ok(())
        });

        let wanted = value.to_string();
        let key = field.to_string();
        let error_slot = Arc::clone(&slot);
        let error_sub = self.inner.events().subscribe(error_event, move |payload| {
            if payload.get(&key).and_then(Value::as_str) != Some(wanted.as_str()) {
                return Ok(());
            }
            if let Some(tx) = error_slot.lock().unwrap().take() {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("orchestrator reported an asset error")
                    .to_string();
                let _ = tx.send(RaceOutcome::WonByChannelError(message));
            }
            Ok(())
        });

        self.inner.send_message(command, command_payload);

        let outcome = tokio::select! {
            won = winner_rx => won.unwrap_or(RaceOutcome::WonByTimeout),
            _ = tokio::time::sleep(timeout) => RaceOutcome::WonByTimeout,
        };

        // Deactivate the losers before returning so a late event cannot
        // fire a stale handler or leak a subscription.
        result_sub.cancel();
        error_sub.cancel();
        outcome
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

lazy_static! {
    static ref SHARED_BRIDGE: Mutex<Option<Arc<ExtendedBridge>>> = Mutex::new(None);
}

/// Process-wide bridge instance. The first caller's context wins;
/// subsequent callers receive the same instance until a reset.
pub fn shared_bridge(context: BridgeContext) -> Result<Arc<ExtendedBridge>> {
    let mut slot = SHARED_BRIDGE.lock().unwrap();
    if let Some(bridge) = slot.as_ref() {
        return Ok(Arc::clone(bridge));
    }
    let bridge = Arc::new(ExtendedBridge::new(context)?);
    *slot = Some(Arc::clone(&bridge));
    Ok(bridge)
}

/// Destroy the shared instance and clear the slot. References held
/// across a reset point at a destroyed bridge and must not be reused.
pub fn reset_shared_bridge() {
    let mut slot = SHARED_BRIDGE.lock().unwrap();
    if let Some(bridge) = slot.take() {
        bridge.destroy();
    }
}
