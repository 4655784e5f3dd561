// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! WebSocket bridge to a V8 inspector.
//!
//! One bridge owns one socket. Writes are serialized through a single
//! writer task; the reader task dispatches responses to their pending
//! request and events to subscribers. Every pending request is resolved,
//! rejected, or timed out — never orphaned: a deadline miss purges the
//! request id, and `close()` rejects everything in flight with `CANCELED`.

use crate::domain::cdp::{
    BridgeState, CdpError, CdpEvent, CdpIncoming, CdpRemoteError, CdpRequest,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Connection and per-request timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct CdpBridgeConfig {
    /// Deadline for each in-flight request, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CdpBridgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: crate::domain::options::DEFAULT_CDP_BRIDGE_TIMEOUT_MS,
        }
    }
}

/// Token returned by [`CdpBridge::on`], used to unsubscribe.
pub type SubscriptionId = u64;

type EventHandler = Arc<dyn Fn(&CdpEvent) + Send + Sync>;
type PendingMap = HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>;

struct BridgeShared {
    state: Mutex<BridgeState>,
    next_message_id: AtomicU64,
    next_subscription_id: AtomicU64,
    pending: Mutex<PendingMap>,
    listeners: Mutex<HashMap<String, Vec<(SubscriptionId, EventHandler)>>>,
}

impl BridgeShared {
    fn transition(&self, next: BridgeState) -> bool {
        let mut state = self.state.lock().expect("bridge state poisoned");
        if state.can_transition_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }

    fn reject_all_pending(&self, make_error: impl Fn() -> CdpError) {
        let senders: Vec<_> = {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.drain().map(|(_, tx)| tx).collect()
        };
        for tx in senders {
            let _ = tx.send(Err(make_error()));
        }
    }

    fn dispatch_event(&self, event: &CdpEvent) {
        let handlers: Vec<EventHandler> = {
            let listeners = self.listeners.lock().expect("listener map poisoned");
            listeners
                .get(&event.method)
                .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(event);
        }
    }
}

/// Bridge to one inspector WebSocket endpoint.
pub struct CdpBridge {
    shared: Arc<BridgeShared>,
    writer_tx: mpsc::UnboundedSender<Message>,
    reader_task: tokio::task::JoinHandle<()>,
    writer_task: tokio::task::JoinHandle<()>,
    config: CdpBridgeConfig,
}

impl std::fmt::Debug for CdpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpBridge")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CdpBridge {
    /// Connect to an inspector WebSocket URL.
    ///
    /// # Errors
    ///
    /// [`CdpError::Transport`] when the socket cannot be established.
    pub async fn connect(ws_url: &str, config: CdpBridgeConfig) -> Result<Self, CdpError> {
        let shared = Arc::new(BridgeShared {
            state: Mutex::new(BridgeState::Idle),
            next_message_id: AtomicU64::new(1),
            next_subscription_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
        });
        shared.transition(BridgeState::Connecting);

        let (stream, _) = connect_async(ws_url).await.map_err(|e| {
            shared.transition(BridgeState::Closed);
            CdpError::Transport(e.to_string())
        })?;
        let (mut sink, mut source) = stream.split();

        // Single writer task serializes every outbound frame.
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<Message>();
        let writer_task = tokio::spawn(async move {
            while let Some(message) = writer_rx.recv().await {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_shared = Arc::clone(&shared);
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        Self::handle_frame(&reader_shared, text.as_ref());
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            // Remote hang-up: everything in flight is canceled.
            reader_shared.transition(BridgeState::Closed);
            reader_shared.reject_all_pending(|| CdpError::Canceled);
        });

        shared.transition(BridgeState::Open);
        Ok(Self {
            shared,
            writer_tx,
            reader_task,
            writer_task,
            config,
        })
    }

    fn handle_frame(shared: &Arc<BridgeShared>, text: &str) {
        let Ok(incoming) = serde_json::from_str::<CdpIncoming>(text) else {
            tracing::debug!("discarding unparseable CDP frame: {text}");
            return;
        };
        match incoming {
            CdpIncoming::Response(response) => {
                let sender = shared
                    .pending
                    .lock()
                    .expect("pending map poisoned")
                    .remove(&response.id);
                if let Some(tx) = sender {
                    let outcome = match response.error {
                        Some(error) => Err(CdpError::Remote(CdpRemoteError {
                            code: error.code,
                            message: error.message,
                        })),
                        None => Ok(response.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(outcome);
                }
            }
            CdpIncoming::Event(event) => shared.dispatch_event(&event),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        *self.shared.state.lock().expect("bridge state poisoned")
    }

    /// Send a command to the browser endpoint.
    ///
    /// # Errors
    ///
    /// [`CdpError::Timeout`] when the deadline elapses (that request only;
    /// the bridge stays open), [`CdpError::Canceled`] when the bridge
    /// closes mid-flight, [`CdpError::Remote`] when the inspector rejects
    /// the command.
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.send_to_session(method, params, None).await
    }

    /// Send a command routed to a flattened target session.
    ///
    /// # Errors
    ///
    /// Same as [`CdpBridge::send`].
    pub async fn send_to_session(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<String>,
    ) -> Result<Value, CdpError> {
        let state = self.state();
        if state != BridgeState::Open {
            return Err(CdpError::InvalidState(state));
        }

        let id = self.shared.next_message_id.fetch_add(1, Ordering::SeqCst);
        let frame = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id,
        };
        let text =
            serde_json::to_string(&frame).map_err(|e| CdpError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .expect("pending map poisoned")
            .insert(id, tx);

        if self.writer_tx.send(Message::Text(text.into())).is_err() {
            self.shared
                .pending
                .lock()
                .expect("pending map poisoned")
                .remove(&id);
            return Err(CdpError::Canceled);
        }

        let deadline = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CdpError::Canceled),
            Err(_) => {
                // Deadline missed: purge the id so a late response is dropped.
                self.shared
                    .pending
                    .lock()
                    .expect("pending map poisoned")
                    .remove(&id);
                Err(CdpError::Timeout {
                    method: method.to_string(),
                    timeout_ms: self.config.timeout_ms,
                })
            }
        }
    }

    /// Subscribe to an unsolicited event by method name.
    #[must_use]
    pub fn on(
        &self,
        event: &str,
        handler: impl Fn(&CdpEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self
            .shared
            .next_subscription_id
            .fetch_add(1, Ordering::SeqCst);
        self.shared
            .listeners
            .lock()
            .expect("listener map poisoned")
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription previously added with [`CdpBridge::on`].
    pub fn off(&self, event: &str, subscription: SubscriptionId) {
        let mut listeners = self.shared.listeners.lock().expect("listener map poisoned");
        if let Some(entries) = listeners.get_mut(event) {
            entries.retain(|(id, _)| *id != subscription);
            if entries.is_empty() {
                listeners.remove(event);
            }
        }
    }

    /// Close the bridge: reject all pending requests with `CANCELED`, then
    /// tear down the socket. Terminal; a new bridge is required to
    /// reconnect.
    pub async fn close(&self) {
        if !self.shared.transition(BridgeState::Closing) {
            return;
        }
        self.shared.reject_all_pending(|| CdpError::Canceled);
        let _ = self.writer_tx.send(Message::Close(None));
        self.shared.transition(BridgeState::Closed);
    }
}

impl Drop for CdpBridge {
    fn drop(&mut self) {
        self.shared.transition(BridgeState::Closing);
        self.shared.transition(BridgeState::Closed);
        self.shared.reject_all_pending(|| CdpError::Canceled);
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Minimal scripted inspector: answers every request via `respond`,
    /// optionally emitting extra frames first.
    async fn spawn_mock_inspector(
        respond: impl Fn(Value) -> Vec<String> + Send + 'static,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (mut sink, mut source) = ws.split();
                while let Some(Ok(Message::Text(text))) = source.next().await {
                    let request: Value = serde_json::from_str(&text).unwrap();
                    for frame in respond(request) {
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        format!("ws://{addr}")
    }

    fn echo_ok(request: Value) -> Vec<String> {
        vec![json!({"id": request["id"], "result": {"echo": request["method"]}}).to_string()]
    }

    #[tokio::test]
    async fn test_send_resolves_matching_response() {
        let url = spawn_mock_inspector(echo_ok).await;
        let bridge = CdpBridge::connect(&url, CdpBridgeConfig::default())
            .await
            .unwrap();
        assert_eq!(bridge.state(), BridgeState::Open);

        let result = bridge.send("Runtime.enable", None).await.unwrap();
        assert_eq!(result["echo"], "Runtime.enable");
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_unique() {
        let url = spawn_mock_inspector(echo_ok).await;
        let bridge = CdpBridge::connect(&url, CdpBridgeConfig::default())
            .await
            .unwrap();

        for _ in 0..3 {
            bridge.send("Runtime.evaluate", None).await.unwrap();
        }
        // Three sends consumed ids 1..=3.
        assert_eq!(bridge.shared.next_message_id.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_remote_error_rejects_request() {
        let url = spawn_mock_inspector(|request| {
            vec![
                json!({"id": request["id"], "error": {"code": -32601, "message": "unknown"}})
                    .to_string(),
            ]
        })
        .await;
        let bridge = CdpBridge::connect(&url, CdpBridgeConfig::default())
            .await
            .unwrap();

        let err = bridge.send("Nope.nope", None).await.unwrap_err();
        match err {
            CdpError::Remote(remote) => assert_eq!(remote.code, -32601),
            other => panic!("expected Remote, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_in_flight_timeout_rejects_only_that_request() {
        // Server never answers.
        let url = spawn_mock_inspector(|_| vec![]).await;
        let bridge = CdpBridge::connect(&url, CdpBridgeConfig { timeout_ms: 50 })
            .await
            .unwrap();

        let err = bridge.send("Runtime.evaluate", None).await.unwrap_err();
        assert!(matches!(err, CdpError::Timeout { .. }));
        // Bridge stays open and the pending map is purged.
        assert_eq!(bridge.state(), BridgeState::Open);
        assert!(bridge.shared.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_cancels_pending_and_is_terminal() {
        let url = spawn_mock_inspector(|_| vec![]).await;
        let bridge = Arc::new(
            CdpBridge::connect(&url, CdpBridgeConfig { timeout_ms: 5_000 })
                .await
                .unwrap(),
        );

        let sender = Arc::clone(&bridge);
        let in_flight =
            tokio::spawn(async move { sender.send("Runtime.evaluate", None).await });
        // Let the request get registered before closing.
        tokio::time::sleep(Duration::from_millis(20)).await;

        bridge.close().await;
        assert_eq!(bridge.state(), BridgeState::Closed);

        let outcome = in_flight.await.unwrap();
        assert!(matches!(outcome, Err(CdpError::Canceled)));

        // Sends after close are refused.
        let err = bridge.send("Runtime.enable", None).await.unwrap_err();
        assert!(matches!(err, CdpError::InvalidState(BridgeState::Closed)));
    }

    #[tokio::test]
    async fn test_event_dispatch_and_unsubscribe() {
        let url = spawn_mock_inspector(|request| {
            vec![
                json!({
                    "method": "Runtime.consoleAPICalled",
                    "params": {"type": "log", "args": [{"value": "hi"}]}
                })
                .to_string(),
                json!({"id": request["id"], "result": {}}).to_string(),
            ]
        })
        .await;
        let bridge = CdpBridge::connect(&url, CdpBridgeConfig::default())
            .await
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = bridge.on("Runtime.consoleAPICalled", move |event| {
            sink.lock().unwrap().push(event.params["type"].clone());
        });

        bridge.send("Runtime.enable", None).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!("log")]);

        bridge.off("Runtime.consoleAPICalled", subscription);
        bridge.send("Runtime.enable", None).await.unwrap();
        // No further dispatch after off().
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_session_id_round_trip() {
        let url = spawn_mock_inspector(|request| {
            vec![json!({
                "id": request["id"],
                "sessionId": request["sessionId"],
                "result": {"sawSession": request["sessionId"]}
            })
            .to_string()]
        })
        .await;
        let bridge = CdpBridge::connect(&url, CdpBridgeConfig::default())
            .await
            .unwrap();

        let result = bridge
            .send_to_session("Runtime.enable", None, Some("SESSION-1".to_string()))
            .await
            .unwrap();
        assert_eq!(result["sawSession"], "SESSION-1");
    }

    #[tokio::test]
    async fn test_connect_failure_is_transport_error() {
        let err = CdpBridge::connect("ws://127.0.0.1:1", CdpBridgeConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CdpError::Transport(_)));
    }
}
