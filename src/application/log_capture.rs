// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Console log capture from every process of the app under test.
//!
//! Electron sessions subscribe to `Runtime.consoleAPICalled` on the main
//! CDP bridge (main process) and on flattened per-target sessions
//! (renderers). Tauri sessions tail the driver/app stdout, where both
//! backend log lines and frontend console calls (forwarded by the plugin
//! shim) surface. Everything funnels into one [`LogSink`], filtered per
//! source by minimum level.

use crate::domain::cdp::CdpError;
use crate::domain::logs::{LogEvent, LogLevel, LogSource, parse_backend_line};
use crate::domain::options::Framework;
use crate::infrastructure::cdp::{CdpBridge, SubscriptionId};
use crate::infrastructure::logging::LogSink;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Render a CDP `Runtime.consoleAPICalled` payload into `(level, message)`.
#[must_use]
pub fn format_console_event(params: &Value) -> (LogLevel, String) {
    let level = LogLevel::from_console_type(
        params.get("type").and_then(Value::as_str).unwrap_or("log"),
    );
    let message = params
        .get("args")
        .and_then(Value::as_array)
        .map(|args| {
            args.iter()
                .map(format_remote_object)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    (level, message)
}

/// Render one CDP `RemoteObject` the way the console would.
fn format_remote_object(object: &Value) -> String {
    if let Some(value) = object.get("value") {
        match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    } else if let Some(description) = object.get("description").and_then(Value::as_str) {
        description.to_string()
    } else {
        object
            .get("type")
            .and_then(Value::as_str)
            .map(|t| format!("[{t}]"))
            .unwrap_or_default()
    }
}

/// Whether a stdout line came from the forwarded frontend console rather
/// than the backend log framework. The plugin shim routes frontend calls
/// through the log plugin, which stamps them with a `webview` target.
#[must_use]
pub fn line_is_frontend(line: &str) -> bool {
    if let Some(rest) = line.trim().strip_prefix('[')
        && let Some(close) = rest.find(']')
    {
        return rest[..close]
            .split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("webview"));
    }
    false
}

/// Per-instance log capture. Created in `before`, detached in `after`.
pub struct LogCapture {
    framework: Framework,
    instance: Option<String>,
    sink: Arc<dyn LogSink>,
    bridge: Mutex<Option<Arc<CdpBridge>>>,
    subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl LogCapture {
    /// Capture pipeline for one instance.
    #[must_use]
    pub fn new(framework: Framework, instance: Option<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            framework,
            instance,
            sink,
            bridge: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn forward(
        sink: &Arc<dyn LogSink>,
        framework: Framework,
        instance: Option<&String>,
        minimum: LogLevel,
        level: LogLevel,
        source: LogSource,
        message: String,
    ) {
        if level < minimum {
            return;
        }
        let event = LogEvent {
            level,
            message,
            source,
            instance: instance.cloned(),
        };
        let line = format!("{} {}", event.prefix(framework.label()), event.message);
        sink.emit(level, &line);
    }

    /// Attach to an Electron session's CDP bridge.
    ///
    /// `main_minimum` / `renderer_minimum` of `None` disable that source.
    ///
    /// # Errors
    ///
    /// Propagates CDP failures from domain enabling; attach errors for
    /// individual targets are logged at debug and skipped.
    pub async fn attach_electron(
        &self,
        bridge: Arc<CdpBridge>,
        main_minimum: Option<LogLevel>,
        renderer_minimum: Option<LogLevel>,
    ) -> Result<(), CdpError> {
        if main_minimum.is_none() && renderer_minimum.is_none() {
            return Ok(());
        }

        *self.bridge.lock().expect("capture state poisoned") = Some(Arc::clone(&bridge));

        // One consoleAPICalled subscription serves both sources: frames
        // with a sessionId belong to an attached renderer target.
        let sink = Arc::clone(&self.sink);
        let framework = self.framework;
        let instance = self.instance.clone();
        let subscription = bridge.on("Runtime.consoleAPICalled", move |event| {
            let (level, message) = format_console_event(&event.params);
            let (source, minimum) = if event.session_id.is_some() {
                (LogSource::Renderer, renderer_minimum)
            } else {
                (LogSource::MainProcess, main_minimum)
            };
            if let Some(minimum) = minimum {
                Self::forward(
                    &sink,
                    framework,
                    instance.as_ref(),
                    minimum,
                    level,
                    source,
                    message,
                );
            }
        });
        self.subscriptions
            .lock()
            .expect("capture state poisoned")
            .push(("Runtime.consoleAPICalled".to_string(), subscription));

        if main_minimum.is_some() {
            bridge.send("Runtime.enable", None).await?;
        }

        if renderer_minimum.is_some() {
            self.attach_renderer_targets(&bridge).await?;
        }
        Ok(())
    }

    /// Discover page targets and open a flattened session on each, now and
    /// as they are created.
    async fn attach_renderer_targets(&self, bridge: &Arc<CdpBridge>) -> Result<(), CdpError> {
        let (target_tx, mut target_rx) = tokio::sync::mpsc::unbounded_channel::<String>();

        let creation_tx = target_tx.clone();
        let subscription = bridge.on("Target.targetCreated", move |event| {
            let info = &event.params["targetInfo"];
            if info["type"] == "page"
                && let Some(target_id) = info["targetId"].as_str()
            {
                let _ = creation_tx.send(target_id.to_string());
            }
        });
        self.subscriptions
            .lock()
            .expect("capture state poisoned")
            .push(("Target.targetCreated".to_string(), subscription));

        // Attachment needs awaits, which an event handler cannot do; a
        // task drains the channel instead.
        let attach_bridge = Arc::clone(bridge);
        let task = tokio::spawn(async move {
            while let Some(target_id) = target_rx.recv().await {
                let attached = attach_bridge
                    .send(
                        "Target.attachToTarget",
                        Some(json!({"targetId": target_id, "flatten": true})),
                    )
                    .await;
                match attached {
                    Ok(result) => {
                        if let Some(session_id) = result["sessionId"].as_str() {
                            let enabled = attach_bridge
                                .send_to_session(
                                    "Runtime.enable",
                                    None,
                                    Some(session_id.to_string()),
                                )
                                .await;
                            if let Err(e) = enabled {
                                tracing::debug!("renderer Runtime.enable failed: {e}");
                            }
                        }
                    }
                    Err(e) => tracing::debug!("renderer target attach failed: {e}"),
                }
            }
        });
        self.tasks.lock().expect("capture state poisoned").push(task);

        bridge
            .send("Target.setDiscoverTargets", Some(json!({"discover": true})))
            .await?;

        // Existing targets do not re-announce; list them explicitly.
        if let Ok(listing) = bridge.send("Target.getTargets", None).await
            && let Some(infos) = listing["targetInfos"].as_array()
        {
            for info in infos {
                if info["type"] == "page"
                    && let Some(target_id) = info["targetId"].as_str()
                {
                    let _ = target_tx.send(target_id.to_string());
                }
            }
        }
        Ok(())
    }

    /// Attach to a Tauri session's stdout stream.
    ///
    /// `backend_minimum` / `frontend_minimum` of `None` disable that
    /// source.
    pub fn attach_tauri(
        &self,
        mut lines: broadcast::Receiver<String>,
        backend_minimum: Option<LogLevel>,
        frontend_minimum: Option<LogLevel>,
    ) {
        if backend_minimum.is_none() && frontend_minimum.is_none() {
            return;
        }

        let sink = Arc::clone(&self.sink);
        let framework = self.framework;
        let instance = self.instance.clone();
        let task = tokio::spawn(async move {
            loop {
                match lines.recv().await {
                    Ok(line) => {
                        let (level, message) = parse_backend_line(&line);
                        let (source, minimum) = if line_is_frontend(&line) {
                            (LogSource::Frontend, frontend_minimum)
                        } else {
                            (LogSource::Backend, backend_minimum)
                        };
                        if let Some(minimum) = minimum {
                            Self::forward(
                                &sink,
                                framework,
                                instance.as_ref(),
                                minimum,
                                level,
                                source,
                                message,
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        self.tasks.lock().expect("capture state poisoned").push(task);
    }

    /// Detach every listener and session. Best-effort; detach errors are
    /// ignored by design.
    pub fn detach(&self) {
        let bridge = self.bridge.lock().expect("capture state poisoned").take();
        let subscriptions: Vec<_> = self
            .subscriptions
            .lock()
            .expect("capture state poisoned")
            .drain(..)
            .collect();
        if let Some(bridge) = bridge {
            for (event, subscription) in subscriptions {
                bridge.off(&event, subscription);
            }
        }
        for task in self.tasks.lock().expect("capture state poisoned").drain(..) {
            task.abort();
        }
    }
}
