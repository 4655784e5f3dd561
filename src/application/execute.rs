// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Execute user code inside the target process.
//!
//! The script is an opaque JavaScript function source; the host never
//! introspects it. Electron sessions evaluate it in the main process over
//! the CDP bridge (first injected argument: the `electron` module). Tauri
//! sessions forward it to the in-app plugin through the frontend shim
//! (first injected argument: the Tauri APIs object).

use crate::domain::cdp::CdpError;
use crate::domain::errors::ExecuteError;
use crate::domain::session_port::DriverSession;
use crate::infrastructure::cdp::CdpBridge;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Wrap a user function source for CDP `Runtime.evaluate` in the Electron
/// main process.
///
/// The wrapper resolves the function, injects the `electron` module as the
/// first argument, awaits any returned promise, and serializes the result
/// so it survives the protocol boundary.
#[must_use]
pub fn electron_main_wrapper(script: &str, args: &[Value]) -> String {
    let args_json = serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string());
    format!(
        "(async () => {{\n\
         const electron = require('electron');\n\
         const fn = ({script});\n\
         const result = await fn(electron, ...{args_json});\n\
         return JSON.stringify(result === undefined ? null : result);\n\
         }})()"
    )
}

/// WebDriver async-script body that forwards a script to the Tauri shim.
///
/// `arguments[0]` is the user script source, `arguments[1]` the user args,
/// and the trailing argument is the WebDriver completion callback. The
/// shim's promise outcome is funneled back as `{ok}` / `{err}` so a thrown
/// value is distinguishable from a returned one.
#[must_use]
pub fn tauri_shim_forwarder() -> String {
    "const script = arguments[0];\n\
     const args = arguments[1];\n\
     const done = arguments[arguments.length - 1];\n\
     if (!window.wdioTauri) { done({ unavailable: true }); return; }\n\
     window.wdioTauri.execute(script, args).then(\n\
       (result) => done({ ok: result === undefined ? null : result }),\n\
       (error) => done({ err: String(error) })\n\
     );"
        .to_string()
}

/// WebDriver async-script body awaiting the shim's `waitForInit` promise.
#[must_use]
pub fn tauri_wait_for_init_script() -> String {
    "const done = arguments[arguments.length - 1];\n\
     if (!window.wdioTauri) { done({ unavailable: true }); return; }\n\
     window.wdioTauri.waitForInit.then(() => done({ ok: true }));"
        .to_string()
}

enum Target {
    /// Main-process evaluation over CDP. `None` when the bridge never
    /// connected; main-process execution is then disabled but the session
    /// continues.
    ElectronMain(Option<Arc<CdpBridge>>),
    /// Frontend shim forwarding to the in-app plugin.
    TauriShim(Arc<dyn DriverSession>),
}

/// Evaluates user scripts in the target process, with a per-call deadline.
pub struct ExecuteBridge {
    target: Target,
    /// Renderer-side fallback session, always present for Electron.
    renderer: Option<Arc<dyn DriverSession>>,
    command_timeout_ms: u64,
}

impl ExecuteBridge {
    /// Electron bridge. `main_bridge` is `None` when CDP connection failed.
    #[must_use]
    pub fn electron(
        main_bridge: Option<Arc<CdpBridge>>,
        renderer: Arc<dyn DriverSession>,
        command_timeout_ms: u64,
    ) -> Self {
        Self {
            target: Target::ElectronMain(main_bridge),
            renderer: Some(renderer),
            command_timeout_ms,
        }
    }

    /// Tauri bridge over the frontend shim.
    #[must_use]
    pub fn tauri(session: Arc<dyn DriverSession>, command_timeout_ms: u64) -> Self {
        Self {
            target: Target::TauriShim(session),
            renderer: None,
            command_timeout_ms,
        }
    }

    /// Whether main-process execution is available.
    #[must_use]
    pub const fn main_process_available(&self) -> bool {
        match &self.target {
            Target::ElectronMain(bridge) => bridge.is_some(),
            Target::TauriShim(_) => true,
        }
    }

    /// Evaluate `script` in the target process with the configured deadline.
    ///
    /// # Errors
    ///
    /// [`ExecuteError::BridgeUnavailable`] for an Electron session whose
    /// CDP bridge never connected; [`ExecuteError::PluginUnavailable`] for
    /// a Tauri app missing the plugin; [`ExecuteError::Script`] when the
    /// user script throws; [`ExecuteError::Timeout`] on deadline.
    pub async fn execute(&self, script: &str, args: &[Value]) -> Result<Value, ExecuteError> {
        match &self.target {
            Target::ElectronMain(bridge) => {
                let bridge = bridge.as_ref().ok_or(ExecuteError::BridgeUnavailable)?;
                self.execute_electron_main(bridge, script, args).await
            }
            Target::TauriShim(session) => self.execute_tauri(session, script, args).await,
        }
    }

    /// Evaluate `script` in the renderer through the driver session.
    ///
    /// Available even when the CDP bridge is down; used by the mock engine
    /// as the fallback installation path for renderer-reachable APIs.
    ///
    /// # Errors
    ///
    /// [`ExecuteError::Script`] when the driver rejects the script.
    pub async fn execute_renderer(&self, script: &str, args: &[Value]) -> Result<Value, ExecuteError> {
        let session = match (&self.renderer, &self.target) {
            (Some(renderer), _) => Arc::clone(renderer),
            (None, Target::TauriShim(session)) => Arc::clone(session),
            (None, Target::ElectronMain(_)) => return Err(ExecuteError::BridgeUnavailable),
        };
        let body = format!(
            "const fn = ({script});\n\
             const result = fn(...arguments);\n\
             return result === undefined ? null : result;"
        );
        self.with_deadline(async move {
            session
                .execute_script(&body, args.to_vec())
                .await
                .map_err(|e| ExecuteError::Script(e.to_string()))
        })
        .await
    }

    async fn execute_electron_main(
        &self,
        bridge: &Arc<CdpBridge>,
        script: &str,
        args: &[Value],
    ) -> Result<Value, ExecuteError> {
        let expression = electron_main_wrapper(script, args);
        let params = json!({
            "expression": expression,
            "awaitPromise": true,
            "returnByValue": true,
        });

        let response = self
            .with_deadline(async {
                bridge
                    .send("Runtime.evaluate", Some(params))
                    .await
                    .map_err(|e| match e {
                        CdpError::Timeout { timeout_ms, .. } => ExecuteError::Timeout(timeout_ms),
                        other => ExecuteError::Script(other.to_string()),
                    })
            })
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("unknown exception");
            return Err(ExecuteError::Script(text.to_string()));
        }

        // The wrapper JSON-stringifies; unwrap back to a structured value.
        match response.pointer("/result/value") {
            Some(Value::String(encoded)) => serde_json::from_str(encoded)
                .map_err(|e| ExecuteError::Serialization(e.to_string())),
            Some(Value::Null) | None => Ok(Value::Null),
            Some(other) => Ok(other.clone()),
        }
    }

    async fn execute_tauri(
        &self,
        session: &Arc<dyn DriverSession>,
        script: &str,
        args: &[Value],
    ) -> Result<Value, ExecuteError> {
        let outcome = self
            .with_deadline(async {
                session
                    .execute_async_script(
                        &tauri_shim_forwarder(),
                        vec![Value::String(script.to_string()), json!(args)],
                    )
                    .await
                    .map_err(|e| ExecuteError::Script(e.to_string()))
            })
            .await?;

        decode_shim_outcome(&outcome)
    }

    /// Await the Tauri shim's `waitForInit` promise.
    ///
    /// # Errors
    ///
    /// [`ExecuteError::PluginUnavailable`] when the shim never appears.
    pub async fn wait_for_tauri_init(&self) -> Result<(), ExecuteError> {
        let Target::TauriShim(session) = &self.target else {
            return Ok(());
        };
        let outcome = self
            .with_deadline(async {
                session
                    .execute_async_script(&tauri_wait_for_init_script(), vec![])
                    .await
                    .map_err(|e| ExecuteError::Script(e.to_string()))
            })
            .await?;
        decode_shim_outcome(&outcome).map(|_| ())
    }

    async fn with_deadline<T>(
        &self,
        future: impl Future<Output = Result<T, ExecuteError>>,
    ) -> Result<T, ExecuteError> {
        match tokio::time::timeout(Duration::from_millis(self.command_timeout_ms), future).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ExecuteError::Timeout(self.command_timeout_ms)),
        }
    }
}

/// Interpret the `{ok}` / `{err}` / `{unavailable}` envelope produced by
/// the shim forwarder scripts.
fn decode_shim_outcome(outcome: &Value) -> Result<Value, ExecuteError> {
    if outcome
        .get("unavailable")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Err(ExecuteError::PluginUnavailable);
    }
    if let Some(error) = outcome.get("err").and_then(Value::as_str) {
        return Err(ExecuteError::Script(error.to_string()));
    }
    Ok(outcome.get("ok").cloned().unwrap_or(Value::Null))
}
