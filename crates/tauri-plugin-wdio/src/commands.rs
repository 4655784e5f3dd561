//! Plugin command handlers.

use crate::error::{Error, Result};
use crate::models::{ExecuteRequest, ExecuteResponse, MockConfig, MockSnapshot};
use crate::mock_store::MockStore;
use crate::PendingExecutions;
use serde_json::Value;
use tauri::{Runtime, State, WebviewWindow};

/// Deadline for a webview evaluation to report back.
const EXECUTE_TIMEOUT_MS: u64 = 30_000;

/// Evaluate a user script in the calling webview.
///
/// The script is wrapped in an async IIFE whose first injected argument is
/// the Tauri APIs object; any returned promise is awaited and the outcome
/// is reported back through `report_execute_result`. Results must survive
/// `JSON.stringify`; anything else fails with `SERIALIZATION_ERROR`.
#[tauri::command]
pub async fn execute<R: Runtime>(
    window: WebviewWindow<R>,
    pending: State<'_, PendingExecutions>,
    request: ExecuteRequest,
) -> Result<Value> {
    let id = pending.next_id();
    let receiver = pending.register(id);

    let script = serde_json::to_string(&request.script)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    let args = serde_json::to_string(&request.args)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    // The wrapper pre-checks serializability so a circular result fails
    // with the documented error instead of dying inside the IPC layer.
    let wrapped = format!(
        r#"(async () => {{
  const report = (result, error) =>
    window.__TAURI_INTERNALS__.invoke('plugin:wdio|report_execute_result', {{
      response: {{ id: {id}, result, error }}
    }});
  try {{
    const fn = eval('(' + {script} + ')');
    const result = await fn(window.__TAURI__, ...{args});
    const normalized = result === undefined ? null : result;
    try {{
      JSON.stringify(normalized);
    }} catch (e) {{
      await report(null, 'SERIALIZATION_ERROR: ' + String(e));
      return;
    }}
    await report(normalized, null);
  }} catch (e) {{
    await report(null, String(e));
  }}
}})()"#
    );

    window.eval(&wrapped)?;

    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(EXECUTE_TIMEOUT_MS),
        receiver,
    )
    .await;

    match outcome {
        Ok(Ok(response)) => match response.error {
            None => Ok(response.result),
            Some(error) if error.starts_with("SERIALIZATION_ERROR") => {
                Err(Error::Serialization(error))
            }
            Some(error) => Err(Error::Script(error)),
        },
        Ok(Err(_)) => Err(Error::ChannelClosed),
        Err(_) => {
            pending.forget(id);
            Err(Error::Timeout(EXECUTE_TIMEOUT_MS))
        }
    }
}

/// Result callback target for the evaluation wrapper. Internal.
#[tauri::command]
pub fn report_execute_result(
    pending: State<'_, PendingExecutions>,
    response: ExecuteResponse,
) {
    pending.resolve(response);
}

/// Insert (or, with a null config, remove) a command mock.
#[tauri::command]
pub fn set_mock(store: State<'_, MockStore>, command: String, config: Option<MockConfig>) {
    tracing::debug!("set_mock {command}");
    store.set(&command, config);
}

/// Current mock state for a command, or null when unmocked.
#[tauri::command]
pub fn get_mock(store: State<'_, MockStore>, command: String) -> Option<MockSnapshot> {
    store.get(&command)
}

/// Record one interception and return the configured value. Internal,
/// invoked by the shim's patched dispatch.
#[tauri::command]
pub fn record_mock_call(
    store: State<'_, MockStore>,
    command: String,
    args: Option<Value>,
) -> Option<Value> {
    store.record_call(&command, args.unwrap_or(Value::Null))
}

/// Drop recorded calls on every mock; configurations survive.
#[tauri::command]
pub fn clear_mocks(store: State<'_, MockStore>) {
    store.clear();
}

/// Drop recorded calls and configured values on every mock.
#[tauri::command]
pub fn reset_mocks(store: State<'_, MockStore>) {
    store.reset();
}

/// Forget every mock; original handlers dispatch again.
#[tauri::command]
pub fn restore_mocks(store: State<'_, MockStore>) {
    store.restore();
}
