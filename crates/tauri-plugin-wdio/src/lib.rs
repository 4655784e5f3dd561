//! In-app bridge for WebDriver tests against Tauri applications.
//!
//! Tauri apps expose no inspector, so the bridge lives inside the app:
//! this plugin registers the `execute` / mock commands under
//! `plugin:wdio|…` and injects a frontend shim
//! (`window.wdioTauri.{execute,setMock,getMock,clearMocks,resetMocks,
//! restoreMocks,waitForInit}`) that forwards to them over the existing
//! IPC. The shim also patches command dispatch for mock interception and
//! forwards frontend console calls to the backend log stream.
//!
//! Apps under test add the plugin at build time:
//!
//! ```ignore
//! tauri::Builder::default()
//!     .plugin(tauri_plugin_wdio::init())
//!     .run(tauri::generate_context!())
//! ```
//!
//! and grant `wdio:default` in their capabilities file.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tauri::{
    Manager, Runtime,
    plugin::{Builder, TauriPlugin},
};
use tokio::sync::oneshot;

mod commands;
mod error;
mod mock_store;
mod models;

pub use error::{Error, Result};
pub use mock_store::MockStore;
pub use models::{ExecuteRequest, ExecuteResponse, MockConfig, MockSnapshot};

/// Frontend shim injected into every webview before page scripts run.
const INIT_SCRIPT: &str = include_str!("init.js");

/// Pending webview evaluations, keyed by id, resolved by
/// `report_execute_result`.
#[derive(Default)]
pub struct PendingExecutions {
    next: AtomicU64,
    waiting: Mutex<HashMap<u64, oneshot::Sender<ExecuteResponse>>>,
}

impl PendingExecutions {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn register(&self, id: u64) -> oneshot::Receiver<ExecuteResponse> {
        let (tx, rx) = oneshot::channel();
        self.waiting
            .lock()
            .expect("pending executions poisoned")
            .insert(id, tx);
        rx
    }

    fn resolve(&self, response: ExecuteResponse) {
        let sender = self
            .waiting
            .lock()
            .expect("pending executions poisoned")
            .remove(&response.id);
        if let Some(tx) = sender {
            let _ = tx.send(response);
        }
    }

    fn forget(&self, id: u64) {
        self.waiting
            .lock()
            .expect("pending executions poisoned")
            .remove(&id);
    }
}

/// Create the wdio plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("wdio")
        .js_init_script(INIT_SCRIPT.to_string())
        .invoke_handler(tauri::generate_handler![
            commands::execute,
            commands::report_execute_result,
            commands::set_mock,
            commands::get_mock,
            commands::record_mock_call,
            commands::clear_mocks,
            commands::reset_mocks,
            commands::restore_mocks,
        ])
        .setup(|app, _api| {
            app.manage(MockStore::new());
            app.manage(PendingExecutions::default());
            tracing::debug!("wdio plugin initialized");
            Ok(())
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pending_ids_are_unique_and_increasing() {
        let pending = PendingExecutions::default();
        let first = pending.next_id();
        let second = pending.next_id();
        assert!(second > first);
    }

    #[test]
    fn test_register_resolve_round_trip() {
        let pending = PendingExecutions::default();
        let id = pending.next_id();
        let mut rx = pending.register(id);

        pending.resolve(ExecuteResponse {
            id,
            result: json!({"ok": 1}),
            error: None,
        });

        let response = rx.try_recv().unwrap();
        assert_eq!(response.result, json!({"ok": 1}));
    }

    #[test]
    fn test_resolve_unknown_id_is_ignored() {
        let pending = PendingExecutions::default();
        // No panic, nothing registered.
        pending.resolve(ExecuteResponse {
            id: 999,
            result: json!(null),
            error: None,
        });
    }

    #[test]
    fn test_forget_drops_receiver() {
        let pending = PendingExecutions::default();
        let id = pending.next_id();
        let mut rx = pending.register(id);
        pending.forget(id);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_init_script_exposes_shim_surface() {
        for member in [
            "execute",
            "setMock",
            "getMock",
            "clearMocks",
            "resetMocks",
            "restoreMocks",
            "waitForInit",
        ] {
            assert!(
                INIT_SCRIPT.contains(member),
                "init.js must expose {member}"
            );
        }
        assert!(INIT_SCRIPT.contains("window.wdioTauri"));
    }
}
