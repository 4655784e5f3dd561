//! Process-wide mock registry.
//!
//! One store lives in Tauri managed state for the app's lifetime.
//! Interception is all-or-nothing per command: a registered command
//! resolves with its configured return value and the original handler
//! never runs. Dispatch happens concurrently, so the store is
//! mutex-guarded and the call counter is a single atomic shared by every
//! entry.

use crate::models::{MockConfig, MockSnapshot};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct MockEntry {
    config: MockConfig,
    calls: Vec<Value>,
    invocation_call_order: Vec<u64>,
}

/// Registry mapping command names to mock state.
#[derive(Debug, Default)]
pub struct MockStore {
    counter: AtomicU64,
    entries: Mutex<HashMap<String, MockEntry>>,
}

impl MockStore {
    /// Fresh, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a command's mock. `None` removes the entry,
    /// restoring the original handler.
    pub fn set(&self, command: &str, config: Option<MockConfig>) {
        let mut entries = self.entries.lock().expect("mock store poisoned");
        match config {
            Some(config) => {
                entries.insert(
                    command.to_string(),
                    MockEntry {
                        config,
                        ..MockEntry::default()
                    },
                );
            }
            None => {
                entries.remove(command);
            }
        }
    }

    /// Current state for a command, when mocked.
    #[must_use]
    pub fn get(&self, command: &str) -> Option<MockSnapshot> {
        let entries = self.entries.lock().expect("mock store poisoned");
        entries.get(command).map(|entry| MockSnapshot {
            return_value: entry.config.return_value.clone(),
            calls: entry.calls.clone(),
            invocation_call_order: entry.invocation_call_order.clone(),
        })
    }

    /// Whether a command is currently mocked.
    #[must_use]
    pub fn is_mocked(&self, command: &str) -> bool {
        self.entries
            .lock()
            .expect("mock store poisoned")
            .contains_key(command)
    }

    /// Record one interception and return the configured value.
    ///
    /// Returns `None` for unmocked commands (the caller dispatches the
    /// original handler).
    #[must_use]
    pub fn record_call(&self, command: &str, args: Value) -> Option<Value> {
        let mut entries = self.entries.lock().expect("mock store poisoned");
        let entry = entries.get_mut(command)?;
        let stamp = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        entry.calls.push(args);
        entry.invocation_call_order.push(stamp);
        Some(entry.config.return_value.clone())
    }

    /// Drop recorded calls on every entry; configurations survive.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("mock store poisoned");
        for entry in entries.values_mut() {
            entry.calls.clear();
            entry.invocation_call_order.clear();
        }
    }

    /// Drop recorded calls and null out every configured return value.
    pub fn reset(&self) {
        let mut entries = self.entries.lock().expect("mock store poisoned");
        for entry in entries.values_mut() {
            entry.calls.clear();
            entry.invocation_call_order.clear();
            entry.config = MockConfig::default();
        }
    }

    /// Forget every mock; original handlers run again.
    pub fn restore(&self) {
        self.entries.lock().expect("mock store poisoned").clear();
    }

    /// Number of mocked commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("mock store poisoned").len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> MockConfig {
        MockConfig {
            return_value: value,
        }
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let store = MockStore::new();
        store.set("open_file", Some(config(json!({"ok": true}))));

        let snapshot = store.get("open_file").unwrap();
        assert_eq!(snapshot.return_value, json!({"ok": true}));
        assert!(snapshot.calls.is_empty());
    }

    #[test]
    fn test_get_unmocked_is_none() {
        let store = MockStore::new();
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn test_record_call_returns_configured_value() {
        let store = MockStore::new();
        store.set("open_file", Some(config(json!("mocked"))));

        let value = store.record_call("open_file", json!({"path": "a"}));
        assert_eq!(value, Some(json!("mocked")));

        let snapshot = store.get("open_file").unwrap();
        assert_eq!(snapshot.calls, vec![json!({"path": "a"})]);
        assert_eq!(snapshot.invocation_call_order.len(), 1);
    }

    #[test]
    fn test_record_call_unmocked_passes_through() {
        let store = MockStore::new();
        assert_eq!(store.record_call("open_file", json!(null)), None);
    }

    #[test]
    fn test_counter_is_monotonic_across_commands() {
        let store = MockStore::new();
        store.set("a", Some(config(json!(1))));
        store.set("b", Some(config(json!(2))));

        let _ = store.record_call("a", json!(null));
        let _ = store.record_call("b", json!(null));
        let _ = store.record_call("a", json!(null));

        let a = store.get("a").unwrap().invocation_call_order;
        let b = store.get("b").unwrap().invocation_call_order;
        let mut all: Vec<u64> = a.into_iter().chain(b).collect();
        all.sort_unstable();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn test_clear_keeps_config() {
        let store = MockStore::new();
        store.set("a", Some(config(json!("kept"))));
        let _ = store.record_call("a", json!(1));

        store.clear();
        let snapshot = store.get("a").unwrap();
        assert!(snapshot.calls.is_empty());
        assert_eq!(snapshot.return_value, json!("kept"));
    }

    #[test]
    fn test_reset_nulls_config() {
        let store = MockStore::new();
        store.set("a", Some(config(json!("dropped"))));
        let _ = store.record_call("a", json!(1));

        store.reset();
        let snapshot = store.get("a").unwrap();
        assert!(snapshot.calls.is_empty());
        assert_eq!(snapshot.return_value, Value::Null);
    }

    #[test]
    fn test_restore_forgets_everything() {
        let store = MockStore::new();
        store.set("a", Some(config(json!(1))));
        store.set("b", Some(config(json!(2))));

        store.restore();
        assert!(store.is_empty());
        assert_eq!(store.record_call("a", json!(null)), None);
    }

    #[test]
    fn test_set_none_removes_single_entry() {
        let store = MockStore::new();
        store.set("a", Some(config(json!(1))));
        store.set("b", Some(config(json!(2))));

        store.set("a", None);
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
    }

    #[test]
    fn test_re_set_resets_recorded_calls() {
        let store = MockStore::new();
        store.set("a", Some(config(json!(1))));
        let _ = store.record_call("a", json!(null));

        store.set("a", Some(config(json!(1))));
        assert!(store.get("a").unwrap().calls.is_empty());
    }
}
