// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Mock call-record shapes shared between the host-side proxy and the
//! in-process interceptor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How one invocation of a mocked function ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CallResult {
    /// The implementation returned normally.
    Return(Value),
    /// The implementation threw.
    Throw(Value),
}

/// Point-in-time copy of one mock's in-process state, pulled by `update()`.
///
/// Invariant: `calls`, `results`, and `invocation_call_order` always have
/// the same length, and `invocation_call_order` values are strictly
/// increasing across every mock in the worker (the counter is shared).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockSnapshot {
    /// Arguments of each call, in call order.
    pub calls: Vec<Vec<Value>>,
    /// Outcome of each call, in call order.
    pub results: Vec<CallResult>,
    /// Global call-order stamps drawn from the shared counter.
    #[serde(rename = "invocationCallOrder")]
    pub invocation_call_order: Vec<u64>,
}

impl MockSnapshot {
    /// Arguments of the most recent call, if any.
    #[must_use]
    pub fn last_call(&self) -> Option<&Vec<Value>> {
        self.calls.last()
    }

    /// Internal consistency check used by tests and debug assertions.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.calls.len() == self.results.len()
            && self.calls.len() == self.invocation_call_order.len()
            && self.invocation_call_order.windows(2).all(|w| w[0] < w[1])
    }
}

/// Mock configuration as stored in the Tauri plugin's registry.
///
/// All-or-nothing per command: when present, the command returns
/// `return_value` without invoking the original handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TauriMockConfig {
    /// Value the intercepted command resolves with.
    pub return_value: Value,
}
