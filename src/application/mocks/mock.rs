// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Host-side mock proxy.
//!
//! The inner half of every mock lives in the target process and records
//! calls; this proxy configures it and mirrors its state. Reads
//! (`calls()`, `results()`, …) are served from the last pulled snapshot —
//! call [`Mock::update`] after any execute that may have invoked the mock
//! indirectly.

use super::scripts;
use crate::application::execute::ExecuteBridge;
use crate::domain::errors::MockError;
use crate::domain::mocks::{CallResult, MockSnapshot, TauriMockConfig};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Which in-process channel carries this mock's scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MockChannel {
    /// Electron main process over the CDP bridge.
    ElectronMain,
    /// Renderer fallback for sessions whose CDP bridge never connected.
    ElectronRenderer,
    /// Tauri plugin registry through the frontend shim.
    Tauri,
}

struct MockState {
    snapshot: MockSnapshot,
    name: String,
    implementation: Option<String>,
    restored: bool,
}

/// Control proxy for one mocked API function.
pub struct Mock {
    api: String,
    func: String,
    executor: Arc<ExecuteBridge>,
    channel: MockChannel,
    state: Mutex<MockState>,
}

impl std::fmt::Debug for Mock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mock")
            .field("api", &self.api)
            .field("func", &self.func)
            .finish_non_exhaustive()
    }
}

impl Mock {
    pub(crate) fn new(
        api: &str,
        func: &str,
        executor: Arc<ExecuteBridge>,
        channel: MockChannel,
    ) -> Self {
        Self {
            api: api.to_string(),
            func: func.to_string(),
            executor,
            channel,
            state: Mutex::new(MockState {
                snapshot: MockSnapshot::default(),
                name: format!("{api}.{func}"),
                implementation: None,
                restored: false,
            }),
        }
    }

    /// API object name this mock targets.
    #[must_use]
    pub fn api_name(&self) -> &str {
        &self.api
    }

    /// Function name this mock targets.
    #[must_use]
    pub fn func_name(&self) -> &str {
        &self.func
    }

    /// Marker mirroring the in-process `__isMockFunction` flag.
    #[must_use]
    pub const fn is_mock_function(&self) -> bool {
        true
    }

    async fn run(&self, script: &str, args: Vec<Value>) -> Result<Value, MockError> {
        let result = match self.channel {
            MockChannel::ElectronMain | MockChannel::Tauri => {
                self.executor.execute(script, &args).await?
            }
            MockChannel::ElectronRenderer => self.executor.execute_renderer(script, &args).await?,
        };
        Ok(result)
    }

    fn key_args(&self) -> Vec<Value> {
        vec![json!(self.api), json!(self.func)]
    }

    async fn set_implementation_source(
        &self,
        source: Option<&str>,
        once: bool,
    ) -> Result<(), MockError> {
        if self.channel == MockChannel::Tauri {
            // The plugin registry is value-based; implementations are an
            // Electron capability.
            return Err(MockError::Execute(
                crate::domain::errors::ExecuteError::Script(
                    "Tauri mocks accept return values, not implementations".to_string(),
                ),
            ));
        }
        let mut args = self.key_args();
        args.push(source.map_or(Value::Null, |s| json!(s)));
        args.push(json!(once));
        self.run(scripts::set_implementation(), args).await?;
        if !once {
            self.state.lock().expect("mock state poisoned").implementation =
                source.map(ToString::to_string);
        }
        Ok(())
    }

    /// Replace the default implementation with a JS function source.
    pub async fn mock_implementation(&self, source: &str) -> Result<(), MockError> {
        self.set_implementation_source(Some(source), false).await
    }

    /// Queue a one-shot implementation (consumed FIFO before the default).
    pub async fn mock_implementation_once(&self, source: &str) -> Result<(), MockError> {
        self.set_implementation_source(Some(source), true).await
    }

    /// Make the mock return a constant.
    pub async fn mock_return_value(&self, value: Value) -> Result<(), MockError> {
        if self.channel == MockChannel::Tauri {
            return self.tauri_set_mock(Some(value)).await;
        }
        self.set_implementation_source(Some(&scripts::return_value_impl(&value)), false)
            .await
    }

    /// Make the next call return a constant.
    pub async fn mock_return_value_once(&self, value: Value) -> Result<(), MockError> {
        self.set_implementation_source(Some(&scripts::return_value_impl(&value)), true)
            .await
    }

    /// Make the mock resolve a constant.
    pub async fn mock_resolved_value(&self, value: Value) -> Result<(), MockError> {
        self.set_implementation_source(Some(&scripts::resolved_value_impl(&value)), false)
            .await
    }

    /// Make the next call resolve a constant.
    pub async fn mock_resolved_value_once(&self, value: Value) -> Result<(), MockError> {
        self.set_implementation_source(Some(&scripts::resolved_value_impl(&value)), true)
            .await
    }

    /// Make the mock reject a constant.
    pub async fn mock_rejected_value(&self, value: Value) -> Result<(), MockError> {
        self.set_implementation_source(Some(&scripts::rejected_value_impl(&value)), false)
            .await
    }

    /// Make the next call reject a constant.
    pub async fn mock_rejected_value_once(&self, value: Value) -> Result<(), MockError> {
        self.set_implementation_source(Some(&scripts::rejected_value_impl(&value)), true)
            .await
    }

    /// Make the mock return its `this` binding.
    pub async fn mock_return_this(&self) -> Result<(), MockError> {
        self.set_implementation_source(Some(scripts::return_this_impl()), false)
            .await
    }

    /// Swap in `source`, await `callback`, then restore the previous
    /// implementation regardless of the callback's outcome.
    pub async fn with_implementation<T, F>(&self, source: &str, callback: F) -> Result<T, MockError>
    where
        F: Future<Output = T>,
    {
        let mut args = self.key_args();
        args.push(json!(source));
        self.run(scripts::begin_with_implementation(), args).await?;

        let outcome = callback.await;

        self.run(scripts::end_with_implementation(), self.key_args())
            .await?;
        Ok(outcome)
    }

    /// Empty `calls`, `results`, `invocationCallOrder`, and the one-shot
    /// queue; the implementation survives.
    pub async fn mock_clear(&self) -> Result<(), MockError> {
        if self.channel == MockChannel::Tauri {
            let current = self.tauri_get_config().await?;
            self.tauri_set_mock(Some(
                current.map_or(Value::Null, |c| c["return_value"].clone()),
            ))
            .await?;
        } else {
            self.run(scripts::clear_mock(), self.key_args()).await?;
        }
        self.state.lock().expect("mock state poisoned").snapshot = MockSnapshot::default();
        Ok(())
    }

    /// [`Mock::mock_clear`] plus dropping the implementation.
    pub async fn mock_reset(&self) -> Result<(), MockError> {
        if self.channel == MockChannel::Tauri {
            self.tauri_set_mock(Some(Value::Null)).await?;
        } else {
            self.run(scripts::reset_mock(), self.key_args()).await?;
        }
        let mut state = self.state.lock().expect("mock state poisoned");
        state.snapshot = MockSnapshot::default();
        state.implementation = None;
        Ok(())
    }

    /// [`Mock::mock_reset`] plus detaching from the target API; the
    /// original function is reinstated and subsequent calls to it record
    /// nothing.
    pub async fn mock_restore(&self) -> Result<(), MockError> {
        if self.channel == MockChannel::Tauri {
            self.tauri_set_mock(None).await?;
        } else {
            self.run(scripts::restore_mock(), self.key_args()).await?;
        }
        let mut state = self.state.lock().expect("mock state poisoned");
        state.snapshot = MockSnapshot::default();
        state.implementation = None;
        state.restored = true;
        Ok(())
    }

    /// Pull the latest in-process state. Required after any execute that
    /// might have invoked the mock indirectly.
    pub async fn update(&self) -> Result<MockSnapshot, MockError> {
        if self.state.lock().expect("mock state poisoned").restored {
            return Ok(MockSnapshot::default());
        }
        let snapshot = match self.channel {
            MockChannel::Tauri => self.tauri_pull_snapshot().await?,
            _ => {
                let raw = self.run(scripts::pull_state(), self.key_args()).await?;
                if raw.is_null() {
                    MockSnapshot::default()
                } else {
                    serde_json::from_value(raw).map_err(|e| {
                        MockError::Execute(crate::domain::errors::ExecuteError::Serialization(
                            e.to_string(),
                        ))
                    })?
                }
            }
        };
        self.state.lock().expect("mock state poisoned").snapshot = snapshot.clone();
        Ok(snapshot)
    }

    /// Set the diagnostic name.
    pub fn mock_name(&self, name: &str) {
        self.state.lock().expect("mock state poisoned").name = name.to_string();
    }

    /// Diagnostic name (defaults to `api.func`).
    #[must_use]
    pub fn get_mock_name(&self) -> String {
        self.state.lock().expect("mock state poisoned").name.clone()
    }

    /// Source of the current default implementation, when one was set.
    #[must_use]
    pub fn get_mock_implementation(&self) -> Option<String> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .implementation
            .clone()
    }

    /// Recorded call arguments, from the last snapshot.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.state.lock().expect("mock state poisoned").snapshot.calls.clone()
    }

    /// Recorded call outcomes, from the last snapshot.
    #[must_use]
    pub fn results(&self) -> Vec<CallResult> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .snapshot
            .results
            .clone()
    }

    /// Global order stamps, from the last snapshot.
    #[must_use]
    pub fn invocation_call_order(&self) -> Vec<u64> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .snapshot
            .invocation_call_order
            .clone()
    }

    /// Arguments of the most recent call, from the last snapshot.
    #[must_use]
    pub fn last_call(&self) -> Option<Vec<Value>> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .snapshot
            .last_call()
            .cloned()
    }

    // ── Tauri plugin channel ──

    async fn tauri_set_mock(&self, return_value: Option<Value>) -> Result<(), MockError> {
        let script = "(tauri, command, config) => window.wdioTauri.setMock(command, config)";
        let config = return_value
            .map(|value| {
                serde_json::to_value(TauriMockConfig {
                    return_value: value,
                })
                .unwrap_or(Value::Null)
            })
            .unwrap_or(Value::Null);
        self.run(script, vec![json!(self.api), config]).await?;
        Ok(())
    }

    async fn tauri_get_config(&self) -> Result<Option<Value>, MockError> {
        let script = "(tauri, command) => window.wdioTauri.getMock(command)";
        let raw = self.run(script, vec![json!(self.api)]).await?;
        Ok((!raw.is_null()).then_some(raw))
    }

    async fn tauri_pull_snapshot(&self) -> Result<MockSnapshot, MockError> {
        let Some(config) = self.tauri_get_config().await? else {
            return Ok(MockSnapshot::default());
        };
        let return_value = config
            .get("return_value")
            .cloned()
            .unwrap_or(Value::Null);
        let calls: Vec<Value> = config
            .get("calls")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let order: Vec<u64> = config
            .get("invocationCallOrder")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();

        Ok(MockSnapshot {
            results: calls
                .iter()
                .map(|_| CallResult::Return(return_value.clone()))
                .collect(),
            calls: calls.into_iter().map(|args| vec![args]).collect(),
            invocation_call_order: order,
        })
    }
}
