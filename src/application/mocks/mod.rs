// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Mock engine: registration, validation, and worker-wide operations.

mod mock;
pub mod scripts;

pub use mock::Mock;
pub(crate) use mock::MockChannel;

use crate::application::execute::ExecuteBridge;
use crate::domain::errors::MockError;
use crate::domain::options::{Framework, ServiceOptions};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Host-side check for the in-process mock marker.
#[must_use]
pub fn is_mock_function(value: &Value) -> bool {
    value
        .get("__isMockFunction")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Per-instance mock engine.
///
/// Owns the registry of outer proxies; the matching inner state lives in
/// the target process. All state is per instance — multiremote instances
/// never share mocks.
pub struct MockEngine {
    framework: Framework,
    executor: Arc<ExecuteBridge>,
    registry: Mutex<HashMap<(String, String), Arc<Mock>>>,
}

impl MockEngine {
    /// Engine for one session instance.
    #[must_use]
    pub fn new(framework: Framework, executor: Arc<ExecuteBridge>) -> Self {
        Self {
            framework,
            executor,
            registry: Mutex::new(HashMap::new()),
        }
    }

    fn channel(&self) -> MockChannel {
        match self.framework {
            Framework::Tauri => MockChannel::Tauri,
            Framework::Electron => {
                if self.executor.main_process_available() {
                    MockChannel::ElectronMain
                } else {
                    // CDP never connected; renderer-reachable APIs are
                    // still mockable through the driver session.
                    MockChannel::ElectronRenderer
                }
            }
        }
    }

    async fn run(&self, script: &str, args: Vec<Value>) -> Result<Value, MockError> {
        let result = match self.channel() {
            MockChannel::ElectronRenderer => self.executor.execute_renderer(script, &args).await?,
            _ => self.executor.execute(script, &args).await?,
        };
        Ok(result)
    }

    /// Mock one API function (Electron) or command (Tauri, empty `func`).
    ///
    /// Validates the target before registering: a missing API or function
    /// rejects the call with no partial registration.
    pub async fn mock(&self, api: &str, func: &str) -> Result<Arc<Mock>, MockError> {
        if let Some(existing) = self
            .registry
            .lock()
            .expect("mock registry poisoned")
            .get(&(api.to_string(), func.to_string()))
        {
            return Ok(Arc::clone(existing));
        }

        if self.framework == Framework::Electron {
            let probe = self
                .run(scripts::probe_target(), vec![json!(api), json!(func)])
                .await?;
            match probe.as_str() {
                Some("ok") => {}
                Some("api-missing") => return Err(MockError::ApiNotFound(api.to_string())),
                _ => {
                    return Err(MockError::FunctionNotFound {
                        api: api.to_string(),
                        func: func.to_string(),
                    });
                }
            }
            self.run(scripts::install_mock(), vec![json!(api), json!(func)])
                .await?;
        }

        let mock = Arc::new(Mock::new(
            api,
            func,
            Arc::clone(&self.executor),
            self.channel(),
        ));
        if self.framework == Framework::Tauri {
            // Register the command in the plugin registry so interception
            // starts immediately; the return value defaults to null.
            mock.mock_return_value(Value::Null).await?;
        }

        self.registry
            .lock()
            .expect("mock registry poisoned")
            .insert((api.to_string(), func.to_string()), Arc::clone(&mock));
        Ok(mock)
    }

    /// Mock every function-valued member of an API object.
    ///
    /// Non-function members are skipped.
    pub async fn mock_all(&self, api: &str) -> Result<HashMap<String, Arc<Mock>>, MockError> {
        let listing = self
            .run(scripts::list_functions(), vec![json!(api)])
            .await?;
        let names: Vec<String> = match listing {
            Value::Null => return Err(MockError::ApiNotFound(api.to_string())),
            other => serde_json::from_value(other).map_err(|e| {
                MockError::Execute(crate::domain::errors::ExecuteError::Serialization(
                    e.to_string(),
                ))
            })?,
        };

        let mut mocks = HashMap::new();
        for name in names {
            let mock = self.mock(api, &name).await?;
            mocks.insert(name, mock);
        }
        Ok(mocks)
    }

    fn registered(&self, api: Option<&str>) -> Vec<Arc<Mock>> {
        self.registry
            .lock()
            .expect("mock registry poisoned")
            .iter()
            .filter(|((mock_api, _), _)| api.is_none_or(|wanted| wanted == mock_api.as_str()))
            .map(|(_, mock)| Arc::clone(mock))
            .collect()
    }

    /// `mockClear` every registered mock (optionally one API's).
    pub async fn clear_all(&self, api: Option<&str>) -> Result<(), MockError> {
        for mock in self.registered(api) {
            mock.mock_clear().await?;
        }
        Ok(())
    }

    /// `mockReset` every registered mock (optionally one API's).
    pub async fn reset_all(&self, api: Option<&str>) -> Result<(), MockError> {
        for mock in self.registered(api) {
            mock.mock_reset().await?;
        }
        Ok(())
    }

    /// `mockRestore` every registered mock (optionally one API's) and
    /// forget them; the target returns to its pre-mock state.
    pub async fn restore_all(&self, api: Option<&str>) -> Result<(), MockError> {
        for mock in self.registered(api) {
            mock.mock_restore().await?;
        }
        self.registry
            .lock()
            .expect("mock registry poisoned")
            .retain(|(mock_api, _), _| api.is_some_and(|wanted| wanted != mock_api.as_str()));
        Ok(())
    }

    /// Apply the configured before-each hooks, in restore → reset → clear
    /// precedence (restore implies reset implies clear).
    pub async fn apply_before_test_hooks(
        &self,
        options: &ServiceOptions,
    ) -> Result<(), MockError> {
        if options.restore_mocks.unwrap_or(false) {
            self.restore_all(None).await
        } else if options.reset_mocks.unwrap_or(false) {
            self.reset_all(None).await
        } else if options.clear_mocks.unwrap_or(false) {
            self.clear_all(None).await
        } else {
            Ok(())
        }
    }

    /// Number of live registered mocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().expect("mock registry poisoned").len()
    }

    /// Whether no mocks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session_port::DriverSession;
    use crate::domain::session_port::test_support::FakeSession;

    fn electron_engine(fake: &Arc<FakeSession>) -> MockEngine {
        let session: Arc<dyn DriverSession> = Arc::clone(fake) as Arc<dyn DriverSession>;
        let executor = Arc::new(ExecuteBridge::electron(None, session, 1_000));
        MockEngine::new(Framework::Electron, executor)
    }

    #[tokio::test]
    async fn test_mock_validates_target_before_registering() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!("api-missing"));
        let engine = electron_engine(&fake);

        let err = engine.mock("nope", "getName").await.unwrap_err();
        assert!(matches!(err, MockError::ApiNotFound(api) if api == "nope"));
        // No partial registration.
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_mock_missing_function_rejected() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!("func-missing"));
        let engine = electron_engine(&fake);

        let err = engine.mock("app", "nope").await.unwrap_err();
        assert!(matches!(err, MockError::FunctionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mock_registers_and_is_idempotent() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!("ok")); // probe
        fake.queue_script_result(json!(true)); // install
        let engine = electron_engine(&fake);

        let first = engine.mock("app", "getName").await.unwrap();
        assert_eq!(engine.len(), 1);

        // Second request returns the same proxy without re-probing.
        let executed_before = fake.executed.lock().unwrap().len();
        let second = engine.mock("app", "getName").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fake.executed.lock().unwrap().len(), executed_before);
    }

    #[tokio::test]
    async fn test_mock_all_skips_non_functions() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!(["getName", "getVersion"])); // listing
        fake.queue_script_result(json!("ok")); // probe getName
        fake.queue_script_result(json!(true)); // install getName
        fake.queue_script_result(json!("ok")); // probe getVersion
        fake.queue_script_result(json!(true)); // install getVersion
        let engine = electron_engine(&fake);

        let mocks = engine.mock_all("app").await.unwrap();
        assert_eq!(mocks.len(), 2);
        assert!(mocks.contains_key("getName"));
        assert!(mocks.contains_key("getVersion"));
    }

    #[tokio::test]
    async fn test_mock_all_unknown_api() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(Value::Null);
        let engine = electron_engine(&fake);

        assert!(matches!(
            engine.mock_all("nope").await.unwrap_err(),
            MockError::ApiNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_restore_all_forgets_registry() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!("ok"));
        fake.queue_script_result(json!(true));
        let engine = electron_engine(&fake);
        engine.mock("app", "getName").await.unwrap();

        fake.queue_script_result(json!(true)); // restore script
        engine.restore_all(None).await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_twice_is_idempotent() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!("ok"));
        fake.queue_script_result(json!(true));
        let engine = electron_engine(&fake);
        let mock = engine.mock("app", "getName").await.unwrap();

        fake.queue_script_result(json!(true));
        engine.clear_all(None).await.unwrap();
        let after_first = (mock.calls(), mock.results(), mock.invocation_call_order());

        fake.queue_script_result(json!(true));
        engine.clear_all(None).await.unwrap();
        let after_second = (mock.calls(), mock.results(), mock.invocation_call_order());
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_before_test_hook_precedence() {
        let fake = Arc::new(FakeSession::with_handles(&["w"]));
        fake.queue_script_result(json!("ok"));
        fake.queue_script_result(json!(true));
        let engine = electron_engine(&fake);
        engine.mock("app", "getName").await.unwrap();

        // restoreMocks wins over the others.
        fake.queue_script_result(json!(true));
        let options = ServiceOptions {
            clear_mocks: Some(true),
            reset_mocks: Some(true),
            restore_mocks: Some(true),
            ..Default::default()
        };
        engine.apply_before_test_hooks(&options).await.unwrap();
        assert!(engine.is_empty(), "restore should have unregistered the mock");
    }

    #[test]
    fn test_is_mock_function_marker() {
        assert!(is_mock_function(&json!({"__isMockFunction": true})));
        assert!(!is_mock_function(&json!({"__isMockFunction": false})));
        assert!(!is_mock_function(&json!({})));
        assert!(!is_mock_function(&json!(null)));
        assert!(!is_mock_function(&json!("fn")));
    }
}
