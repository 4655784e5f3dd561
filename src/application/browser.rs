// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! The command surface attached to a session instance.
//!
//! [`DesktopBrowser`] is what user tests hold: it wraps the underlying
//! driver session and exposes the framework commands (`execute`, the mock
//! family, `triggerDeeplink`). One exists per instance; a multiremote
//! session yields one per named instance, each with disjoint state.

use crate::application::deeplink::DeeplinkTrigger;
use crate::application::execute::ExecuteBridge;
use crate::application::mocks::{Mock, MockEngine, is_mock_function};
use crate::application::windows::WindowTracker;
use crate::domain::errors::{DeeplinkError, ServiceError};
use crate::domain::options::{Framework, ServiceOptions};
use crate::domain::session_port::DriverSession;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct BrowserParts {
    pub instance: Option<String>,
    pub framework: Framework,
    pub session: Arc<dyn DriverSession>,
    pub executor: Arc<ExecuteBridge>,
    pub mocks: Arc<MockEngine>,
    pub windows: Arc<WindowTracker>,
    pub deeplink: Option<Arc<DeeplinkTrigger>>,
    pub options: ServiceOptions,
}

/// One instance's command surface. Cheap to clone.
#[derive(Clone)]
pub struct DesktopBrowser {
    inner: Arc<BrowserParts>,
}

impl std::fmt::Debug for DesktopBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopBrowser")
            .field("instance", &self.inner.instance)
            .field("framework", &self.inner.framework)
            .finish_non_exhaustive()
    }
}

impl DesktopBrowser {
    pub(crate) fn new(parts: BrowserParts) -> Self {
        Self {
            inner: Arc::new(parts),
        }
    }

    /// Instance name in a multiremote session, `None` in a single session.
    #[must_use]
    pub fn instance_name(&self) -> Option<&str> {
        self.inner.instance.as_deref()
    }

    /// Framework this session drives.
    #[must_use]
    pub fn framework(&self) -> Framework {
        self.inner.framework
    }

    /// The underlying driver session.
    #[must_use]
    pub fn session(&self) -> Arc<dyn DriverSession> {
        Arc::clone(&self.inner.session)
    }

    /// This instance's window tracker.
    #[must_use]
    pub fn windows(&self) -> Arc<WindowTracker> {
        Arc::clone(&self.inner.windows)
    }

    /// Merged options this worker runs under.
    #[must_use]
    pub fn options(&self) -> &ServiceOptions {
        &self.inner.options
    }

    pub(crate) fn mock_engine(&self) -> Arc<MockEngine> {
        Arc::clone(&self.inner.mocks)
    }

    /// Evaluate a function source inside the app's main/backend process.
    ///
    /// # Errors
    ///
    /// See [`ExecuteBridge::execute`].
    pub async fn execute(&self, script: &str, args: &[Value]) -> Result<Value, ServiceError> {
        Ok(self.inner.executor.execute(script, args).await?)
    }

    /// Mock one API function.
    ///
    /// For Tauri sessions `api` is the command name and `func` is the
    /// empty string — the plugin registry is keyed by command alone.
    ///
    /// # Errors
    ///
    /// Rejects when the API or function does not exist in the target
    /// process; nothing is registered partially.
    pub async fn mock(&self, api: &str, func: &str) -> Result<Arc<Mock>, ServiceError> {
        Ok(self.inner.mocks.mock(api, func).await?)
    }

    /// Mock every function-valued member of an API.
    ///
    /// # Errors
    ///
    /// Rejects when the API does not exist.
    pub async fn mock_all(&self, api: &str) -> Result<HashMap<String, Arc<Mock>>, ServiceError> {
        Ok(self.inner.mocks.mock_all(api).await?)
    }

    /// `mockClear` every registered mock, optionally scoped to one API.
    ///
    /// # Errors
    ///
    /// Propagates target-process failures.
    pub async fn clear_all_mocks(&self, api: Option<&str>) -> Result<(), ServiceError> {
        Ok(self.inner.mocks.clear_all(api).await?)
    }

    /// `mockReset` every registered mock, optionally scoped to one API.
    ///
    /// # Errors
    ///
    /// Propagates target-process failures.
    pub async fn reset_all_mocks(&self, api: Option<&str>) -> Result<(), ServiceError> {
        Ok(self.inner.mocks.reset_all(api).await?)
    }

    /// `mockRestore` every registered mock, optionally scoped to one API.
    ///
    /// # Errors
    ///
    /// Propagates target-process failures.
    pub async fn restore_all_mocks(&self, api: Option<&str>) -> Result<(), ServiceError> {
        Ok(self.inner.mocks.restore_all(api).await?)
    }

    /// Whether a value carries the in-process mock marker.
    #[must_use]
    pub fn is_mock_function(&self, value: &Value) -> bool {
        is_mock_function(value)
    }

    /// Fire an OS deeplink at the running instance. Electron only.
    ///
    /// # Errors
    ///
    /// [`DeeplinkError::UnsupportedFramework`] for Tauri sessions;
    /// otherwise see [`DeeplinkTrigger::trigger`].
    pub async fn trigger_deeplink(&self, url: &str) -> Result<(), ServiceError> {
        let trigger = self
            .inner
            .deeplink
            .as_ref()
            .ok_or(DeeplinkError::UnsupportedFramework)?;
        Ok(trigger.trigger(url).await?)
    }
}
