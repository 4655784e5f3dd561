// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Port for the underlying WebDriver session.
//!
//! The service never talks HTTP itself; it drives whatever session the
//! test runner (or the standalone bootstrapper) hands it through this
//! trait. Only the operations the service actually consumes are specified.

use crate::domain::errors::WebDriverError;
use async_trait::async_trait;
use serde_json::Value;

/// Abstraction over one WebDriver session.
///
/// Implementations must be cheap to share (`Send + Sync`); the service
/// holds one per instance, including every instance of a multiremote
/// session.
#[async_trait]
pub trait DriverSession: Send + Sync {
    /// Execute synchronous script in the current browsing context.
    ///
    /// `script` is a JavaScript function body; `args` are made available as
    /// the `arguments` array, per the WebDriver spec.
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, WebDriverError>;

    /// Execute asynchronous script: the last entry of `arguments` is the
    /// completion callback, per the WebDriver spec.
    async fn execute_async_script(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, WebDriverError>;

    /// All window handles currently known to the driver.
    async fn window_handles(&self) -> Result<Vec<String>, WebDriverError>;

    /// Handle of the focused browsing context.
    async fn current_window_handle(&self) -> Result<String, WebDriverError>;

    /// Switch focus to the given window.
    async fn switch_to_window(&self, handle: &str) -> Result<(), WebDriverError>;

    /// Title of the focused browsing context.
    async fn title(&self) -> Result<String, WebDriverError>;

    /// URL of the focused browsing context.
    async fn url(&self) -> Result<String, WebDriverError>;

    /// End the session.
    async fn delete_session(&self) -> Result<(), WebDriverError>;
}
