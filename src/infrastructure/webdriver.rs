// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Minimal WebDriver REST client.
//!
//! Implements the [`DriverSession`] port over HTTP for standalone use,
//! covering only the endpoints the service consumes. When a test runner
//! hosts the service it brings its own session and this module is unused.

use crate::domain::errors::WebDriverError;
use crate::domain::session_port::DriverSession;
use async_trait::async_trait;
use serde_json::{Value, json};

/// One HTTP-backed WebDriver session.
pub struct HttpDriverSession {
    client: reqwest::Client,
    base: String,
    session_id: String,
}

/// Unwrap the `{"value": …}` envelope every WebDriver response carries,
/// surfacing `{"value": {"error": …}}` payloads as protocol errors.
fn unwrap_value(body: Value) -> Result<Value, WebDriverError> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        return Err(WebDriverError::Protocol {
            error: error.to_string(),
            message,
        });
    }
    Ok(value)
}

impl HttpDriverSession {
    /// Create a session against a WebDriver server.
    ///
    /// # Errors
    ///
    /// [`WebDriverError::Http`] on transport failure,
    /// [`WebDriverError::Protocol`] when the server refuses the session.
    pub async fn new_session(
        server_url: &str,
        capabilities: Value,
    ) -> Result<Self, WebDriverError> {
        let client = reqwest::Client::new();
        let base = server_url.trim_end_matches('/').to_string();
        let body = client
            .post(format!("{base}/session"))
            .json(&json!({"capabilities": {"alwaysMatch": capabilities}}))
            .send()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?;

        let value = unwrap_value(body)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or(WebDriverError::NoSession)?
            .to_string();

        Ok(Self {
            client,
            base,
            session_id,
        })
    }

    /// Driver-issued session id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("{}/session/{}", self.base, self.session_id)
        } else {
            format!("{}/session/{}/{suffix}", self.base, self.session_id)
        }
    }

    async fn get(&self, suffix: &str) -> Result<Value, WebDriverError> {
        let body = self
            .client
            .get(self.endpoint(suffix))
            .send()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?;
        unwrap_value(body)
    }

    async fn post(&self, suffix: &str, payload: Value) -> Result<Value, WebDriverError> {
        let body = self
            .client
            .post(self.endpoint(suffix))
            .json(&payload)
            .send()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?;
        unwrap_value(body)
    }
}

#[async_trait]
impl DriverSession for HttpDriverSession {
    async fn execute_script(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, WebDriverError> {
        self.post("execute/sync", json!({"script": script, "args": args}))
            .await
    }

    async fn execute_async_script(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, WebDriverError> {
        self.post("execute/async", json!({"script": script, "args": args}))
            .await
    }

    async fn window_handles(&self) -> Result<Vec<String>, WebDriverError> {
        let value = self.get("window/handles").await?;
        serde_json::from_value(value).map_err(|e| WebDriverError::Http(e.to_string()))
    }

    async fn current_window_handle(&self) -> Result<String, WebDriverError> {
        let value = self.get("window").await?;
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or(WebDriverError::NoSession)
    }

    async fn switch_to_window(&self, handle: &str) -> Result<(), WebDriverError> {
        self.post("window", json!({"handle": handle})).await?;
        Ok(())
    }

    async fn title(&self) -> Result<String, WebDriverError> {
        let value = self.get("title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn url(&self) -> Result<String, WebDriverError> {
        let value = self.get("url").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn delete_session(&self) -> Result<(), WebDriverError> {
        self.client
            .delete(self.endpoint(""))
            .send()
            .await
            .map_err(|e| WebDriverError::Http(e.to_string()))?;
        Ok(())
    }
}
