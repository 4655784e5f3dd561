// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Error sum types for every subsystem.
//!
//! User-visible messages are stable strings suitable for scraping in CI
//! logs; callers match on variants, never on text.

use crate::domain::binary::ValidationAttempt;
use thiserror::Error;

/// Errors raised while supervising external drivers (tauri-driver plus the
/// platform WebDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver binary could not be located.
    #[error("{binary} not found. {install_instructions}")]
    NotFound {
        /// Name of the missing binary.
        binary: String,
        /// Platform-specific installation guidance.
        install_instructions: String,
    },
    /// The driver process could not be spawned.
    #[error("failed to start {binary}: {detail}")]
    StartFailed {
        /// Name of the driver binary.
        binary: String,
        /// Underlying error text.
        detail: String,
    },
    /// The driver never accepted a TCP connection within the start timeout.
    #[error("{binary} did not become healthy on port {port} within {timeout_ms}ms")]
    HealthCheckTimeout {
        /// Name of the driver binary.
        binary: String,
        /// Port probed.
        port: u16,
        /// Budget that elapsed.
        timeout_ms: u64,
    },
    /// `cargo install tauri-driver` failed.
    #[error("auto-install of {binary} failed: {detail}")]
    InstallFailed {
        /// Name of the driver binary.
        binary: String,
        /// Underlying error text.
        detail: String,
    },
    /// The host OS cannot run this driver stack at all.
    #[error("{0}")]
    UnsupportedPlatform(String),
}

/// Errors raised by `triggerDeeplink`.
#[derive(Debug, Error)]
pub enum DeeplinkError {
    /// Scheme is one of the disallowed web/file protocols.
    #[error("Invalid deeplink protocol: {0}")]
    InvalidProtocol(String),
    /// The command only exists on Electron sessions.
    #[error("triggerDeeplink is only available for Electron sessions")]
    UnsupportedFramework,
    /// The URL did not parse at all.
    #[error("Invalid deeplink URL: {0}")]
    MalformedUrl(String),
    /// Windows requires `appBinaryPath` so the running instance can be targeted.
    #[error("triggerDeeplink on Windows requires appBinaryPath to be configured")]
    MissingBinaryPath,
    /// The OS launcher command could not be spawned.
    #[error("failed to spawn deeplink command: {0}")]
    SpawnFailed(String),
    /// The launcher did not complete within the 5 s budget.
    #[error("deeplink command timed out")]
    Timeout,
}

/// Errors raised when executing user code in the target process.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// CDP never connected, so main-process execution is disabled.
    #[error(
        "CDP bridge unavailable: the Electron main process could not be reached, \
         so main-process execution is disabled for this session"
    )]
    BridgeUnavailable,
    /// `window.wdioTauri` was never injected into the frontend.
    #[error(
        "wdio Tauri plugin unavailable: window.wdioTauri is missing. \
         Register tauri-plugin-wdio in the app under test and grant its permissions"
    )]
    PluginUnavailable,
    /// The script threw inside the target process.
    #[error("script threw in target process: {0}")]
    Script(String),
    /// The script result was not JSON-serializable.
    #[error("script result is not serializable: {0}")]
    Serialization(String),
    /// The evaluation did not complete within the command timeout.
    #[error("execute timed out after {0}ms")]
    Timeout(u64),
}

/// Errors raised by the mock engine.
#[derive(Debug, Error)]
pub enum MockError {
    /// The API object does not exist in the target process.
    #[error("API '{0}' not found in target process")]
    ApiNotFound(String),
    /// The named member is missing or not a function.
    #[error("function '{func}' not found on API '{api}'")]
    FunctionNotFound {
        /// API object name.
        api: String,
        /// Member name.
        func: String,
    },
    /// Installing or querying the inner mock failed.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// Errors surfaced by the WebDriver REST client.
#[derive(Debug, Error)]
pub enum WebDriverError {
    /// Transport-level failure.
    #[error("WebDriver request failed: {0}")]
    Http(String),
    /// The remote end returned a WebDriver error payload.
    #[error("WebDriver error '{error}': {message}")]
    Protocol {
        /// WebDriver error code string.
        error: String,
        /// Human-readable message from the remote end.
        message: String,
    },
    /// No session established.
    #[error("no active WebDriver session")]
    NoSession,
}

/// Top-level service error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No build tool configuration was found in the project root.
    #[error(
        "NO_BUILD_TOOL: no Electron Forge, electron-builder, or Tauri configuration \
         found in {project_root}. Set appBinaryPath or add a build-tool config"
    )]
    NoBuildTool {
        /// Directory that was scanned.
        project_root: String,
    },
    /// More than one build tool matched; the choice would be ambiguous.
    #[error("MULTIPLE_BUILD_TOOLS: found {}: remove all but one, or set appBinaryPath", .tools.join(" and "))]
    MultipleBuildTools {
        /// Names of the conflicting build tools.
        tools: Vec<String>,
    },
    /// A build-tool configuration file exists but could not be parsed.
    #[error("failed to parse {tool} configuration: {detail}")]
    ConfigParse {
        /// Build tool whose config failed.
        tool: String,
        /// Parser error text.
        detail: String,
    },
    /// Every candidate binary path failed validation.
    #[error("app binary not found; attempted {} path(s): {}", .attempts.len(), format_attempts(.attempts))]
    BinaryNotFound {
        /// Full validation attempt log, in order.
        attempts: Vec<ValidationAttempt>,
    },
    /// A lifecycle hook was called out of order.
    #[error("invalid service lifecycle transition from {from} to {to}")]
    Lifecycle {
        /// State the service was in.
        from: &'static str,
        /// Hook that was attempted.
        to: &'static str,
    },
    /// Option validation failed before any work started.
    #[error("invalid service options: {0}")]
    InvalidOptions(String),
    /// Driver supervision failure.
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// Deeplink failure.
    #[error(transparent)]
    Deeplink(#[from] DeeplinkError),
    /// Execute failure.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    /// Mock engine failure.
    #[error(transparent)]
    Mock(#[from] MockError),
    /// WebDriver client failure.
    #[error(transparent)]
    WebDriver(#[from] WebDriverError),
    /// CDP bridge failure.
    #[error(transparent)]
    Cdp(#[from] crate::domain::cdp::CdpError),
    /// Filesystem failure outside path validation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_attempts(attempts: &[ValidationAttempt]) -> String {
    attempts
        .iter()
        .map(|a| match &a.error {
            Some(e) => format!("{} ({e})", a.path.display()),
            None => a.path.display().to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
