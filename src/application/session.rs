// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Standalone session bootstrapping.
//!
//! Outside a test runner there is nobody to drive the service lifecycle,
//! so [`start_session`] performs the same prepare + before sequence the
//! runner would: resolve the binary, start the driver stack, create the
//! WebDriver session, and wire the command surface. Log capture writes to
//! a file sink when `logDir` is configured and is silently disabled
//! otherwise (there is no runner logger to forward to).

use crate::application::browser::DesktopBrowser;
use crate::application::service::{DesktopService, NamedCapability};
use crate::domain::binary::Platform;
use crate::domain::errors::DriverError;
use crate::domain::options::{Framework, ServiceOptions};
use crate::domain::session_port::DriverSession;
use crate::infrastructure::driver::tauri_driver::wait_for_port;
use crate::infrastructure::logging::{FileSink, LogSink, TracingSink, init_logging};
use crate::infrastructure::webdriver::HttpDriverSession;
use anyhow::Context;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A session created without a test runner.
pub struct StandaloneSession {
    /// One command surface per capability.
    pub browsers: Vec<DesktopBrowser>,
    service: DesktopService,
    chromedriver: Option<tokio::process::Child>,
    log_file: Option<PathBuf>,
}

impl std::fmt::Debug for StandaloneSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandaloneSession")
            .field("log_file", &self.log_file)
            .finish_non_exhaustive()
    }
}

impl StandaloneSession {
    /// The single browser of a non-multiremote session.
    #[must_use]
    pub fn browser(&self) -> Option<&DesktopBrowser> {
        self.browsers.first()
    }

    /// Path of the standalone log file, when `logDir` was configured.
    #[must_use]
    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }
}

/// Create a driver session and attach the service to it.
///
/// `driver_url` points at an already-running WebDriver server; when absent
/// the driver stack is started here (tauri-driver for Tauri, a PATH
/// `chromedriver` for Electron).
///
/// # Errors
///
/// Anything the runner-driven prepare/before sequence treats as fatal.
pub async fn start_session(
    capabilities: Vec<Value>,
    options: ServiceOptions,
    driver_url: Option<String>,
) -> anyhow::Result<StandaloneSession> {
    init_logging();

    let log_file;
    let sink: Arc<dyn LogSink> = match &options.log_dir {
        Some(dir) => {
            let file_sink =
                FileSink::create(std::path::Path::new(dir)).context("creating standalone log file")?;
            log_file = Some(file_sink.path().to_path_buf());
            Arc::new(file_sink)
        }
        None => {
            log_file = None;
            Arc::new(TracingSink)
        }
    };

    // Without a log file there is no standalone sink; capture is silently
    // disabled rather than forwarded nowhere.
    let options = if options.log_dir.is_some() {
        options
    } else {
        ServiceOptions {
            capture_main_process_logs: None,
            capture_renderer_logs: None,
            capture_backend_logs: None,
            capture_frontend_logs: None,
            ..options
        }
    };

    let project_root = std::env::current_dir().context("reading working directory")?;
    let mut service = DesktopService::with_platform_and_sink(
        options.clone(),
        &project_root,
        Platform::detect(),
        sink,
    );

    let mut named: Vec<NamedCapability> = capabilities
        .into_iter()
        .map(|capability| NamedCapability {
            name: None,
            capability,
        })
        .collect();
    service.on_prepare(&mut named).await?;

    // Read the framework from the prepared state: onPrepare has already
    // rewritten `browserName` for the native driver.
    let framework = service
        .prepared_capabilities()
        .first()
        .map_or(Framework::Electron, |prepared| prepared.framework);

    let mut chromedriver = None;
    let endpoint = match driver_url {
        Some(url) => url,
        None => match framework {
            Framework::Tauri => format!("http://127.0.0.1:{}", options.tauri_driver_port()),
            Framework::Electron => {
                let (child, url) = spawn_chromedriver(options.start_timeout_ms()).await?;
                chromedriver = Some(child);
                url
            }
        },
    };

    let mut sessions: Vec<(Option<String>, Arc<dyn DriverSession>)> = Vec::new();
    for named_capability in &named {
        let session = HttpDriverSession::new_session(&endpoint, named_capability.capability.clone())
            .await
            .context("creating WebDriver session")?;
        sessions.push((None, Arc::new(session)));
    }

    let browsers = service.before(sessions).await?;
    Ok(StandaloneSession {
        browsers,
        service,
        chromedriver,
        log_file,
    })
}

/// Tear a standalone session down: run the after + onComplete sequence,
/// end the WebDriver sessions, and stop any driver started here.
pub async fn cleanup_session(mut session: StandaloneSession) {
    for browser in &session.browsers {
        let _ = browser.session().delete_session().await;
    }
    session.service.after().await;
    session.service.on_complete().await;
    if let Some(mut child) = session.chromedriver.take() {
        let _ = child.kill().await;
    }
}

/// Spawn a PATH-resolved chromedriver on an ephemeral port.
async fn spawn_chromedriver(
    start_timeout_ms: u64,
) -> Result<(tokio::process::Child, String), DriverError> {
    let binary = which::which("chromedriver").map_err(|_| DriverError::NotFound {
        binary: "chromedriver".to_string(),
        install_instructions:
            "install chromedriver matching the app's Electron version, or pass driver_url"
                .to_string(),
    })?;

    let port = {
        let listener =
            std::net::TcpListener::bind(("127.0.0.1", 0)).map_err(|e| DriverError::StartFailed {
                binary: "chromedriver".to_string(),
                detail: e.to_string(),
            })?;
        listener
            .local_addr()
            .map_err(|e| DriverError::StartFailed {
                binary: "chromedriver".to_string(),
                detail: e.to_string(),
            })?
            .port()
    };

    let child = tokio::process::Command::new(&binary)
        .arg(format!("--port={port}"))
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DriverError::StartFailed {
            binary: binary.display().to_string(),
            detail: e.to_string(),
        })?;

    wait_for_port(port, Duration::from_millis(start_timeout_ms))
        .await
        .map_err(|()| DriverError::HealthCheckTimeout {
            binary: "chromedriver".to_string(),
            port,
            timeout_ms: start_timeout_ms,
        })?;

    Ok((child, format!("http://127.0.0.1:{port}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_start_session_surfaces_prepare_failures() {
        // No build tool in the working directory and no binary configured:
        // the prepare step's fatal error must reach the caller.
        let err = start_session(
            vec![json!({"browserName": "electron"})],
            ServiceOptions {
                app_binary_path: Some("/definitely/not/a/binary".to_string()),
                ..Default::default()
            },
            Some("http://127.0.0.1:1".to_string()),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("binary not found"));
    }

    #[test]
    fn test_capture_disabled_without_log_dir() {
        // The option stripping is what guarantees "silently disabled".
        let options = ServiceOptions {
            capture_backend_logs: Some(crate::domain::logs::LogLevel::Info),
            log_dir: None,
            ..Default::default()
        };
        let stripped = if options.log_dir.is_some() {
            options
        } else {
            ServiceOptions {
                capture_main_process_logs: None,
                capture_renderer_logs: None,
                capture_backend_logs: None,
                capture_frontend_logs: None,
                ..options
            }
        };
        assert_eq!(stripped.capture_backend_logs, None);
    }
}
