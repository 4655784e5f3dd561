// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! tauri-driver process supervision.
//!
//! Locates (or installs) the tauri-driver binary, spawns it with piped
//! output, health-checks the WebDriver port, and tears the process down
//! with an escalating TERM → KILL sequence.

use crate::domain::errors::DriverError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::broadcast;

/// Grace period between SIGTERM and SIGKILL on stop.
const STOP_GRACE: Duration = Duration::from_secs(3);

/// Interval between TCP health-check probes.
const HEALTH_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Locate the tauri-driver binary.
///
/// Order: explicit option path, `PATH`, then `~/.cargo/bin`.
#[must_use]
pub fn locate_tauri_driver(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        return path.is_file().then_some(path);
    }
    if let Ok(path) = which::which("tauri-driver") {
        return Some(path);
    }
    let cargo_bin = dirs::home_dir()?.join(".cargo").join("bin").join(binary_name());
    cargo_bin.is_file().then_some(cargo_bin)
}

const fn binary_name() -> &'static str {
    if cfg!(windows) {
        "tauri-driver.exe"
    } else {
        "tauri-driver"
    }
}

/// Run `cargo install tauri-driver`, blocking until it finishes.
///
/// Deliberately synchronous: auto-install is a one-time, user-opted-in
/// prepare step.
///
/// # Errors
///
/// [`DriverError::InstallFailed`] when cargo is missing or the install
/// exits nonzero.
pub fn install_tauri_driver() -> Result<(), DriverError> {
    let cargo = which::which("cargo").map_err(|_| DriverError::InstallFailed {
        binary: "tauri-driver".to_string(),
        detail: "cargo not found on PATH".to_string(),
    })?;

    let output = std::process::Command::new(cargo)
        .args(["install", "tauri-driver", "--locked"])
        .output()
        .map_err(|e| DriverError::InstallFailed {
            binary: "tauri-driver".to_string(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(DriverError::InstallFailed {
            binary: "tauri-driver".to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Supervisor for one tauri-driver process.
pub struct TauriDriverSupervisor {
    binary: PathBuf,
    port: u16,
    child: Option<Child>,
    log_tx: broadcast::Sender<String>,
}

impl TauriDriverSupervisor {
    /// Supervisor for a located binary; nothing is spawned yet.
    #[must_use]
    pub fn new(binary: PathBuf, port: u16) -> Self {
        let (log_tx, _) = broadcast::channel(256);
        Self {
            binary,
            port,
            child: None,
            log_tx,
        }
    }

    /// Port the driver will serve on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Subscribe to the driver's combined stdout/stderr lines.
    #[must_use]
    pub fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }

    /// Spawn the driver and wait until its port accepts connections.
    ///
    /// # Errors
    ///
    /// [`DriverError::StartFailed`] when the spawn fails,
    /// [`DriverError::HealthCheckTimeout`] when the port never opens within
    /// `start_timeout`.
    pub async fn start(
        &mut self,
        native_driver: Option<&PathBuf>,
        start_timeout: Duration,
    ) -> Result<(), DriverError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("--port")
            .arg(self.port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(driver) = native_driver {
            command.arg("--native-driver").arg(driver);
        }

        let mut child = command.spawn().map_err(|e| DriverError::StartFailed {
            binary: self.binary.display().to_string(),
            detail: e.to_string(),
        })?;

        if let Some(stdout) = child.stdout.take() {
            Self::pump_lines(stdout, self.log_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            Self::pump_lines(stderr, self.log_tx.clone());
        }
        self.child = Some(child);

        match wait_for_port(self.port, start_timeout).await {
            Ok(()) => Ok(()),
            Err(()) => {
                self.stop().await;
                Err(DriverError::HealthCheckTimeout {
                    binary: self.binary.display().to_string(),
                    port: self.port,
                    timeout_ms: u64::try_from(start_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    fn pump_lines(
        stream: impl tokio::io::AsyncRead + Unpin + Send + 'static,
        tx: broadcast::Sender<String>,
    ) {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                // No subscribers is fine; logs are best-effort.
                let _ = tx.send(line);
            }
        });
    }

    /// Stop the driver: TERM, wait out the grace period, then KILL.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        terminate_gracefully(&child);
        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                let _ = child.kill().await;
            }
        }
    }

    /// Whether the supervised process is currently running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

#[cfg(unix)]
fn terminate_gracefully(child: &Child) {
    // SIGTERM without libc: the kill(1) utility is part of POSIX.
    if let Some(pid) = child.id() {
        let _ = std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .status();
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(_child: &Child) {
    // Windows has no TERM equivalent; the KILL fallback does the work.
}

/// Probe `127.0.0.1:{port}` until it accepts or the budget elapses.
pub(crate) async fn wait_for_port(port: u16, budget: Duration) -> Result<(), ()> {
    let deadline = tokio::time::Instant::now() + budget;
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(());
        }
        tokio::time::sleep(HEALTH_PROBE_INTERVAL).await;
    }
}
