// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Service options and capability-level merging.
//!
//! Options arrive from two places: the service-level configuration and the
//! `wdio:electronServiceOptions` / `wdio:tauriServiceOptions` entry on a
//! capability. Capability-level values win. The merged result is immutable
//! for the lifetime of the worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which desktop framework a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// Electron app driven through Chromedriver + the CDP bridge.
    Electron,
    /// Tauri app driven through tauri-driver + the in-app plugin.
    Tauri,
}

impl Framework {
    /// Capability key carrying this framework's service options.
    #[must_use]
    pub const fn capability_key(self) -> &'static str {
        match self {
            Self::Electron => "wdio:electronServiceOptions",
            Self::Tauri => "wdio:tauriServiceOptions",
        }
    }

    /// Prefix used when forwarding captured logs (`[Electron:MainProcess]`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electron => "Electron",
            Self::Tauri => "Tauri",
        }
    }
}

/// AppArmor auto-install behavior on Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApparmorMode {
    /// Never touch AppArmor.
    #[default]
    Off,
    /// Install the profile directly (requires root).
    Install,
    /// Install through `sudo -n`.
    Sudo,
}

impl<'de> Deserialize<'de> for ApparmorMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Accepts `false`, `true`, or `"sudo"`.
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Bool(false) => Ok(Self::Off),
            Value::Bool(true) => Ok(Self::Install),
            Value::String(s) if s == "sudo" => Ok(Self::Sudo),
            other => Err(serde::de::Error::custom(format!(
                "apparmorAutoInstall must be false, true, or \"sudo\", got {other}"
            ))),
        }
    }
}

impl Serialize for ApparmorMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Off => serializer.serialize_bool(false),
            Self::Install => serializer.serialize_bool(true),
            Self::Sudo => serializer.serialize_str("sudo"),
        }
    }
}

/// Minimum level for one log-capture source. `None` disables the source.
pub type CaptureLevel = Option<crate::domain::logs::LogLevel>;

/// Per-worker service options.
///
/// All fields are optional in the serialized form; [`ServiceOptions::merge`]
/// layers capability-level values over service-level ones and the accessor
/// methods apply defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOptions {
    /// Path to the built app binary. Skips build-tool detection when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_binary_path: Option<String>,
    /// Electron only: run an unpackaged app from this entry point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_entry_point: Option<String>,
    /// Extra arguments appended to the app launch command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_args: Option<Vec<String>>,

    /// Total budget for establishing the CDP bridge, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdp_bridge_timeout: Option<u64>,
    /// Delay between CDP connection attempts, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdp_bridge_wait_interval: Option<u64>,
    /// Number of CDP connection attempts before giving up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdp_bridge_retry_count: Option<u32>,
    /// Deadline for a single in-flight command, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<u64>,
    /// Deadline for external driver startup, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timeout: Option<u64>,

    /// Call `mockClear` on every registered mock before each test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_mocks: Option<bool>,
    /// Call `mockReset` on every registered mock before each test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_mocks: Option<bool>,
    /// Call `mockRestore` on every registered mock before each test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_mocks: Option<bool>,

    /// Minimum level for Electron main-process log capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_main_process_logs: CaptureLevel,
    /// Minimum level for Electron renderer log capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_renderer_logs: CaptureLevel,
    /// Minimum level for Tauri backend log capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_backend_logs: CaptureLevel,
    /// Minimum level for Tauri frontend log capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_frontend_logs: CaptureLevel,
    /// Standalone only: directory receiving `wdio-{timestamp}.log` files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Which bundle flavor the binary resolver looks for (Tauri).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_build_type: Option<crate::domain::binary::BuildType>,

    /// Port tauri-driver listens on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tauri_driver_port: Option<u16>,
    /// Explicit path to the tauri-driver binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tauri_driver_path: Option<String>,
    /// Run `cargo install tauri-driver` when the binary is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_install_tauri_driver: Option<bool>,

    /// Linux: install a minimal AppArmor userns profile for the app binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparmor_auto_install: Option<ApparmorMode>,
}

/// Default total CDP bridge budget (ms).
pub const DEFAULT_CDP_BRIDGE_TIMEOUT_MS: u64 = 10_000;
/// Default delay between CDP connection attempts (ms).
pub const DEFAULT_CDP_WAIT_INTERVAL_MS: u64 = 100;
/// Default number of CDP connection attempts.
pub const DEFAULT_CDP_RETRY_COUNT: u32 = 10;
/// Default in-flight command deadline (ms).
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 15_000;
/// Default external driver startup deadline (ms).
pub const DEFAULT_START_TIMEOUT_MS: u64 = 30_000;
/// Default tauri-driver port.
pub const DEFAULT_TAURI_DRIVER_PORT: u16 = 4444;

impl ServiceOptions {
    /// Layer `capability` over `self`, field by field. Capability wins.
    #[must_use]
    pub fn merge(&self, capability: &Self) -> Self {
        macro_rules! pick {
            ($field:ident) => {
                capability.$field.clone().or_else(|| self.$field.clone())
            };
        }
        Self {
            app_binary_path: pick!(app_binary_path),
            app_entry_point: pick!(app_entry_point),
            app_args: pick!(app_args),
            cdp_bridge_timeout: pick!(cdp_bridge_timeout),
            cdp_bridge_wait_interval: pick!(cdp_bridge_wait_interval),
            cdp_bridge_retry_count: pick!(cdp_bridge_retry_count),
            command_timeout: pick!(command_timeout),
            start_timeout: pick!(start_timeout),
            clear_mocks: pick!(clear_mocks),
            reset_mocks: pick!(reset_mocks),
            restore_mocks: pick!(restore_mocks),
            capture_main_process_logs: pick!(capture_main_process_logs),
            capture_renderer_logs: pick!(capture_renderer_logs),
            capture_backend_logs: pick!(capture_backend_logs),
            capture_frontend_logs: pick!(capture_frontend_logs),
            log_dir: pick!(log_dir),
            app_build_type: pick!(app_build_type),
            tauri_driver_port: pick!(tauri_driver_port),
            tauri_driver_path: pick!(tauri_driver_path),
            auto_install_tauri_driver: pick!(auto_install_tauri_driver),
            apparmor_auto_install: pick!(apparmor_auto_install),
        }
    }

    /// Extract the framework-specific options object from a capability, if
    /// present, and merge it over `self`.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error text when the capability entry is
    /// present but malformed.
    pub fn merge_from_capability(
        &self,
        framework: Framework,
        capability: &Value,
    ) -> Result<Self, String> {
        match capability.get(framework.capability_key()) {
            None => Ok(self.clone()),
            Some(raw) => {
                let cap_opts: Self = serde_json::from_value(raw.clone()).map_err(|e| {
                    format!("invalid {}: {e}", framework.capability_key())
                })?;
                Ok(self.merge(&cap_opts))
            }
        }
    }

    /// CDP bridge budget with default applied.
    #[must_use]
    pub fn cdp_bridge_timeout_ms(&self) -> u64 {
        self.cdp_bridge_timeout.unwrap_or(DEFAULT_CDP_BRIDGE_TIMEOUT_MS)
    }

    /// CDP retry interval with default applied.
    #[must_use]
    pub fn cdp_wait_interval_ms(&self) -> u64 {
        self.cdp_bridge_wait_interval
            .unwrap_or(DEFAULT_CDP_WAIT_INTERVAL_MS)
    }

    /// CDP retry count with default applied.
    #[must_use]
    pub fn cdp_retry_count(&self) -> u32 {
        self.cdp_bridge_retry_count.unwrap_or(DEFAULT_CDP_RETRY_COUNT)
    }

    /// In-flight command deadline with default applied.
    #[must_use]
    pub fn command_timeout_ms(&self) -> u64 {
        self.command_timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS)
    }

    /// Driver startup deadline with default applied.
    #[must_use]
    pub fn start_timeout_ms(&self) -> u64 {
        self.start_timeout.unwrap_or(DEFAULT_START_TIMEOUT_MS)
    }

    /// tauri-driver port with default applied.
    #[must_use]
    pub fn tauri_driver_port(&self) -> u16 {
        self.tauri_driver_port.unwrap_or(DEFAULT_TAURI_DRIVER_PORT)
    }
}

/// Determine the framework from a capability's `browserName`.
///
/// `"electron"` selects Electron; `"tauri"`, `"wry"`, or an absent
/// `browserName` select Tauri (the native driver does not understand these
/// values, so they are normalized away before the capability is forwarded).
#[must_use]
pub fn framework_from_capability(capability: &Value) -> Option<Framework> {
    match capability.get("browserName").and_then(Value::as_str) {
        Some("electron") => Some(Framework::Electron),
        Some("tauri" | "wry") | None => Some(Framework::Tauri),
        Some(_) => None,
    }
}
