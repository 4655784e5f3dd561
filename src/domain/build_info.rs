// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Build-tool identification results.

use serde_json::Value;
use std::path::PathBuf;

/// Which packaging tool produced the app under test, with its parsed config.
///
/// Exactly one variant is ever identified for a project; zero or multiple
/// matches are errors raised by the config reader.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildTool {
    /// Electron Forge (`forge.config.*` or `package.json#config.forge`).
    Forge(Value),
    /// electron-builder (`electron-builder.*` or `package.json#build`).
    Builder(Value),
    /// Tauri (`src-tauri/tauri.conf.json`).
    Tauri(Value),
}

impl BuildTool {
    /// Human-readable tool name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Forge(_) => "forge",
            Self::Builder(_) => "electron-builder",
            Self::Tauri(_) => "tauri",
        }
    }

    /// Parsed configuration object.
    #[must_use]
    pub const fn config(&self) -> &Value {
        match self {
            Self::Forge(config) | Self::Builder(config) | Self::Tauri(config) => config,
        }
    }
}

/// Everything the binary resolver needs to know about the app build.
#[derive(Debug, Clone, PartialEq)]
pub struct AppBuildInfo {
    /// Identified build tool and its parsed config.
    pub tool: BuildTool,
    /// Resolved application name (raw, before per-OS normalization).
    pub app_name: String,
    /// Project root the config was read from.
    pub project_root: PathBuf,
}

/// Normalize an app name the way Linux packagers do: lowercase, spaces
/// collapsed to `-`. macOS and Windows keep the raw name.
#[must_use]
pub fn linux_binary_name(app_name: &str) -> String {
    app_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
