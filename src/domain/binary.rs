// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Binary path candidates and validation results.
//!
//! Candidate generation is a pure function of the build tool, the target
//! platform, and the resolved app name. Validation against the real
//! filesystem lives in the infrastructure layer; this module only defines
//! the shapes and the candidate tables.

use crate::domain::build_info::{AppBuildInfo, BuildTool, linux_binary_name};
use std::path::PathBuf;
use thiserror::Error;

/// Operating system of the machine running the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
}

/// CPU architecture of the machine running the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// x86-64.
    X64,
    /// AArch64.
    Arm64,
}

impl Arch {
    /// Token used in Forge output directory names (`darwin-x64`, …).
    #[must_use]
    pub const fn forge_token(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

/// Target platform, detected from the running process or injected in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Detect the platform from `std::env::consts`.
    ///
    /// Unknown architectures fall back to x64, matching what prebuilt app
    /// bundles target.
    #[must_use]
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            _ => Os::Linux,
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" => Arch::Arm64,
            _ => Arch::X64,
        };
        Self { os, arch }
    }
}

/// Debug vs release bundle selection (Tauri only; Electron tools have a
/// single output layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// `target/release` bundles.
    #[default]
    Release,
    /// `target/debug` bundles.
    Debug,
}

impl BuildType {
    const fn dir(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Debug => "debug",
        }
    }
}

/// Why a candidate path failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathValidationError {
    /// Nothing exists at the path.
    #[error("FILE_NOT_FOUND")]
    FileNotFound,
    /// The path is a directory, not a binary.
    #[error("IS_DIRECTORY")]
    IsDirectory,
    /// The file exists but is not executable.
    #[error("NOT_EXECUTABLE")]
    NotExecutable,
    /// The file exists but could not be inspected.
    #[error("PERMISSION_DENIED")]
    PermissionDenied,
    /// Any other filesystem error.
    #[error("ACCESS_ERROR: {0}")]
    AccessError(String),
}

/// One entry in the validation attempt log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationAttempt {
    /// Candidate path that was probed.
    pub path: PathBuf,
    /// Whether the candidate passed every check.
    pub valid: bool,
    /// Failure reason when `valid` is false.
    pub error: Option<PathValidationError>,
}

/// Outcome of binary resolution. Even on success the full attempt log is
/// kept for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryPathResult {
    /// Whether any candidate passed validation.
    pub success: bool,
    /// First candidate that passed, when `success`.
    pub binary_path: Option<PathBuf>,
    /// Candidate-generation problems, in order.
    pub generation_errors: Vec<String>,
    /// Every validation attempt, in candidate order.
    pub attempts: Vec<ValidationAttempt>,
}

/// Generate the ordered list of well-known output paths for a build.
///
/// Paths are relative to the project root. The first candidate that passes
/// filesystem validation wins.
#[must_use]
pub fn candidate_paths(
    build_info: &AppBuildInfo,
    platform: Platform,
    build_type: BuildType,
) -> Vec<PathBuf> {
    let name = &build_info.app_name;
    match &build_info.tool {
        BuildTool::Builder(_) => builder_candidates(name, platform),
        BuildTool::Forge(_) => forge_candidates(name, platform),
        BuildTool::Tauri(_) => tauri_candidates(name, platform, build_type),
    }
}

fn builder_candidates(name: &str, platform: Platform) -> Vec<PathBuf> {
    match platform.os {
        Os::MacOs => {
            let mac_binary = |dir: &str| {
                PathBuf::from(format!(
                    "dist/{dir}/{name}.app/Contents/MacOS/{name}"
                ))
            };
            match platform.arch {
                Arch::Arm64 => vec![
                    mac_binary("mac-arm64"),
                    mac_binary("mac-universal"),
                    mac_binary("mac"),
                ],
                Arch::X64 => vec![
                    mac_binary("mac"),
                    mac_binary("mac-universal"),
                    mac_binary("mac-x64"),
                ],
            }
        }
        Os::Linux => vec![PathBuf::from(format!(
            "dist/linux-unpacked/{}",
            linux_binary_name(name)
        ))],
        Os::Windows => vec![PathBuf::from(format!("dist/win-unpacked/{name}.exe"))],
    }
}

fn forge_candidates(name: &str, platform: Platform) -> Vec<PathBuf> {
    let arch = platform.arch.forge_token();
    match platform.os {
        Os::MacOs => vec![PathBuf::from(format!(
            "out/{name}-darwin-{arch}/{name}.app/Contents/MacOS/{name}"
        ))],
        Os::Linux => vec![PathBuf::from(format!("out/{name}-linux-{arch}/{name}"))],
        Os::Windows => vec![PathBuf::from(format!("out/{name}-win32-{arch}/{name}.exe"))],
    }
}

fn tauri_candidates(name: &str, platform: Platform, build_type: BuildType) -> Vec<PathBuf> {
    let dir = build_type.dir();
    match platform.os {
        Os::MacOs => vec![
            PathBuf::from(format!(
                "src-tauri/target/{dir}/bundle/macos/{name}.app/Contents/MacOS/{name}"
            )),
            PathBuf::from(format!("src-tauri/target/{dir}/{name}")),
        ],
        Os::Linux => vec![PathBuf::from(format!("src-tauri/target/{dir}/{name}"))],
        Os::Windows => vec![PathBuf::from(format!("src-tauri/target/{dir}/{name}.exe"))],
    }
}
