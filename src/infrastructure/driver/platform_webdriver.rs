// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Platform WebDriver detection.
//!
//! tauri-driver proxies to a native WebDriver: `WebKitWebDriver` on Linux,
//! `msedgedriver` on Windows (shipped with Edge WebView2). macOS has no
//! supported driver, which is an upstream limitation we propagate.

use crate::domain::binary::{Os, Platform};
use std::path::{Path, PathBuf};

/// Fixed locations probed when `WebKitWebDriver` is not on `PATH`.
const WEBKIT_FALLBACK_PATHS: &[&str] = &[
    "/usr/bin/WebKitWebDriver",
    "/usr/local/bin/WebKitWebDriver",
    "/usr/lib/webkit2gtk-4.0/WebKitWebDriver",
    "/usr/lib/webkit2gtk-4.1/WebKitWebDriver",
];

/// Linux package managers we can derive install instructions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian/Ubuntu.
    Apt,
    /// Fedora.
    Dnf,
    /// RHEL/CentOS.
    Yum,
    /// openSUSE.
    Zypper,
    /// Arch.
    Pacman,
    /// Alpine.
    Apk,
    /// Void.
    Xbps,
}

impl PackageManager {
    /// Shell command installing the WebKit WebDriver package.
    #[must_use]
    pub const fn webkit_install_command(self) -> &'static str {
        match self {
            Self::Apt => "sudo apt-get install -y webkit2gtk-driver",
            Self::Dnf => "sudo dnf install -y webkit2gtk4.1-devel",
            Self::Yum => "sudo yum install -y webkit2gtk4.1-devel",
            Self::Zypper => "sudo zypper install -y webkit2gtk4-webdriver",
            Self::Pacman => "sudo pacman -S --noconfirm webkit2gtk-4.1",
            Self::Apk => "sudo apk add webkit2gtk-dev",
            Self::Xbps => "sudo xbps-install -y webkit2gtk",
        }
    }
}

/// Detect the system package manager. Defaults to apt when nothing known is
/// found.
#[must_use]
pub fn detect_package_manager() -> PackageManager {
    detect_package_manager_with(|name| which::which(name).is_ok())
}

fn detect_package_manager_with(available: impl Fn(&str) -> bool) -> PackageManager {
    let probes: &[(&str, PackageManager)] = &[
        ("apt-get", PackageManager::Apt),
        ("dnf", PackageManager::Dnf),
        ("yum", PackageManager::Yum),
        ("zypper", PackageManager::Zypper),
        ("pacman", PackageManager::Pacman),
        ("apk", PackageManager::Apk),
        ("xbps-install", PackageManager::Xbps),
    ];
    probes
        .iter()
        .find(|(name, _)| available(name))
        .map_or(PackageManager::Apt, |(_, manager)| *manager)
}

/// Outcome of a platform WebDriver probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDriverCheck {
    /// Whether a usable driver was found (or is assumed present).
    pub success: bool,
    /// Resolved driver path, when one was located on disk.
    pub path: Option<PathBuf>,
    /// What went wrong, when `success` is false.
    pub error: Option<String>,
    /// How to fix it, when `success` is false.
    pub install_instructions: Option<String>,
}

impl PlatformDriverCheck {
    fn found(path: Option<PathBuf>) -> Self {
        Self {
            success: true,
            path,
            error: None,
            install_instructions: None,
        }
    }

    fn missing(error: String, install_instructions: String) -> Self {
        Self {
            success: false,
            path: None,
            error: Some(error),
            install_instructions: Some(install_instructions),
        }
    }
}

/// Probe for the platform WebDriver required by tauri-driver.
///
/// # Errors
///
/// [`crate::domain::errors::DriverError::UnsupportedPlatform`] on macOS,
/// where no Tauri WebDriver exists.
pub fn check_platform_webdriver(
    platform: Platform,
) -> Result<PlatformDriverCheck, crate::domain::errors::DriverError> {
    match platform.os {
        Os::Linux => Ok(check_webkit_webdriver()),
        // Edge WebView2 ships msedgedriver; tauri-driver finds it itself.
        Os::Windows => Ok(PlatformDriverCheck::found(None)),
        Os::MacOs => Err(crate::domain::errors::DriverError::UnsupportedPlatform(
            "tauri-driver does not support macOS: WKWebView exposes no WebDriver endpoint"
                .to_string(),
        )),
    }
}

fn check_webkit_webdriver() -> PlatformDriverCheck {
    locate_webkit_webdriver(
        |name| which::which(name).ok(),
        |path| path.is_file(),
    )
    .map_or_else(
        || {
            let manager = detect_package_manager();
            PlatformDriverCheck::missing(
                "WebKitWebDriver not found".to_string(),
                format!(
                    "Install the WebKit WebDriver package: {}",
                    manager.webkit_install_command()
                ),
            )
        },
        |path| PlatformDriverCheck::found(Some(path)),
    )
}

fn locate_webkit_webdriver(
    which_lookup: impl Fn(&str) -> Option<PathBuf>,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    if let Some(path) = which_lookup("WebKitWebDriver") {
        return Some(path);
    }
    WEBKIT_FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| exists(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::binary::Arch;

    #[test]
    fn test_package_manager_detection_order() {
        // dnf present but apt absent selects dnf.
        let manager = detect_package_manager_with(|name| name == "dnf");
        assert_eq!(manager, PackageManager::Dnf);
    }

    #[test]
    fn test_package_manager_defaults_to_apt() {
        let manager = detect_package_manager_with(|_| false);
        assert_eq!(manager, PackageManager::Apt);
    }

    #[test]
    fn test_webkit_lookup_prefers_which() {
        let located = locate_webkit_webdriver(
            |_| Some(PathBuf::from("/from/which/WebKitWebDriver")),
            |_| true,
        );
        assert_eq!(located, Some(PathBuf::from("/from/which/WebKitWebDriver")));
    }

    #[test]
    fn test_webkit_lookup_falls_back_to_fixed_paths() {
        let located = locate_webkit_webdriver(
            |_| None,
            |path| path == Path::new("/usr/lib/webkit2gtk-4.1/WebKitWebDriver"),
        );
        assert_eq!(
            located,
            Some(PathBuf::from("/usr/lib/webkit2gtk-4.1/WebKitWebDriver"))
        );
    }

    #[test]
    fn test_webkit_lookup_exhausted() {
        assert_eq!(locate_webkit_webdriver(|_| None, |_| false), None);
    }

    #[test]
    fn test_macos_is_unsupported() {
        let err = check_platform_webdriver(Platform {
            os: Os::MacOs,
            arch: Arch::Arm64,
        })
        .unwrap_err();
        assert!(err.to_string().contains("macOS"));
    }

    #[test]
    fn test_windows_assumes_msedgedriver() {
        let check = check_platform_webdriver(Platform {
            os: Os::Windows,
            arch: Arch::X64,
        })
        .unwrap();
        assert!(check.success);
        assert_eq!(check.path, None);
    }

    #[test]
    fn test_install_commands_name_the_manager() {
        assert!(
            PackageManager::Pacman
                .webkit_install_command()
                .contains("pacman")
        );
        assert!(PackageManager::Apk.webkit_install_command().contains("apk add"));
    }
}
