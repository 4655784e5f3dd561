// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! AppArmor userns profile installation for Ubuntu 24.04+.
//!
//! Ubuntu ≥24.04 restricts unprivileged user namespaces, which breaks the
//! Chromium sandbox inside Electron apps. The fix is a minimal AppArmor
//! profile granting `userns` to the app binary. Installation is opt-in and
//! best-effort: failures warn and the session continues unsandboxed.

use crate::domain::options::ApparmorMode;
use std::path::{Path, PathBuf};

/// Kernel switch that enables the restriction.
const RESTRICT_SWITCH: &str = "/proc/sys/kernel/apparmor_restrict_unprivileged_userns";

/// System profile directory.
const PROFILE_DIR: &str = "/etc/apparmor.d";

/// Whether this kernel restricts unprivileged user namespaces.
#[must_use]
pub fn userns_restriction_active() -> bool {
    restriction_active_from(|path| std::fs::read_to_string(path).ok())
}

fn restriction_active_from(read: impl Fn(&str) -> Option<String>) -> bool {
    read(RESTRICT_SWITCH).is_some_and(|value| value.trim() == "1")
}

/// Profile name derived from the binary path: path separators collapse to
/// dots, matching the convention AppArmor uses for its own shipped
/// profiles.
#[must_use]
pub fn profile_name_for(binary: &Path) -> String {
    let flattened = binary
        .to_string_lossy()
        .trim_matches('/')
        .replace(['/', '\\'], ".");
    format!("wdio.{flattened}")
}

/// Render the minimal userns profile for a binary.
#[must_use]
pub fn render_profile(binary: &Path) -> String {
    format!(
        "abi <abi/4.0>,\ninclude <tunables/global>\n\n\
         profile {name} \"{path}\" flags=(unconfined) {{\n  userns,\n}}\n",
        name = profile_name_for(binary),
        path = binary.display()
    )
}

/// Record of an installed profile, kept so `onComplete` can remove it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledProfile {
    /// File written under the profile directory.
    pub path: PathBuf,
}

/// Installs and removes userns profiles.
pub struct ApparmorInstaller {
    mode: ApparmorMode,
    profile_dir: PathBuf,
}

impl ApparmorInstaller {
    /// Installer against the system profile directory.
    #[must_use]
    pub fn new(mode: ApparmorMode) -> Self {
        Self {
            mode,
            profile_dir: PathBuf::from(PROFILE_DIR),
        }
    }

    /// Installer against an alternate directory (tests).
    #[must_use]
    pub fn with_profile_dir(mode: ApparmorMode, profile_dir: PathBuf) -> Self {
        Self { mode, profile_dir }
    }

    /// Install a profile for the app binary when the kernel requires one.
    ///
    /// Returns `None` when nothing was (or needed to be) installed. All
    /// failures are returned as strings for the caller to warn about —
    /// AppArmor trouble never aborts a session.
    ///
    /// # Errors
    ///
    /// A human-readable description of the failed step.
    pub fn install(&self, binary: &Path) -> Result<Option<InstalledProfile>, String> {
        if self.mode == ApparmorMode::Off || !userns_restriction_active() {
            return Ok(None);
        }

        let path = self.profile_dir.join(profile_name_for(binary));
        std::fs::write(&path, render_profile(binary))
            .map_err(|e| format!("could not write AppArmor profile {}: {e}", path.display()))?;

        self.run_parser(&["-r"], &path)?;
        Ok(Some(InstalledProfile { path }))
    }

    /// Remove a previously installed profile. Best-effort.
    pub fn remove(&self, profile: &InstalledProfile) {
        let _ = self.run_parser(&["-R"], &profile.path);
        let _ = std::fs::remove_file(&profile.path);
    }

    fn run_parser(&self, flags: &[&str], profile_path: &Path) -> Result<(), String> {
        let mut command = if self.mode == ApparmorMode::Sudo && !is_root() {
            let mut sudo = std::process::Command::new("sudo");
            sudo.arg("-n").arg("apparmor_parser");
            sudo
        } else {
            std::process::Command::new("apparmor_parser")
        };
        command.args(flags).arg(profile_path);

        let output = command
            .output()
            .map_err(|e| format!("apparmor_parser could not run: {e}"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "apparmor_parser failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

#[cfg(unix)]
fn is_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    // /proc/self is owned by the effective uid.
    std::fs::metadata("/proc/self").is_ok_and(|m| m.uid() == 0)
}

#[cfg(not(unix))]
const fn is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restriction_detection() {
        assert!(restriction_active_from(|_| Some("1\n".to_string())));
        assert!(!restriction_active_from(|_| Some("0\n".to_string())));
        assert!(!restriction_active_from(|_| None));
    }

    #[test]
    fn test_profile_name_flattens_path() {
        let name = profile_name_for(Path::new("/opt/apps/my-app/my-app"));
        assert_eq!(name, "wdio.opt.apps.my-app.my-app");
    }

    #[test]
    fn test_rendered_profile_grants_userns() {
        let profile = render_profile(Path::new("/opt/my-app"));
        assert!(profile.contains("profile wdio.opt.my-app \"/opt/my-app\""));
        assert!(profile.contains("userns,"));
        assert!(profile.contains("flags=(unconfined)"));
    }

    #[test]
    fn test_install_off_mode_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let installer =
            ApparmorInstaller::with_profile_dir(ApparmorMode::Off, dir.path().to_path_buf());

        let installed = installer.install(Path::new("/opt/my-app")).unwrap();
        assert_eq!(installed, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
