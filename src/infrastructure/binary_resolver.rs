// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Candidate binary validation against the real filesystem.
//!
//! Candidate generation is pure (`domain::binary`); this adapter probes
//! each candidate in order and records every attempt, success or not, so a
//! failed resolution can be diagnosed from the result alone.

use crate::domain::binary::{
    BinaryPathResult, BuildType, Os, PathValidationError, Platform, ValidationAttempt,
    candidate_paths,
};
use crate::domain::build_info::AppBuildInfo;
use std::path::{Path, PathBuf};

/// Resolve the app binary from build info: generate candidates, validate
/// each in order, first valid path wins.
#[must_use]
pub fn resolve(
    project_root: &Path,
    build_info: &AppBuildInfo,
    platform: Platform,
    build_type: BuildType,
) -> BinaryPathResult {
    let candidates: Vec<PathBuf> = candidate_paths(build_info, platform, build_type)
        .into_iter()
        .map(|rel| project_root.join(rel))
        .collect();
    validate_candidates(&candidates, platform.os)
}

/// Resolve an explicitly configured `appBinaryPath`.
#[must_use]
pub fn resolve_explicit(path: &Path, platform: Platform) -> BinaryPathResult {
    validate_candidates(std::slice::from_ref(&path.to_path_buf()), platform.os)
}

fn validate_candidates(candidates: &[PathBuf], os: Os) -> BinaryPathResult {
    let mut result = BinaryPathResult::default();

    for candidate in candidates {
        match validate_candidate(candidate, os) {
            Ok(()) => {
                result.attempts.push(ValidationAttempt {
                    path: candidate.clone(),
                    valid: true,
                    error: None,
                });
                if !result.success {
                    result.success = true;
                    result.binary_path = Some(candidate.clone());
                }
            }
            Err(error) => {
                result.attempts.push(ValidationAttempt {
                    path: candidate.clone(),
                    valid: false,
                    error: Some(error),
                });
            }
        }
    }

    result
}

/// Validate one candidate: exists, is a regular file, is executable.
///
/// # Errors
///
/// The first failing check, as a [`PathValidationError`].
pub fn validate_candidate(path: &Path, os: Os) -> Result<(), PathValidationError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PathValidationError::FileNotFound);
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PathValidationError::PermissionDenied);
        }
        Err(e) => return Err(PathValidationError::AccessError(e.to_string())),
    };

    if metadata.is_dir() {
        return Err(PathValidationError::IsDirectory);
    }
    if !metadata.is_file() {
        return Err(PathValidationError::AccessError(
            "not a regular file".to_string(),
        ));
    }

    if is_executable(path, &metadata, os) {
        Ok(())
    } else {
        Err(PathValidationError::NotExecutable)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path, metadata: &std::fs::Metadata, os: Os) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match os {
        // Cross-validating a Windows layout from Unix falls back to the
        // extension rule.
        Os::Windows => has_exe_extension(path),
        _ => metadata.permissions().mode() & 0o111 != 0,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path, _metadata: &std::fs::Metadata, _os: Os) -> bool {
    has_exe_extension(path)
}

fn has_exe_extension(path: &Path) -> bool {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::binary::Arch;
    use crate::domain::build_info::BuildTool;
    use serde_json::json;
    use std::fs;

    const LINUX_X64: Platform = Platform {
        os: Os::Linux,
        arch: Arch::X64,
    };

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn forge_info(root: &Path, name: &str) -> AppBuildInfo {
        AppBuildInfo {
            tool: BuildTool::Forge(json!({})),
            app_name: name.to_string(),
            project_root: root.to_path_buf(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_forge_linux_resolution_end_to_end() {
        // Scenario E1: Forge project, Linux x64, binary present and
        // executable at the well-known path.
        let dir = tempfile::tempdir().unwrap();
        let binary_dir = dir.path().join("out/MyApp-linux-x64");
        fs::create_dir_all(&binary_dir).unwrap();
        let binary = binary_dir.join("MyApp");
        fs::write(&binary, "#!/bin/sh\n").unwrap();
        make_executable(&binary);

        let result = resolve(
            dir.path(),
            &forge_info(dir.path(), "MyApp"),
            LINUX_X64,
            BuildType::Release,
        );

        assert!(result.success);
        assert_eq!(result.binary_path.as_deref(), Some(binary.as_path()));
        assert_eq!(result.attempts.len(), 1);
        assert!(result.attempts[0].valid);
        assert_eq!(result.attempts[0].error, None);
    }

    #[test]
    fn test_missing_binary_records_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve(
            dir.path(),
            &forge_info(dir.path(), "MyApp"),
            LINUX_X64,
            BuildType::Release,
        );

        assert!(!result.success);
        assert_eq!(result.binary_path, None);
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(
            result.attempts[0].error,
            Some(PathValidationError::FileNotFound)
        );
    }

    #[test]
    fn test_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let as_dir = dir.path().join("out/MyApp-linux-x64/MyApp");
        fs::create_dir_all(&as_dir).unwrap();

        let result = resolve(
            dir.path(),
            &forge_info(dir.path(), "MyApp"),
            LINUX_X64,
            BuildType::Release,
        );

        assert!(!result.success);
        assert_eq!(
            result.attempts[0].error,
            Some(PathValidationError::IsDirectory)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary_dir = dir.path().join("out/MyApp-linux-x64");
        fs::create_dir_all(&binary_dir).unwrap();
        let binary = binary_dir.join("MyApp");
        fs::write(&binary, "data").unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o644)).unwrap();

        let result = resolve(
            dir.path(),
            &forge_info(dir.path(), "MyApp"),
            LINUX_X64,
            BuildType::Release,
        );

        assert!(!result.success);
        assert_eq!(
            result.attempts[0].error,
            Some(PathValidationError::NotExecutable)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_first_valid_wins_with_full_attempt_log() {
        // Builder on macOS arm64 generates multiple candidates; make the
        // second one valid and check both attempts are recorded.
        let dir = tempfile::tempdir().unwrap();
        let universal = dir
            .path()
            .join("dist/mac-universal/MyApp.app/Contents/MacOS");
        fs::create_dir_all(&universal).unwrap();
        let binary = universal.join("MyApp");
        fs::write(&binary, "bin").unwrap();
        make_executable(&binary);

        let info = AppBuildInfo {
            tool: BuildTool::Builder(json!({})),
            app_name: "MyApp".to_string(),
            project_root: dir.path().to_path_buf(),
        };
        let result = resolve(
            dir.path(),
            &info,
            Platform {
                os: Os::MacOs,
                arch: Arch::Arm64,
            },
            BuildType::Release,
        );

        assert!(result.success);
        assert_eq!(result.binary_path.as_deref(), Some(binary.as_path()));
        assert!(result.attempts.len() >= 2);
        assert!(!result.attempts[0].valid);
        assert!(result.attempts[1].valid);
    }

    #[cfg(unix)]
    #[test]
    fn test_explicit_path_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("custom-app");
        fs::write(&binary, "bin").unwrap();
        make_executable(&binary);

        let result = resolve_explicit(&binary, LINUX_X64);
        assert!(result.success);
        assert_eq!(result.attempts.len(), 1);
    }

    #[test]
    fn test_empty_candidate_list_boundary() {
        let result = validate_candidates(&[], Os::Linux);
        assert!(!result.success);
        assert!(result.attempts.is_empty());
        assert!(result.binary_path.is_none());
    }
}
