// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Tauri configuration detection.

use crate::domain::errors::ServiceError;
use serde_json::Value;
use std::path::Path;

/// Detect a Tauri project via `src-tauri/tauri.conf.json`.
///
/// # Errors
///
/// A present but malformed `tauri.conf.json` is fatal.
pub fn detect_tauri(project_root: &Path) -> Result<Option<Value>, ServiceError> {
    let path = project_root.join("src-tauri").join("tauri.conf.json");
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    let config = serde_json::from_str(&text).map_err(|e| ServiceError::ConfigParse {
        tool: "tauri".to_string(),
        detail: format!("{}: {e}", path.display()),
    })?;
    Ok(Some(config))
}

/// Package name from `src-tauri/Cargo.toml`, for apps without a
/// `productName`.
///
/// # Errors
///
/// A present but malformed manifest is fatal; a missing manifest yields
/// `None` so the caller can report the unresolved name instead.
pub fn cargo_package_name(project_root: &Path) -> Result<Option<String>, ServiceError> {
    let path = project_root.join("src-tauri").join("Cargo.toml");
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    let manifest: toml::Value = toml::from_str(&text).map_err(|e| ServiceError::ConfigParse {
        tool: "tauri".to_string(),
        detail: format!("{}: {e}", path.display()),
    })?;
    Ok(manifest
        .get("package")
        .and_then(|pkg| pkg.get("name"))
        .and_then(toml::Value::as_str)
        .map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_detects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_tauri(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_config_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let tauri_dir = dir.path().join("src-tauri");
        std::fs::create_dir_all(&tauri_dir).unwrap();
        std::fs::write(
            tauri_dir.join("tauri.conf.json"),
            r#"{"productName": "demo", "identifier": "com.example.demo"}"#,
        )
        .unwrap();

        let config = detect_tauri(dir.path()).unwrap().unwrap();
        assert_eq!(config["productName"], "demo");
    }

    #[test]
    fn test_malformed_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let tauri_dir = dir.path().join("src-tauri");
        std::fs::create_dir_all(&tauri_dir).unwrap();
        std::fs::write(tauri_dir.join("tauri.conf.json"), "nope").unwrap();

        assert!(matches!(
            detect_tauri(dir.path()).unwrap_err(),
            ServiceError::ConfigParse { .. }
        ));
    }

    #[test]
    fn test_cargo_package_name() {
        let dir = tempfile::tempdir().unwrap();
        let tauri_dir = dir.path().join("src-tauri");
        std::fs::create_dir_all(&tauri_dir).unwrap();
        std::fs::write(
            tauri_dir.join("Cargo.toml"),
            "[package]\nname = \"demo-app\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();

        assert_eq!(
            cargo_package_name(dir.path()).unwrap().as_deref(),
            Some("demo-app")
        );
    }

    #[test]
    fn test_missing_manifest_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cargo_package_name(dir.path()).unwrap(), None);
    }
}
