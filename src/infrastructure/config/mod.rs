// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Build-tool configuration discovery.
//!
//! Scans a project root for Electron Forge, electron-builder, or Tauri
//! configuration and resolves the application name. Exactly one build tool
//! must match; zero or multiple matches are fatal to `onPrepare`.

mod builder;
mod forge;
mod tauri;

use crate::domain::build_info::{AppBuildInfo, BuildTool};
use crate::domain::errors::ServiceError;
use serde_json::Value;
use std::path::Path;

pub use builder::detect_builder;
pub use forge::detect_forge;
pub use tauri::detect_tauri;

/// Scan `project_root` and produce the build info for the single matching
/// build tool.
///
/// # Errors
///
/// - [`ServiceError::NoBuildTool`] when nothing matches.
/// - [`ServiceError::MultipleBuildTools`] when more than one matches.
/// - [`ServiceError::ConfigParse`] when a matching config cannot be parsed
///   or no application name can be resolved.
pub fn read_build_info(project_root: &Path) -> Result<AppBuildInfo, ServiceError> {
    let package_json = read_package_json(project_root)?;

    let forge = detect_forge(project_root, package_json.as_ref())?;
    let builder = detect_builder(project_root, package_json.as_ref())?;
    let tauri = detect_tauri(project_root)?;

    let mut matches: Vec<BuildTool> = Vec::new();
    if let Some(config) = forge {
        matches.push(BuildTool::Forge(config));
    }
    if let Some(config) = builder {
        matches.push(BuildTool::Builder(config));
    }
    if let Some(config) = tauri {
        matches.push(BuildTool::Tauri(config));
    }

    match matches.len() {
        0 => Err(ServiceError::NoBuildTool {
            project_root: project_root.display().to_string(),
        }),
        1 => {
            let tool = matches.remove(0);
            let app_name = resolve_app_name(&tool, package_json.as_ref(), project_root)?;
            Ok(AppBuildInfo {
                tool,
                app_name,
                project_root: project_root.to_path_buf(),
            })
        }
        _ => Err(ServiceError::MultipleBuildTools {
            tools: matches.iter().map(|t| t.name().to_string()).collect(),
        }),
    }
}

/// Read and parse `package.json`, when present.
///
/// # Errors
///
/// A present but malformed `package.json` is fatal: both Electron build
/// tools treat it as configuration.
pub fn read_package_json(project_root: &Path) -> Result<Option<Value>, ServiceError> {
    let path = project_root.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    let value = serde_json::from_str(&text).map_err(|e| ServiceError::ConfigParse {
        tool: "package.json".to_string(),
        detail: e.to_string(),
    })?;
    Ok(Some(value))
}

fn resolve_app_name(
    tool: &BuildTool,
    package_json: Option<&Value>,
    project_root: &Path,
) -> Result<String, ServiceError> {
    let package_name = package_json
        .and_then(|pkg| pkg.get("name"))
        .and_then(Value::as_str);

    let name = match tool {
        BuildTool::Forge(config) => config
            .pointer("/packagerConfig/name")
            .and_then(Value::as_str)
            .or(package_name)
            .map(ToString::to_string),
        BuildTool::Builder(config) => config
            .get("productName")
            .and_then(Value::as_str)
            .or_else(|| config.get("executableName").and_then(Value::as_str))
            .or(package_name)
            .map(ToString::to_string),
        BuildTool::Tauri(config) => match config.get("productName").and_then(Value::as_str) {
            Some(product) => Some(product.to_string()),
            None => tauri::cargo_package_name(project_root)?,
        },
    };

    name.ok_or_else(|| ServiceError::ConfigParse {
        tool: tool.name().to_string(),
        detail: "could not resolve application name".to_string(),
    })
}
