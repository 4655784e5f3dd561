// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Electron Forge configuration detection.

use crate::domain::errors::ServiceError;
use serde_json::{Value, json};
use std::path::Path;

/// Forge config file names, in preference order.
const FORGE_CONFIG_FILES: &[&str] = &[
    "forge.config.js",
    "forge.config.cjs",
    "forge.config.mjs",
    "forge.config.ts",
];

/// Detect an Electron Forge configuration.
///
/// A `forge.config.*` file identifies the tool but is JavaScript we do not
/// evaluate, so it yields an empty config object; name resolution then
/// falls back to `package.json`. `package.json#config.forge` is used
/// directly when no config file exists.
///
/// # Errors
///
/// Currently infallible; the signature matches the other detectors so the
/// composition site treats all three alike.
pub fn detect_forge(
    project_root: &Path,
    package_json: Option<&Value>,
) -> Result<Option<Value>, ServiceError> {
    for file in FORGE_CONFIG_FILES {
        if project_root.join(file).is_file() {
            return Ok(Some(json!({})));
        }
    }

    Ok(package_json
        .and_then(|pkg| pkg.pointer("/config/forge"))
        .cloned())
}
