// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! electron-builder configuration detection.

use crate::domain::errors::ServiceError;
use serde_json::{Value, json};
use std::path::Path;

/// Extensions electron-builder accepts, in its own lookup order.
const BUILDER_EXTENSIONS: &[&str] = &[
    "json", "json5", "yaml", "yml", "toml", "js", "ts", "cjs", "mjs", "cts", "mts",
];

/// Detect an electron-builder configuration.
///
/// Checks `electron-builder.{ext}` and `electron-builder.config.{ext}` for
/// every accepted extension, then `package.json#build`. JSON, YAML, and
/// TOML files are parsed; JS/TS (and JSON5, which needs an evaluator we do
/// not carry) identify the tool but yield an empty config object, with
/// name resolution falling back to `package.json`.
///
/// # Errors
///
/// A matching JSON/YAML/TOML file that fails to parse is fatal.
pub fn detect_builder(
    project_root: &Path,
    package_json: Option<&Value>,
) -> Result<Option<Value>, ServiceError> {
    for stem in ["electron-builder", "electron-builder.config"] {
        for ext in BUILDER_EXTENSIONS {
            let path = project_root.join(format!("{stem}.{ext}"));
            if path.is_file() {
                return parse_config_file(&path, ext).map(Some);
            }
        }
    }

    Ok(package_json.and_then(|pkg| pkg.get("build")).cloned())
}

fn parse_config_file(path: &Path, ext: &str) -> Result<Value, ServiceError> {
    let parse_error = |detail: String| ServiceError::ConfigParse {
        tool: "electron-builder".to_string(),
        detail: format!("{}: {detail}", path.display()),
    };

    match ext {
        "json" => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))
        }
        "yaml" | "yml" => {
            let text = std::fs::read_to_string(path)?;
            serde_yaml_ng::from_str(&text).map_err(|e| parse_error(e.to_string()))
        }
        "toml" => {
            let text = std::fs::read_to_string(path)?;
            let parsed: toml::Value = toml::from_str(&text).map_err(|e| parse_error(e.to_string()))?;
            serde_json::to_value(parsed).map_err(|e| parse_error(e.to_string()))
        }
        // JS/TS configs would need an evaluator; JSON5 a dedicated parser.
        // The file still identifies the build tool.
        _ => Ok(json!({})),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_config_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("electron-builder.json"),
            r#"{"productName": "JsonApp"}"#,
        )
        .unwrap();

        let config = detect_builder(dir.path(), None).unwrap().unwrap();
        assert_eq!(config["productName"], "JsonApp");
    }

    #[test]
    fn test_yaml_config_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("electron-builder.yaml"),
            "productName: YamlApp\n",
        )
        .unwrap();

        let config = detect_builder(dir.path(), None).unwrap().unwrap();
        assert_eq!(config["productName"], "YamlApp");
    }

    #[test]
    fn test_toml_config_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("electron-builder.toml"),
            "productName = \"TomlApp\"\n",
        )
        .unwrap();

        let config = detect_builder(dir.path(), None).unwrap().unwrap();
        assert_eq!(config["productName"], "TomlApp");
    }

    #[test]
    fn test_js_config_detected_but_not_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("electron-builder.js"),
            "module.exports = { productName: 'JsApp' }",
        )
        .unwrap();

        let config = detect_builder(dir.path(), None).unwrap().unwrap();
        assert_eq!(config, json!({}));
    }

    #[test]
    fn test_config_stem_variant_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("electron-builder.config.json"),
            r#"{"productName": "ConfigStem"}"#,
        )
        .unwrap();

        let config = detect_builder(dir.path(), None).unwrap().unwrap();
        assert_eq!(config["productName"], "ConfigStem");
    }

    #[test]
    fn test_package_json_build_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = json!({"build": {"productName": "PkgBuild"}});

        let config = detect_builder(dir.path(), Some(&pkg)).unwrap().unwrap();
        assert_eq!(config["productName"], "PkgBuild");
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("electron-builder.json"), "{oops").unwrap();

        let err = detect_builder(dir.path(), None).unwrap_err();
        match err {
            ServiceError::ConfigParse { tool, .. } => assert_eq!(tool, "electron-builder"),
            other => panic!("expected ConfigParse, got {other}"),
        }
    }

    #[test]
    fn test_nothing_detected() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_builder(dir.path(), None).unwrap(), None);
    }
}
