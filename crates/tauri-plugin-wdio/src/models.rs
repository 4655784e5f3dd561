//! Wire shapes for the plugin commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `execute` request payload: `{script, args}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// User function source, evaluated in the webview.
    pub script: String,
    /// Arguments passed after the Tauri APIs object.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Result callback payload reported by the injected wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Evaluation id the wrapper answers.
    pub id: u64,
    /// Successful result, JSON-encoded by the webview.
    #[serde(default)]
    pub result: Value,
    /// Error text when the script threw.
    #[serde(default)]
    pub error: Option<String>,
}

/// Mock configuration stored per command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    /// Value the intercepted command resolves with.
    #[serde(default)]
    pub return_value: Value,
}

/// `get_mock` response: config plus the recorded interceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockSnapshot {
    /// Configured return value.
    pub return_value: Value,
    /// Arguments of each intercepted call, in order.
    pub calls: Vec<Value>,
    /// Stamps from the store-wide monotonic counter.
    #[serde(rename = "invocationCallOrder")]
    pub invocation_call_order: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_request_args_default_empty() {
        let request: ExecuteRequest =
            serde_json::from_value(json!({"script": "() => 1"})).unwrap();
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_snapshot_wire_shape_uses_camel_case_order() {
        let snapshot = MockSnapshot {
            return_value: json!("mocked"),
            calls: vec![json!({"path": "x"})],
            invocation_call_order: vec![3],
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["invocationCallOrder"], json!([3]));
        assert_eq!(value["return_value"], "mocked");
    }
}
