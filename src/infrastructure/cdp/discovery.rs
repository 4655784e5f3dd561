// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Inspector endpoint discovery.
//!
//! An Electron app launched with `--inspect=<port>` exposes the V8
//! inspector's HTTP listing on that port. The listing is polled with a
//! retry budget because the endpoint only appears once the main process
//! has booted.

use crate::domain::cdp::CdpError;
use serde::Deserialize;
use std::time::Duration;

/// URL prefix identifying the Electron main-process target in the
/// inspector listing.
const ELECTRON_MAIN_INDICATOR: &str = "electron";

/// One entry from `/json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorTarget {
    /// Target id.
    #[serde(default)]
    pub id: String,
    /// Script or page URL the target runs.
    #[serde(default)]
    pub url: String,
    /// Target description (`node`, `page`, …).
    #[serde(default, rename = "type")]
    pub target_type: String,
    /// WebSocket endpoint for this target, when attachable.
    pub web_socket_debugger_url: Option<String>,
}

/// Pick the main-process target: the first whose URL starts with the
/// Electron indicator, else the first target at all.
#[must_use]
pub fn select_main_target(targets: &[InspectorTarget]) -> Option<&InspectorTarget> {
    targets
        .iter()
        .find(|t| t.url.starts_with(ELECTRON_MAIN_INDICATOR))
        .or_else(|| targets.first())
}

/// Poll the inspector listing until a main-process WebSocket URL appears.
///
/// Makes up to `retry_count` attempts, `wait_interval` apart.
///
/// # Errors
///
/// [`CdpError::ConnectFailed`] when the budget is exhausted without an
/// attachable target.
pub async fn discover_main_target(
    port: u16,
    retry_count: u32,
    wait_interval: Duration,
) -> Result<String, CdpError> {
    let endpoint = format!("http://127.0.0.1:{port}/json/list");
    let client = reqwest::Client::new();
    let mut last_error = String::from("inspector endpoint never answered");

    let attempts = retry_count.max(1);
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(wait_interval).await;
        }
        match fetch_targets(&client, &endpoint).await {
            Ok(targets) => {
                if let Some(ws_url) = select_main_target(&targets)
                    .and_then(|t| t.web_socket_debugger_url.clone())
                {
                    return Ok(ws_url);
                }
                last_error = "inspector listing contained no attachable target".to_string();
            }
            Err(e) => last_error = e,
        }
    }

    Err(CdpError::ConnectFailed {
        port,
        attempts,
        detail: last_error,
    })
}

async fn fetch_targets(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<Vec<InspectorTarget>, String> {
    let response = client
        .get(endpoint)
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    response
        .json::<Vec<InspectorTarget>>()
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str, ws: Option<&str>) -> InspectorTarget {
        InspectorTarget {
            id: "t".to_string(),
            url: url.to_string(),
            target_type: "node".to_string(),
            web_socket_debugger_url: ws.map(ToString::to_string),
        }
    }

    #[test]
    fn test_select_prefers_electron_main_url() {
        let targets = vec![
            target("file:///renderer.js", Some("ws://a")),
            target("electron/js2c/browser_init", Some("ws://main")),
        ];
        let selected = select_main_target(&targets).unwrap();
        assert_eq!(selected.web_socket_debugger_url.as_deref(), Some("ws://main"));
    }

    #[test]
    fn test_select_falls_back_to_first() {
        let targets = vec![
            target("file:///a.js", Some("ws://first")),
            target("file:///b.js", Some("ws://second")),
        ];
        let selected = select_main_target(&targets).unwrap();
        assert_eq!(selected.web_socket_debugger_url.as_deref(), Some("ws://first"));
    }

    #[test]
    fn test_select_empty_listing() {
        assert!(select_main_target(&[]).is_none());
    }

    #[tokio::test]
    async fn test_discovery_gives_up_with_connect_failed() {
        // Port 1 is never listening.
        let err = discover_main_target(1, 2, Duration::from_millis(1))
            .await
            .unwrap_err();
        match err {
            CdpError::ConnectFailed { port, attempts, .. } => {
                assert_eq!(port, 1);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected ConnectFailed, got {other}"),
        }
    }

    #[test]
    fn test_listing_deserialization() {
        let targets: Vec<InspectorTarget> = serde_json::from_str(
            r#"[{
                "id": "abc",
                "title": "Electron Main Context",
                "type": "node",
                "url": "electron/js2c/browser_init",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9229/abc"
            }]"#,
        )
        .unwrap();
        assert_eq!(targets[0].id, "abc");
        assert_eq!(
            targets[0].web_socket_debugger_url.as_deref(),
            Some("ws://127.0.0.1:9229/abc")
        );
    }
}
