// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Chrome DevTools Protocol frame types.
//!
//! CDP is JSON over WebSocket: requests carry a session-unique integer id,
//! responses echo the id, and unsolicited events carry a `method` but no id.
//! The bridge in the infrastructure layer owns ids and routing; this module
//! only defines the wire shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Outbound CDP command frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpRequest {
    /// Session-unique, monotonically increasing id.
    pub id: u64,
    /// Domain-qualified method name (`Runtime.evaluate`).
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Flattened-session routing: present when the command targets an
    /// attached target rather than the browser endpoint.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Error object inside a CDP response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdpRemoteError {
    /// Protocol error code.
    pub code: i64,
    /// Human-readable message from the inspector.
    pub message: String,
}

/// Inbound response frame (id echoes the request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpResponse {
    /// Id of the request this answers.
    pub id: u64,
    /// Success payload (mutually exclusive with `error`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload (mutually exclusive with `result`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CdpRemoteError>,
    /// Session the response belongs to, for flattened sessions.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Inbound unsolicited event frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpEvent {
    /// Domain-qualified event name (`Runtime.consoleAPICalled`).
    pub method: String,
    /// Event payload.
    #[serde(default)]
    pub params: Value,
    /// Session the event belongs to, for flattened sessions.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Any frame the inspector can send us.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CdpIncoming {
    /// A response to one of our requests (has `id`).
    Response(CdpResponse),
    /// An unsolicited event (has `method`).
    Event(CdpEvent),
}

/// Connection lifecycle of a bridge. Transitions only move forward;
/// reconnecting after `Closed` requires a new bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed, not yet connecting.
    Idle,
    /// WebSocket dial in progress.
    Connecting,
    /// Frames flowing.
    Open,
    /// `close()` called, pending requests being rejected.
    Closing,
    /// Terminal.
    Closed,
}

impl BridgeState {
    /// Whether moving to `next` is a legal forward transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Connecting)
                | (Self::Connecting, Self::Open | Self::Closed)
                | (Self::Open, Self::Closing | Self::Closed)
                | (Self::Closing, Self::Closed)
        )
    }
}

/// CDP bridge errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// No inspector endpoint answered within the retry budget.
    #[error("failed to connect to the inspector on port {port} after {attempts} attempt(s): {detail}")]
    ConnectFailed {
        /// Inspector port that was polled.
        port: u16,
        /// Number of attempts made.
        attempts: u32,
        /// Last underlying error.
        detail: String,
    },
    /// The WebSocket layer failed mid-session.
    #[error("CDP transport error: {0}")]
    Transport(String),
    /// A frame could not be encoded or decoded.
    #[error("CDP protocol error: {0}")]
    Protocol(String),
    /// The inspector rejected a request.
    #[error("CDP remote error {}: {}", .0.code, .0.message)]
    Remote(CdpRemoteError),
    /// TIMEOUT: one in-flight request missed its deadline. The bridge stays open.
    #[error("TIMEOUT: {method} did not answer within {timeout_ms}ms")]
    Timeout {
        /// Method that timed out.
        method: String,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },
    /// CANCELED: the bridge closed while the request was in flight.
    #[error("CANCELED: bridge closed with request in flight")]
    Canceled,
    /// A send was attempted in a state that cannot carry traffic.
    #[error("bridge is {0:?}, cannot send")]
    InvalidState(BridgeState),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_omits_empty_fields() {
        let req = CdpRequest {
            id: 1,
            method: "Runtime.enable".to_string(),
            params: None,
            session_id: None,
        };
        let text = serde_json::to_string(&req).unwrap();
        assert!(!text.contains("params"));
        assert!(!text.contains("sessionId"));
    }

    #[test]
    fn test_request_serialization_with_session() {
        let req = CdpRequest {
            id: 7,
            method: "Runtime.evaluate".to_string(),
            params: Some(json!({"expression": "1+1"})),
            session_id: Some("SESSION".to_string()),
        };
        let value: Value = serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(value["sessionId"], "SESSION");
        assert_eq!(value["params"]["expression"], "1+1");
    }

    #[test]
    fn test_incoming_discriminates_response() {
        let frame: CdpIncoming =
            serde_json::from_str(r#"{"id":3,"result":{"ok":true}}"#).unwrap();
        match frame {
            CdpIncoming::Response(resp) => {
                assert_eq!(resp.id, 3);
                assert!(resp.error.is_none());
            }
            CdpIncoming::Event(_) => panic!("expected response"),
        }
    }

    #[test]
    fn test_incoming_discriminates_event() {
        let frame: CdpIncoming = serde_json::from_str(
            r#"{"method":"Runtime.consoleAPICalled","params":{"type":"log","args":[]}}"#,
        )
        .unwrap();
        match frame {
            CdpIncoming::Event(event) => {
                assert_eq!(event.method, "Runtime.consoleAPICalled");
                assert_eq!(event.params["type"], "log");
            }
            CdpIncoming::Response(_) => panic!("expected event"),
        }
    }

    #[test]
    fn test_incoming_response_with_error() {
        let frame: CdpIncoming = serde_json::from_str(
            r#"{"id":9,"error":{"code":-32000,"message":"Cannot find context"}}"#,
        )
        .unwrap();
        match frame {
            CdpIncoming::Response(resp) => {
                let error = resp.error.unwrap();
                assert_eq!(error.code, -32000);
                assert!(error.message.contains("context"));
            }
            CdpIncoming::Event(_) => panic!("expected response"),
        }
    }

    #[test]
    fn test_state_machine_only_moves_forward() {
        use BridgeState::{Closed, Closing, Connecting, Idle, Open};
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Open));
        assert!(Connecting.can_transition_to(Closed));
        assert!(Open.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));

        assert!(!Closed.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Open));
        assert!(!Open.can_transition_to(Connecting));
        assert!(!Closing.can_transition_to(Open));
    }
}
