//! Plugin error type.
//!
//! Command results cross the IPC boundary, so the error serializes to its
//! display string.

use serde::{Serialize, Serializer};

/// Errors a plugin command can return.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The evaluated script threw in the webview.
    #[error("script threw: {0}")]
    Script(String),
    /// The script result could not be serialized across the IPC boundary.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),
    /// The evaluation never reported back within the deadline.
    #[error("execute timed out after {0}ms")]
    Timeout(u64),
    /// The result channel dropped before the evaluation reported back.
    #[error("execute result channel closed")]
    ChannelClosed,
    /// The webview rejected the injected script.
    #[error(transparent)]
    Tauri(#[from] tauri::Error),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Plugin result alias.
pub type Result<T> = std::result::Result<T, Error>;
