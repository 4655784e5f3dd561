// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! OS-level deeplink firing at the running app instance.
//!
//! On Windows and Linux the app's single-instance lock is keyed by
//! user-data directory, so the directory is fetched from the live app and
//! appended as a `userData` query parameter — the running instance
//! receives the URL instead of a duplicate launch. macOS targets by bundle
//! id and needs no rewriting.

use crate::application::execute::ExecuteBridge;
use crate::domain::binary::Os;
use crate::domain::errors::DeeplinkError;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Schemes that are never deeplinks.
const DISALLOWED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Budget for the OS launcher command.
const TRIGGER_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse and validate a deeplink URL.
///
/// # Errors
///
/// [`DeeplinkError::MalformedUrl`] when parsing fails,
/// [`DeeplinkError::InvalidProtocol`] for http/https/file.
pub fn validate_deeplink_url(raw: &str) -> Result<Url, DeeplinkError> {
    let url = Url::parse(raw).map_err(|e| DeeplinkError::MalformedUrl(format!("{raw}: {e}")))?;
    let scheme = url.scheme();
    if DISALLOWED_SCHEMES.contains(&scheme) {
        return Err(DeeplinkError::InvalidProtocol(scheme.to_string()));
    }
    Ok(url)
}

/// Append (or overwrite) the `userData` query parameter, preserving every
/// other parameter and the fragment.
///
/// # Errors
///
/// [`DeeplinkError::MalformedUrl`] when the URL does not parse.
pub fn append_user_data_dir(raw: &str, user_data: &str) -> Result<String, DeeplinkError> {
    let mut url =
        Url::parse(raw).map_err(|e| DeeplinkError::MalformedUrl(format!("{raw}: {e}")))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "userData")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("userData", user_data);
    }

    Ok(url.to_string())
}

/// Decode percent escapes once.
///
/// macOS `open` re-encodes the query string it is handed; pre-decoding
/// keeps the app from receiving doubly-encoded parameters.
#[must_use]
pub fn decode_query_once(raw: &str) -> String {
    let Some((head, rest)) = raw.split_once('?') else {
        return raw.to_string();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (rest, None),
    };

    let bytes = query.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&query[index + 1..index + 3], 16) {
                decoded.push(byte);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    let decoded = String::from_utf8_lossy(&decoded);

    match fragment {
        Some(fragment) => format!("{head}?{decoded}#{fragment}"),
        None => format!("{head}?{decoded}"),
    }
}

/// The OS command that delivers a deeplink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeeplinkCommand {
    /// Program to spawn.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

/// Build the launcher command for a platform.
///
/// # Errors
///
/// [`DeeplinkError::MissingBinaryPath`] on Windows without a configured
/// `appBinaryPath` — the `start` route cannot target an instance otherwise.
pub fn build_command(
    os: Os,
    url: &str,
    has_binary_path: bool,
) -> Result<DeeplinkCommand, DeeplinkError> {
    match os {
        Os::Windows => {
            if !has_binary_path {
                return Err(DeeplinkError::MissingBinaryPath);
            }
            // The empty title makes `start` tolerate a quoted URL.
            Ok(DeeplinkCommand {
                program: "cmd".to_string(),
                args: vec![
                    "/c".to_string(),
                    "start".to_string(),
                    String::new(),
                    url.to_string(),
                ],
            })
        }
        Os::MacOs => Ok(DeeplinkCommand {
            program: "open".to_string(),
            args: vec![url.to_string()],
        }),
        Os::Linux => Ok(DeeplinkCommand {
            program: "xdg-open".to_string(),
            args: vec![url.to_string()],
        }),
    }
}

/// Per-worker deeplink trigger with a cached user-data directory.
pub struct DeeplinkTrigger {
    executor: Arc<ExecuteBridge>,
    os: Os,
    has_binary_path: bool,
    user_data_dir: Mutex<Option<String>>,
}

impl DeeplinkTrigger {
    /// Trigger for one worker.
    #[must_use]
    pub fn new(executor: Arc<ExecuteBridge>, os: Os, has_binary_path: bool) -> Self {
        Self {
            executor,
            os,
            has_binary_path,
            user_data_dir: Mutex::new(None),
        }
    }

    /// Fire a deeplink at the running instance.
    ///
    /// # Errors
    ///
    /// Validation errors surface before anything is spawned; spawn errors
    /// and the 5 s budget reject the call without wider effect.
    pub async fn trigger(&self, raw: &str) -> Result<(), DeeplinkError> {
        validate_deeplink_url(raw)?;

        let url = match self.os {
            Os::MacOs => decode_query_once(raw),
            Os::Windows | Os::Linux => match self.user_data_dir().await {
                Some(dir) => append_user_data_dir(raw, &dir)?,
                None => raw.to_string(),
            },
        };

        let command = build_command(self.os, &url, self.has_binary_path)?;
        tokio::time::timeout(TRIGGER_TIMEOUT, spawn_detached(command))
            .await
            .map_err(|_| DeeplinkError::Timeout)?
    }

    /// User-data directory of the live app, fetched once and cached for
    /// the worker. `None` when the app cannot report it (the deeplink
    /// still fires, untargeted).
    async fn user_data_dir(&self) -> Option<String> {
        if let Some(cached) = self.user_data_dir.lock().expect("deeplink state poisoned").clone() {
            return Some(cached);
        }
        let fetched = self
            .executor
            .execute("(electron) => electron.app.getPath('userData')", &[])
            .await;
        match fetched {
            Ok(Value::String(dir)) => {
                *self.user_data_dir.lock().expect("deeplink state poisoned") = Some(dir.clone());
                Some(dir)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("could not fetch userData dir, firing untargeted deeplink: {e}");
                None
            }
        }
    }
}

async fn spawn_detached(command: DeeplinkCommand) -> Result<(), DeeplinkError> {
    let mut process = tokio::process::Command::new(&command.program);
    process
        .args(&command.args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    process
        .spawn()
        .map_err(|e| DeeplinkError::SpawnFailed(e.to_string()))?;

    // Resolve on the next scheduler tick; the launcher runs on its own.
    tokio::task::yield_now().await;
    Ok(())
}
