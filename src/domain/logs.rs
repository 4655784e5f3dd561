// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Log capture event shapes and level filtering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Console log severity, ordered `Trace < Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Finest-grained output.
    Trace,
    /// Diagnostic output.
    Debug,
    /// Informational output.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Map a CDP `Runtime.consoleAPICalled` `type` string to a level.
    ///
    /// Unknown console API types (`table`, `dir`, `count`, …) map to `Info`.
    #[must_use]
    pub fn from_console_type(console_type: &str) -> Self {
        match console_type {
            "trace" | "verbose" => Self::Trace,
            "debug" => Self::Debug,
            "warning" | "warn" => Self::Warn,
            "error" | "assert" => Self::Error,
            _ => Self::Info,
        }
    }

    /// Parse a log-framework level token (`INFO`, `warn`, …).
    #[must_use]
    pub fn parse_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Uppercase token used in file sink lines.
    #[must_use]
    pub const fn as_upper(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

/// Which process a captured log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSource {
    /// Electron main process (CDP `Runtime` domain).
    MainProcess,
    /// Electron renderer (per-target CDP session).
    Renderer,
    /// Tauri backend (driver/app stdout).
    Backend,
    /// Tauri frontend (console hook forwarded through the plugin).
    Frontend,
}

impl LogSource {
    /// Label used in the forwarding prefix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MainProcess => "MainProcess",
            Self::Renderer => "Renderer",
            Self::Backend => "Backend",
            Self::Frontend => "Frontend",
        }
    }
}

/// One captured console event, normalized across frameworks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Severity after normalization.
    pub level: LogLevel,
    /// Rendered message text.
    pub message: String,
    /// Originating process.
    pub source: LogSource,
    /// Multiremote instance name, when applicable.
    pub instance: Option<String>,
}

impl LogEvent {
    /// Forwarding prefix: `[Framework:Source]` or `[Framework:Source:Instance]`.
    #[must_use]
    pub fn prefix(&self, framework_label: &str) -> String {
        match &self.instance {
            Some(instance) => format!("[{framework_label}:{}:{instance}]", self.source.label()),
            None => format!("[{framework_label}:{}]", self.source.label()),
        }
    }
}

/// Parse one tauri-driver / backend stdout line into `(level, message)`.
///
/// Understands the two grammars current drivers emit:
/// `LEVEL message` and `[timestamp LEVEL target] message`. Anything else is
/// passed through at `Info` so no backend output is lost. The exact grammar
/// is driver-version-dependent; this function is the single place to adjust.
#[must_use]
pub fn parse_backend_line(line: &str) -> (LogLevel, String) {
    let trimmed = line.trim();

    // `[2024-05-01T10:00:00Z INFO app::core] message`
    if let Some(rest) = trimmed.strip_prefix('[')
        && let Some(close) = rest.find(']')
    {
        let header = &rest[..close];
        let message = rest[close + 1..].trim_start();
        if let Some(level) = header.split_whitespace().find_map(LogLevel::parse_token) {
            return (level, message.to_string());
        }
    }

    // `INFO message`
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    if let Some(first) = parts.next()
        && let Some(level) = LogLevel::parse_token(first)
    {
        let message = parts.next().unwrap_or("").trim_start();
        return (level, message.to_string());
    }

    (LogLevel::Info, trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_from_console_type() {
        assert_eq!(LogLevel::from_console_type("log"), LogLevel::Info);
        assert_eq!(LogLevel::from_console_type("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_console_type("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from_console_type("error"), LogLevel::Error);
        assert_eq!(LogLevel::from_console_type("assert"), LogLevel::Error);
        assert_eq!(LogLevel::from_console_type("verbose"), LogLevel::Trace);
        assert_eq!(LogLevel::from_console_type("table"), LogLevel::Info);
    }

    #[test]
    fn test_error_threshold_drops_lower_levels() {
        let minimum = LogLevel::Error;
        assert!(LogLevel::Trace < minimum);
        assert!(LogLevel::Debug < minimum);
        assert!(LogLevel::Info < minimum);
        assert!(LogLevel::Warn < minimum);
        assert!(LogLevel::Error >= minimum);
    }

    #[test]
    fn test_prefix_without_instance() {
        let event = LogEvent {
            level: LogLevel::Info,
            message: "hi".to_string(),
            source: LogSource::MainProcess,
            instance: None,
        };
        assert_eq!(event.prefix("Electron"), "[Electron:MainProcess]");
    }

    #[test]
    fn test_prefix_with_instance() {
        let event = LogEvent {
            level: LogLevel::Warn,
            message: "hi".to_string(),
            source: LogSource::Renderer,
            instance: Some("browserA".to_string()),
        };
        assert_eq!(event.prefix("Electron"), "[Electron:Renderer:browserA]");
    }

    #[test]
    fn test_parse_backend_line_plain_grammar() {
        let (level, message) = parse_backend_line("WARN something went sideways");
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(message, "something went sideways");
    }

    #[test]
    fn test_parse_backend_line_bracketed_grammar() {
        let (level, message) =
            parse_backend_line("[2024-05-01T10:00:00Z ERROR app::core] boom");
        assert_eq!(level, LogLevel::Error);
        assert_eq!(message, "boom");
    }

    #[test]
    fn test_parse_backend_line_unknown_grammar_passes_through() {
        let (level, message) = parse_backend_line("no level marker here");
        assert_eq!(level, LogLevel::Info);
        assert_eq!(message, "no level marker here");
    }
}
