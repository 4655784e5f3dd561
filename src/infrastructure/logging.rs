// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Structured logging infrastructure.
//!
//! Two halves: process-wide `tracing` initialization (idempotent, driven by
//! `RUST_LOG` / `DEBUG`), and the scoped logger factory the service hands
//! to its subsystems. Captured app logs flow through [`LogSink`]
//! implementations — `tracing` when a runner hosts us, a file when running
//! standalone.

use crate::domain::logs::LogLevel;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Track if logging has been initialized.
static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber with log level from environment or default.
///
/// Log level can be set via `RUST_LOG` (`RUST_LOG=wdio_desktop=debug`);
/// setting the legacy `DEBUG` variable raises the default to `debug`.
///
/// Safe to call multiple times — only initializes once.
pub fn init_logging() {
    if INITIALIZED.get().is_some() {
        return;
    }

    let default_level = if crate::infrastructure::env::debug_enabled() {
        "debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // May fail if a subscriber was already set (e.g. in tests), which is ok.
    let init_result = std::panic::catch_unwind(|| {
        Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_ansi(true))
            .init();
    });

    let _ = INITIALIZED.set(());
    let _ = init_result;
}

/// Destination for log lines produced by scoped loggers and the capture
/// pipeline.
pub trait LogSink: Send + Sync {
    /// Emit one line at the given severity.
    fn emit(&self, level: LogLevel, line: &str);
}

/// Sink that forwards into the host `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Trace => tracing::trace!("{line}"),
            LogLevel::Debug => tracing::debug!("{line}"),
            LogLevel::Info => tracing::info!("{line}"),
            LogLevel::Warn => tracing::warn!("{line}"),
            LogLevel::Error => tracing::error!("{line}"),
        }
    }
}

/// Sink that appends `{ISO-timestamp} {LEVEL} {line}` to a session log file.
///
/// Used in standalone mode, where no runner logger exists.
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<std::fs::File>,
    path: PathBuf,
}

impl FileSink {
    /// Create `{log_dir}/wdio-{timestamp}.log`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory or file cannot
    /// be created.
    pub fn create(log_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        // Colons are not valid in Windows file names, so the timestamp uses
        // dashes within the time component.
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ");
        let path = log_dir.join(format!("wdio-{timestamp}.log"));
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Path of the file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn emit(&self, level: LogLevel, line: &str) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        if let Ok(mut file) = self.file.lock() {
            // Write failures here have nowhere useful to go.
            let _ = writeln!(file, "{timestamp} {} {line}", level.as_upper());
        }
    }
}

/// One scoped logger. Identical `(scope, area)` keys share the same
/// instance through [`LoggerFactory::create`].
#[derive(Debug)]
pub struct Logger {
    scope: String,
    area: String,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for dyn LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LogSink")
    }
}

impl Logger {
    /// Emit one line with the `[scope:area]` prefix.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.sink
            .emit(level, &format!("[{}:{}] {message}", self.scope, self.area));
    }

    /// Emit at `Debug`.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Emit at `Info`.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Emit at `Warn`.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Emit at `Error`.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Factory of cached scoped loggers.
///
/// Owned by the service lifecycle: created in `before`, cleared in
/// `onComplete`. Injectable in tests with any sink.
pub struct LoggerFactory {
    sink: Arc<dyn LogSink>,
    cache: Mutex<HashMap<(String, String), Arc<Logger>>>,
}

impl LoggerFactory {
    /// Factory over an explicit sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Factory over the host `tracing` subscriber.
    #[must_use]
    pub fn with_tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Get or create the logger for `(scope, area)`.
    ///
    /// Identical keys return the identical instance.
    #[must_use]
    pub fn create(&self, scope: &str, area: &str) -> Arc<Logger> {
        let key = (scope.to_string(), area.to_string());
        let mut cache = self.cache.lock().expect("logger cache poisoned");
        cache
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Logger {
                    scope: scope.to_string(),
                    area: area.to_string(),
                    sink: Arc::clone(&self.sink),
                })
            })
            .clone()
    }

    /// The sink loggers write to.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.sink)
    }

    /// Drop every cached instance. Called on `onComplete`.
    pub fn clear(&self) {
        self.cache.lock().expect("logger cache poisoned").clear();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Collecting sink shared by unit tests across the crate.

    use super::{LogLevel, LogSink};
    use std::sync::Mutex;

    /// Sink that records every emitted line for assertions.
    #[derive(Default)]
    pub struct CollectingSink {
        /// Captured `(level, line)` pairs.
        pub lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl LogSink for CollectingSink {
        fn emit(&self, level: LogLevel, line: &str) {
            self.lines.lock().unwrap().push((level, line.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CollectingSink;
    use super::*;

    #[test]
    fn test_factory_returns_identical_instance_for_identical_keys() {
        let factory = LoggerFactory::new(Arc::new(CollectingSink::default()));
        let first = factory.create("electron-service", "bridge");
        let second = factory.create("electron-service", "bridge");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_factory_distinguishes_keys() {
        let factory = LoggerFactory::new(Arc::new(CollectingSink::default()));
        let bridge = factory.create("electron-service", "bridge");
        let mocks = factory.create("electron-service", "mock");
        assert!(!Arc::ptr_eq(&bridge, &mocks));
    }

    #[test]
    fn test_clear_resets_cache() {
        let factory = LoggerFactory::new(Arc::new(CollectingSink::default()));
        let first = factory.create("s", "a");
        factory.clear();
        let second = factory.create("s", "a");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_logger_prefixes_lines() {
        let sink = Arc::new(CollectingSink::default());
        let factory = LoggerFactory::new(sink.clone());
        factory.create("tauri-service", "driver").warn("slow start");

        let lines = sink.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, LogLevel::Warn);
        assert_eq!(lines[0].1, "[tauri-service:driver] slow start");
    }

    #[test]
    fn test_file_sink_appends_formatted_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();
        sink.emit(LogLevel::Error, "[Electron:MainProcess] boom");

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        assert!(contents.contains(" ERROR [Electron:MainProcess] boom"));
        let name = sink.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("wdio-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        init_logging();
    }
}
