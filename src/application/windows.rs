// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Window tracking across the session lifecycle.
//!
//! Tests open and close windows as a side effect of ordinary commands; the
//! tracker reconciles the driver's focused window around every command so
//! user code never lands in a dead handle. Policy: keep the current handle
//! while it remains available, otherwise fall back to the first available
//! window.

use crate::domain::errors::WebDriverError;
use crate::domain::session_port::DriverSession;
use crate::domain::windows::{WindowHandle, WindowInfo, WindowKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Supplies the set of currently available windows.
///
/// The sole abstract operation; every policy method is implemented on top
/// of it by [`WindowTracker`].
#[async_trait]
pub trait WindowSource: Send + Sync {
    /// Handles of every window the driver currently reports.
    async fn get_available_windows(&self) -> Result<Vec<WindowHandle>, WebDriverError>;

    /// Metadata for one window, when retrievable.
    async fn get_window_info(&self, handle: &str) -> Result<WindowInfo, WebDriverError>;

    /// Focus the given window.
    async fn activate(&self, handle: &str) -> Result<(), WebDriverError>;
}

/// Window source over a WebDriver session.
pub struct DriverWindowSource {
    session: Arc<dyn DriverSession>,
}

impl DriverWindowSource {
    /// Source reading from the given session.
    #[must_use]
    pub fn new(session: Arc<dyn DriverSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl WindowSource for DriverWindowSource {
    async fn get_available_windows(&self) -> Result<Vec<WindowHandle>, WebDriverError> {
        self.session.window_handles().await
    }

    async fn get_window_info(&self, handle: &str) -> Result<WindowInfo, WebDriverError> {
        // Window metadata is only observable for the focused window, so
        // peeking switches focus briefly when needed.
        let current = self.session.current_window_handle().await.ok();
        if current.as_deref() != Some(handle) {
            self.session.switch_to_window(handle).await?;
        }
        let info = WindowInfo {
            handle: handle.to_string(),
            kind: WindowKind::Page,
            url: self.session.url().await.ok(),
            title: self.session.title().await.ok(),
        };
        if let Some(previous) = current.filter(|p| p != handle) {
            let _ = self.session.switch_to_window(&previous).await;
        }
        Ok(info)
    }

    async fn activate(&self, handle: &str) -> Result<(), WebDriverError> {
        self.session.switch_to_window(handle).await
    }
}

/// Tracks the active window for one instance.
pub struct WindowTracker {
    source: Arc<dyn WindowSource>,
    current: Mutex<Option<WindowHandle>>,
}

impl WindowTracker {
    /// Tracker over a window source with no current handle yet.
    #[must_use]
    pub fn new(source: Arc<dyn WindowSource>) -> Self {
        Self {
            source,
            current: Mutex::new(None),
        }
    }

    /// The handle user commands are currently targeting, if any.
    #[must_use]
    pub fn get_current_handle(&self) -> Option<WindowHandle> {
        self.current.lock().expect("window state poisoned").clone()
    }

    /// Record the handle user commands target.
    pub fn set_current_handle(&self, handle: &str) {
        *self.current.lock().expect("window state poisoned") = Some(handle.to_string());
    }

    /// Resolve the handle that should be active right now: the current one
    /// while it is still available, else the first available window.
    ///
    /// # Errors
    ///
    /// Propagates driver failures from the window listing.
    pub async fn get_active_handle(&self) -> Result<Option<WindowHandle>, WebDriverError> {
        let available = self.source.get_available_windows().await?;
        let current = self.get_current_handle();
        Ok(match current {
            Some(handle) if available.contains(&handle) => Some(handle),
            _ => available.first().cloned(),
        })
    }

    /// Reconcile the current handle against the available set, focusing
    /// the replacement when a change is needed.
    ///
    /// Returns `true` when the current handle changed. When every window
    /// is gone the stale handle is retained in state (and reported invalid
    /// by [`WindowTracker::is_handle_valid`]).
    ///
    /// # Errors
    ///
    /// Propagates driver failures from the listing or the focus switch.
    pub async fn update_active_handle(&self) -> Result<bool, WebDriverError> {
        let available = self.source.get_available_windows().await?;
        let current = self.get_current_handle();

        if let Some(handle) = &current
            && available.contains(handle)
        {
            return Ok(false);
        }

        let Some(replacement) = available.first().cloned() else {
            return Ok(false);
        };

        self.source.activate(&replacement).await?;
        *self.current.lock().expect("window state poisoned") = Some(replacement);
        Ok(true)
    }

    /// Whether a handle is in the currently available set.
    ///
    /// # Errors
    ///
    /// Propagates driver failures from the listing.
    pub async fn is_handle_valid(&self, handle: &str) -> Result<bool, WebDriverError> {
        Ok(self
            .source
            .get_available_windows()
            .await?
            .iter()
            .any(|h| h == handle))
    }

    /// Metadata for one window.
    ///
    /// # Errors
    ///
    /// Propagates driver failures.
    pub async fn get_window_info(&self, handle: &str) -> Result<WindowInfo, WebDriverError> {
        self.source.get_window_info(handle).await
    }
}

/// Per-instance window trackers for a multiremote session.
///
/// State is disjoint: reconciling one instance never touches another.
#[derive(Default)]
pub struct MultiRemoteWindowManager {
    trackers: HashMap<String, Arc<WindowTracker>>,
}

impl MultiRemoteWindowManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance's tracker.
    pub fn register(&mut self, instance: &str, tracker: Arc<WindowTracker>) {
        self.trackers.insert(instance.to_string(), tracker);
    }

    /// Remove an instance's tracker.
    pub fn unregister(&mut self, instance: &str) {
        self.trackers.remove(instance);
    }

    /// Tracker for one instance.
    #[must_use]
    pub fn get(&self, instance: &str) -> Option<Arc<WindowTracker>> {
        self.trackers.get(instance).cloned()
    }

    /// Registered instance names.
    #[must_use]
    pub fn instances(&self) -> Vec<String> {
        self.trackers.keys().cloned().collect()
    }

    /// Reconcile every instance; returns how many changed their active
    /// handle. Per-instance failures are skipped — a dying instance must
    /// not block the others.
    pub async fn ensure_all_active_windows(&self) -> usize {
        let mut changed = 0;
        for tracker in self.trackers.values() {
            if let Ok(true) = tracker.update_active_handle().await {
                changed += 1;
            }
        }
        changed
    }
}
