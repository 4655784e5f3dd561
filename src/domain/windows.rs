// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Window handle shapes.

use serde::{Deserialize, Serialize};

/// Opaque window handle supplied by the underlying driver.
pub type WindowHandle = String;

/// Classification of a driver-reported window target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// A regular page window.
    Page,
    /// An extension background page.
    BackgroundPage,
    /// Anything else the driver reports.
    Other,
}

impl WindowKind {
    /// Map a CDP/driver target `type` string.
    #[must_use]
    pub fn from_target_type(target_type: &str) -> Self {
        match target_type {
            "page" => Self::Page,
            "background_page" => Self::BackgroundPage,
            _ => Self::Other,
        }
    }
}

/// Descriptive metadata for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Driver-issued handle.
    pub handle: WindowHandle,
    /// Window classification.
    pub kind: WindowKind,
    /// Current URL, when the driver exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Current title, when the driver exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
