// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Out-of-process driver supervision for Tauri sessions.

pub mod platform_webdriver;
pub mod tauri_driver;

pub use platform_webdriver::{PackageManager, PlatformDriverCheck, check_platform_webdriver};
pub use tauri_driver::TauriDriverSupervisor;
