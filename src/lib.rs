// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! WebDriver service layer for testing Electron and Tauri desktop applications.
//!
//! The crate wires a WebDriver session to the internals of a native desktop
//! app: it locates and launches the built binary, bridges into the app's
//! main/backend process (Chrome DevTools Protocol for Electron, an in-app
//! plugin for Tauri), mocks native APIs inside that process, tracks windows
//! across single and multiremote sessions, captures console logs from every
//! process, and fires OS deeplinks at the running instance.
//!
//! Layering:
//! - [`domain`] — data shapes, sum-type errors, and pure policy. No I/O.
//! - [`infrastructure`] — filesystem, network, and child-process adapters.
//! - [`application`] — the service lifecycle and the command surface that
//!   user tests call.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::browser::DesktopBrowser;
pub use application::service::DesktopService;
pub use application::session::{cleanup_session, start_session};
pub use domain::errors::ServiceError;
pub use domain::options::{Framework, ServiceOptions};
