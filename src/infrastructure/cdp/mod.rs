// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Chrome DevTools Protocol client for the Electron main process.
//!
//! [`discovery`] polls the inspector's HTTP endpoint for a WebSocket URL;
//! [`bridge`] speaks the protocol over that socket.

pub mod bridge;
pub mod discovery;

pub use bridge::{CdpBridge, CdpBridgeConfig, SubscriptionId};
pub use discovery::{InspectorTarget, discover_main_target, select_main_target};
