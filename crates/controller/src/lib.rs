// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

//! Controller for a single system-registered VPN tunnel
//!
//! The host platform owns the tunnel profile store and the tunnel itself.
//! This crate keeps exactly one profile configured and persisted, issues
//! start/stop requests against it, and mirrors the platform's connection
//! status to the application through a status notifier.

pub mod controller;
pub mod events;
pub mod logging;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use controller::TunnelController;
pub use events::{ObserverId, StatusChanged, StatusNotifier, StatusObserver};

// Re-export types from common crate for convenience
pub use vpn_tunnel_common::{
    ConnectionStatus, ControllerConfig, FileProfileStore, ProfileStore, StartOptions,
    TunnelConnection, TunnelDescription, TunnelProfile,
};
