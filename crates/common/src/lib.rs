// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

// VPN Tunnel Controller - Common Library
// Shared types, platform capabilities, and configuration structures

pub mod config;
pub mod error;
pub mod network;
pub mod platform;
pub mod profile_store;
pub mod types;

pub use config::{ControllerConfig, TunnelDescription};
pub use error::{Error, Result};
pub use network::is_valid_server_address;
pub use platform::{ProfileStore, StatusStream, TunnelConnection};
pub use profile_store::{default_profiles_dir, FileProfileStore};
pub use types::{ConnectionStatus, ProtocolConfiguration, StartOptions, TunnelProfile};

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
