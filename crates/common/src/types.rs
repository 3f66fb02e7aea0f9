// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

// Common types for VPN Tunnel Controller

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Options handed to the platform when a tunnel is started.
///
/// The controller never inspects them; they are forwarded to the tunnel
/// provider as-is.
pub type StartOptions = BTreeMap<String, serde_json::Value>;

/// Status of the system tunnel connection, as reported by the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Invalid,       // profile is not usable (never saved, or removed)
    Disconnected,  // no tunnel running
    Connecting,    // provider is bringing the tunnel up
    Connected,     // tunnel is up
    Reasserting,   // tunnel is re-establishing after a network change
    Disconnecting, // provider is tearing the tunnel down
}

impl ConnectionStatus {
    /// Whether a start request may be issued from this status
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Disconnected | ConnectionStatus::Invalid
        )
    }

    /// Check if the status represents an active connection
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connected | ConnectionStatus::Reasserting
        )
    }

    /// Check if the status represents a transitional state
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting
                | ConnectionStatus::Reasserting
                | ConnectionStatus::Disconnecting
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Invalid => "invalid",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reasserting => "reasserting",
            ConnectionStatus::Disconnecting => "disconnecting",
        };
        f.write_str(label)
    }
}

/// A tunnel profile registered with the platform's configuration store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TunnelProfile {
    /// Unique profile identifier
    pub id: Uuid,
    /// Name shown in the system VPN settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the profile is the enabled system VPN
    #[serde(default)]
    pub enabled: bool,
    /// Whether the system may bring the tunnel up on its own
    #[serde(default)]
    pub on_demand_enabled: bool,
    /// Profile creation timestamp
    pub created_at: DateTime<Utc>,
    /// Profile last modification timestamp
    pub modified_at: DateTime<Utc>,
    /// Provider protocol settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolConfiguration>,
}

/// Protocol settings handed to the tunnel provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProtocolConfiguration {
    /// Address of the VPN server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
    /// Identifier of the provider extension that implements the tunnel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_bundle_identifier: Option<String>,
    /// Provider-specific settings
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_configuration: BTreeMap<String, serde_json::Value>,
}

impl TunnelProfile {
    /// Create an empty, unconfigured profile with an empty protocol configuration
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: None,
            enabled: false,
            on_demand_enabled: false,
            created_at: now,
            modified_at: now,
            protocol: Some(ProtocolConfiguration::default()),
        }
    }

    /// Server address of the protocol configuration, if any
    pub fn server_address(&self) -> Option<&str> {
        self.protocol
            .as_ref()
            .and_then(|p| p.server_address.as_deref())
    }
}

impl Default for TunnelProfile {
    fn default() -> Self {
        Self::new()
    }
}
