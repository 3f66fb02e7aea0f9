// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

// VPN Tunnel Controller - Config Module
// Controller configuration (display name, server address, profile location)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::network::is_valid_server_address;
use crate::profile_store::default_profiles_dir;

/// Name and server address applied to the tunnel profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelDescription {
    /// Name shown in the system VPN settings
    pub name: String,
    /// Address of the VPN server
    pub server_address: String,
}

impl TunnelDescription {
    pub fn new(name: impl Into<String>, server_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_address: server_address.into(),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Name shown in the system VPN settings
    #[serde(default = "default_name")]
    pub name: String,

    /// Address of the VPN server (left empty until the user sets one)
    #[serde(default)]
    pub server_address: String,

    /// Provider extension applied to newly created profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_bundle_identifier: Option<String>,

    /// Directory for the file-backed profile store
    /// Default: ~/.config/vpn-tunnel-controller/profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
}

fn default_name() -> String {
    "MyVPN".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            server_address: String::new(),
            provider_bundle_identifier: None,
            profiles_dir: None,
        }
    }
}

impl ControllerConfig {
    /// Validate the controller configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Tunnel name cannot be empty");
        }

        if !self.server_address.is_empty() && !is_valid_server_address(&self.server_address) {
            anyhow::bail!(
                "Invalid server address '{}': expected an IP address or hostname, optionally with a port",
                self.server_address
            );
        }

        if let Some(bundle_id) = &self.provider_bundle_identifier {
            if bundle_id.trim().is_empty() {
                anyhow::bail!("Provider bundle identifier cannot be empty when set");
            }
        }

        Ok(())
    }

    /// Load controller configuration from the default location,
    /// writing the defaults there on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("No controller configuration found, using defaults");
            info!("Configuration will be saved to: {}", config_path.display());
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load controller configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .context(format!("Failed to parse {}", path.display()))?;

        config
            .validate()
            .context("Configuration validation failed")?;

        info!("Loaded controller configuration from: {}", path.display());
        Ok(config)
    }

    /// Save controller configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }

        let contents =
            toml::to_string_pretty(self).context("Failed to serialize controller configuration")?;

        fs::write(path, contents).context("Failed to write controller configuration")?;

        info!("Saved controller configuration to: {}", path.display());
        Ok(())
    }

    /// Get the path to the controller configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("vpn-tunnel-controller").join("controller.toml"))
    }

    /// Directory of the file-backed profile store
    pub fn profiles_dir(&self) -> Result<PathBuf> {
        match &self.profiles_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_profiles_dir()?),
        }
    }

    pub fn description(&self) -> TunnelDescription {
        TunnelDescription::new(self.name.clone(), self.server_address.clone())
    }
}
