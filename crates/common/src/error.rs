// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

// Error types for VPN Tunnel Controller

use thiserror::Error;
use uuid::Uuid;

/// Errors reported by the platform capabilities and the profile store
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load tunnel profiles: {0}")]
    ProfileList(String),

    #[error("Failed to save tunnel profile: {0}")]
    Save(String),

    #[error("Failed to reload tunnel profile: {0}")]
    Reload(String),

    #[error("Failed to start tunnel: {0}")]
    Start(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
