// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

//! Host platform capabilities
//!
//! The operating system owns both the persisted tunnel profiles and the
//! tunnel connection itself. These traits are the only surface the
//! controller consumes, so each platform (or a test double) plugs in by
//! implementing them.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;
use crate::types::{ConnectionStatus, StartOptions, TunnelProfile};

/// Stream of status changes for one profile's connection
pub type StatusStream = BoxStream<'static, ConnectionStatus>;

/// The platform's persistent store of tunnel profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// List every profile registered by this application, in store order
    async fn load_all(&self) -> Result<Vec<TunnelProfile>>;

    /// Construct a new, unsaved profile
    fn create(&self) -> TunnelProfile {
        TunnelProfile::new()
    }

    /// Persist a profile, replacing any stored version with the same id
    async fn save(&self, profile: &TunnelProfile) -> Result<()>;

    /// Refresh a profile in place from its persisted version
    async fn reload(&self, profile: &mut TunnelProfile) -> Result<()>;
}

/// The platform's connection object for a saved profile
pub trait TunnelConnection: Send + Sync {
    /// Current status of the profile's connection
    fn status(&self, profile: &TunnelProfile) -> ConnectionStatus;

    /// Ask the platform to bring the tunnel up
    fn start(&self, profile: &TunnelProfile, options: Option<&StartOptions>) -> Result<()>;

    /// Ask the platform to tear the tunnel down
    fn stop(&self, profile: &TunnelProfile);

    /// Subscribe to status changes of the profile's connection
    fn status_updates(&self, profile: &TunnelProfile) -> StatusStream;
}
