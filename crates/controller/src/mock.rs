// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

//! Recording test double for the platform capabilities

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use vpn_tunnel_common::{
    ConnectionStatus, Error, ProfileStore, Result, StartOptions, StatusStream, TunnelConnection,
    TunnelProfile,
};

/// A platform call, in the order the controller issued it
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LoadAll,
    Create,
    Save(TunnelProfile),
    Reload(Uuid),
    Start(Uuid, Option<StartOptions>),
    Stop(Uuid),
    Subscribe(Uuid),
}

#[derive(Debug)]
struct MockState {
    profiles: Vec<TunnelProfile>,
    status: ConnectionStatus,
    calls: Vec<Call>,
    fail_list: bool,
    fail_save: bool,
    fail_reload: bool,
    fail_start: bool,
}

pub struct MockPlatform {
    state: Mutex<MockState>,
    status_tx: broadcast::Sender<ConnectionStatus>,
}

impl MockPlatform {
    /// Platform with no registered profile and an invalid connection
    pub fn new() -> Arc<Self> {
        let (status_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(MockState {
                profiles: Vec::new(),
                status: ConnectionStatus::Invalid,
                calls: Vec::new(),
                fail_list: false,
                fail_save: false,
                fail_reload: false,
                fail_start: false,
            }),
            status_tx,
        })
    }

    /// Platform with one already registered profile
    pub fn with_profile(status: ConnectionStatus) -> (Arc<Self>, TunnelProfile) {
        let platform = Self::new();
        let mut profile = TunnelProfile::new();
        profile.name = Some("Existing".to_string());
        platform.add_profile(profile.clone());
        platform.set_status(status);
        (platform, profile)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn add_profile(&self, profile: TunnelProfile) {
        self.state().profiles.push(profile);
    }

    /// Change the connection status without notifying subscribers
    pub fn set_status(&self, status: ConnectionStatus) {
        self.state().status = status;
    }

    /// Change the connection status and notify subscribers
    pub fn emit(&self, status: ConnectionStatus) {
        self.set_status(status);
        let _ = self.status_tx.send(status);
    }

    pub fn fail_list(&self) {
        self.state().fail_list = true;
    }

    pub fn fail_save(&self) {
        self.state().fail_save = true;
    }

    pub fn fail_reload(&self) {
        self.state().fail_reload = true;
    }

    pub fn fail_start(&self) {
        self.state().fail_start = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn profiles(&self) -> Vec<TunnelProfile> {
        self.state().profiles.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl ProfileStore for MockPlatform {
    async fn load_all(&self) -> Result<Vec<TunnelProfile>> {
        self.record(Call::LoadAll);
        let state = self.state();
        if state.fail_list {
            return Err(Error::ProfileList("preferences unavailable".to_string()));
        }
        Ok(state.profiles.clone())
    }

    fn create(&self) -> TunnelProfile {
        self.record(Call::Create);
        TunnelProfile::new()
    }

    async fn save(&self, profile: &TunnelProfile) -> Result<()> {
        self.record(Call::Save(profile.clone()));
        let mut state = self.state();
        if state.fail_save {
            return Err(Error::Save("permission denied".to_string()));
        }
        match state.profiles.iter().position(|p| p.id == profile.id) {
            Some(index) => state.profiles[index] = profile.clone(),
            None => state.profiles.push(profile.clone()),
        }
        Ok(())
    }

    async fn reload(&self, profile: &mut TunnelProfile) -> Result<()> {
        self.record(Call::Reload(profile.id));
        let state = self.state();
        if state.fail_reload {
            return Err(Error::Reload("configuration is stale".to_string()));
        }
        let stored = state
            .profiles
            .iter()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| Error::Reload(format!("profile {} is not saved", profile.id)))?;
        *profile = stored.clone();
        Ok(())
    }
}

impl TunnelConnection for MockPlatform {
    fn status(&self, _profile: &TunnelProfile) -> ConnectionStatus {
        self.state().status
    }

    fn start(&self, profile: &TunnelProfile, options: Option<&StartOptions>) -> Result<()> {
        self.record(Call::Start(profile.id, options.cloned()));
        let mut state = self.state();
        if state.fail_start {
            return Err(Error::Start("provider extension not found".to_string()));
        }
        state.status = ConnectionStatus::Connecting;
        Ok(())
    }

    fn stop(&self, profile: &TunnelProfile) {
        self.record(Call::Stop(profile.id));
        self.state().status = ConnectionStatus::Disconnecting;
    }

    fn status_updates(&self, profile: &TunnelProfile) -> StatusStream {
        self.record(Call::Subscribe(profile.id));
        BroadcastStream::new(self.status_tx.subscribe())
            .filter_map(|update| futures_util::future::ready(update.ok()))
            .boxed()
    }
}
