// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

//! Tunnel controller
//!
//! Keeps a single tunnel profile registered with the platform and drives
//! its connection. Every public operation is fire-and-forget: work runs on
//! a spawned task, failures are logged, and callers learn the outcome by
//! reading [`TunnelController::status`] or listening for status change
//! events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Context;
use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use vpn_tunnel_common::{
    ConnectionStatus, ControllerConfig, FileProfileStore, ProfileStore, ProtocolConfiguration,
    StartOptions, StatusStream, TunnelConnection, TunnelDescription, TunnelProfile,
};

use crate::events::{ObserverId, StatusChanged, StatusNotifier, StatusObserver};

/// Handle to the tunnel controller. Cloning is cheap and shares the state.
#[derive(Clone)]
pub struct TunnelController {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn ProfileStore>,
    connection: Arc<dyn TunnelConnection>,
    /// Provider extension assigned to profiles this controller creates
    provider_bundle_identifier: Option<String>,
    state: Mutex<ControllerState>,
    /// Serializes start/stop sequences
    operation: tokio::sync::Mutex<()>,
    /// Last status observed from the platform (None until first observed)
    status_tx: watch::Sender<Option<ConnectionStatus>>,
    notifier: StatusNotifier<TunnelController>,
}

#[derive(Debug, Default)]
struct ControllerState {
    description: TunnelDescription,
    /// Set once the status subscription is installed; never reset
    observer_registered: bool,
    status_watcher: Option<JoinHandle<()>>,
}

impl TunnelController {
    /// Create a controller and start observing the registered profile, if any.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: Arc<dyn ProfileStore>,
        connection: Arc<dyn TunnelConnection>,
        description: TunnelDescription,
    ) -> Self {
        Self::build(store, connection, description, None)
    }

    /// Create a controller from configuration, using `store` for profiles
    pub fn from_config(
        config: &ControllerConfig,
        store: Arc<dyn ProfileStore>,
        connection: Arc<dyn TunnelConnection>,
    ) -> Self {
        Self::build(
            store,
            connection,
            config.description(),
            config.provider_bundle_identifier.clone(),
        )
    }

    /// Create a controller from configuration, persisting profiles as files
    /// in the configured profiles directory
    pub fn with_file_store(
        config: &ControllerConfig,
        connection: Arc<dyn TunnelConnection>,
    ) -> anyhow::Result<Self> {
        let dir = config
            .profiles_dir()
            .context("Failed to determine profiles directory")?;
        let store = Arc::new(FileProfileStore::new(dir));
        Ok(Self::from_config(config, store, connection))
    }

    fn build(
        store: Arc<dyn ProfileStore>,
        connection: Arc<dyn TunnelConnection>,
        description: TunnelDescription,
        provider_bundle_identifier: Option<String>,
    ) -> Self {
        let (status_tx, _) = watch::channel(None);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            // Observers get a handle per event; the notifier only keeps a weak one
            let weak = weak.clone();
            Inner {
                store,
                connection,
                provider_bundle_identifier,
                state: Mutex::new(ControllerState {
                    description,
                    ..Default::default()
                }),
                operation: tokio::sync::Mutex::new(()),
                status_tx,
                notifier: StatusNotifier::new(move || {
                    weak.upgrade().map(|inner| TunnelController { inner })
                }),
            }
        });
        let controller = Self { inner };

        controller.refresh_status();
        controller
    }

    /// Set the name and server address applied on the next start
    pub fn set_description(&self, name: impl Into<String>, server_address: impl Into<String>) {
        self.inner.state().description = TunnelDescription::new(name, server_address);
    }

    pub fn description(&self) -> TunnelDescription {
        self.inner.state().description.clone()
    }

    /// Last connection status observed from the platform
    pub fn status(&self) -> Option<ConnectionStatus> {
        *self.inner.status_tx.borrow()
    }

    /// Watch the mirrored connection status
    pub fn watch_status(&self) -> watch::Receiver<Option<ConnectionStatus>> {
        self.inner.status_tx.subscribe()
    }

    /// Subscribe to status change events
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChanged> {
        self.inner.notifier.subscribe()
    }

    /// Register an observer called on every status change.
    ///
    /// The observer is handed this controller on each call. An observer that
    /// captures a controller handle itself keeps the controller alive until
    /// it is removed or [`shutdown`](Self::shutdown) is called.
    pub fn add_observer<O>(&self, observer: O) -> ObserverId
    where
        O: StatusObserver<TunnelController> + 'static,
    {
        self.inner.notifier.add_observer(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.notifier.remove_observer(id)
    }

    /// Stop observing the platform status and unregister every observer.
    ///
    /// The mirrored status stays at its last value. The subscription is not
    /// reinstalled afterwards.
    pub fn shutdown(&self) {
        self.inner.notifier.clear_observers();
        if let Some(watcher) = self.inner.state().status_watcher.take() {
            watcher.abort();
        }
        debug!("Tunnel controller shut down");
    }

    /// Ensure the profile exists and is configured, then start the tunnel
    /// if it is not already running.
    ///
    /// The returned handle only tells when the attempt is over.
    pub fn start_tunnel(&self, options: Option<StartOptions>) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.start(options).await })
    }

    /// Stop the tunnel of the registered profile. Never creates a profile.
    pub fn stop_tunnel(&self) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.stop().await })
    }

    /// Re-read the connection status from the platform
    pub fn refresh_status(&self) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.refresh().await })
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn start(self: &Arc<Self>, options: Option<StartOptions>) {
        let _guard = self.operation.lock().await;

        let profile = match self.prepare_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                error!("Tunnel error: {}", e);
                return;
            }
        };

        let status = self.connection.status(&profile);
        if status.can_start() {
            info!("Starting tunnel {} (status: {})", profile.id, status);
            if let Err(e) = self.connection.start(&profile, options.as_ref()) {
                error!("Start tunnel error: {}", e);
            }
        } else {
            debug!("Tunnel {} is {}, not issuing start", profile.id, status);
        }

        // Refresh even when the start request failed
        self.refresh().await;
    }

    async fn stop(&self) {
        let _guard = self.operation.lock().await;

        match self.current_profile().await {
            Ok(Some(profile)) => {
                info!("Stopping tunnel {}", profile.id);
                self.connection.stop(&profile);
            }
            Ok(None) => debug!("No tunnel profile registered, nothing to stop"),
            Err(e) => warn!("Failed to look up tunnel profile: {}", e),
        }
    }

    async fn refresh(self: &Arc<Self>) {
        let profile = match self.current_profile().await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!("No tunnel profile registered, status unchanged");
                return;
            }
            Err(e) => {
                warn!("Failed to look up tunnel profile: {}", e);
                return;
            }
        };

        self.ensure_status_watcher(&profile);
        self.publish_status(self.connection.status(&profile));
    }

    /// First registered profile. An empty store is `Ok(None)`, not an error.
    async fn current_profile(&self) -> vpn_tunnel_common::Result<Option<TunnelProfile>> {
        Ok(self.store.load_all().await?.into_iter().next())
    }

    /// Create-or-fetch, configure, save, then reload the profile.
    /// Each step runs only if the previous one succeeded.
    async fn prepare_profile(&self) -> vpn_tunnel_common::Result<TunnelProfile> {
        let mut profile = match self.current_profile().await? {
            Some(profile) => {
                debug!("Using existing tunnel profile {}", profile.id);
                profile
            }
            None => self.create_profile(),
        };

        self.configure(&mut profile);

        self.store.save(&profile).await?;
        debug!("Saved tunnel profile {}", profile.id);

        self.store.reload(&mut profile).await?;
        debug!("Reloaded tunnel profile {}", profile.id);

        Ok(profile)
    }

    fn create_profile(&self) -> TunnelProfile {
        let mut profile = self.store.create();
        if let Some(bundle_id) = &self.provider_bundle_identifier {
            profile
                .protocol
                .get_or_insert_with(ProtocolConfiguration::default)
                .provider_bundle_identifier = Some(bundle_id.clone());
        }
        debug!("Created tunnel profile {}", profile.id);
        profile
    }

    fn configure(&self, profile: &mut TunnelProfile) {
        let description = self.state().description.clone();

        profile.enabled = true;
        profile.on_demand_enabled = true;
        profile.name = Some(description.name);
        profile
            .protocol
            .get_or_insert_with(ProtocolConfiguration::default)
            .server_address = Some(description.server_address);
    }

    /// Install the platform status subscription, at most once per controller
    fn ensure_status_watcher(self: &Arc<Self>, profile: &TunnelProfile) {
        let mut state = self.state();
        if state.observer_registered {
            return;
        }
        state.observer_registered = true;

        let updates = self.connection.status_updates(profile);
        state.status_watcher = Some(tokio::spawn(watch_status_updates(
            Arc::downgrade(self),
            updates,
        )));
        debug!("Observing status of tunnel profile {}", profile.id);
    }

    fn publish_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(Some(status));
        self.notifier.notify();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(watcher) = state.status_watcher.take() {
            watcher.abort();
        }
    }
}

async fn watch_status_updates(inner: Weak<Inner>, mut updates: StatusStream) {
    while let Some(status) = updates.next().await {
        let Some(controller) = inner.upgrade() else {
            break;
        };
        debug!("Tunnel status changed: {}", status);
        controller.publish_status(status);
    }
    debug!("Tunnel status stream ended");
}
