// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

//! Status change notification
//!
//! Every update of the mirrored connection status is republished as a
//! payload-free [`StatusChanged`] event. Observers are handed the
//! controller when they are called and re-read the status from it, so they
//! never need to hold a handle of their own.
//!
//! Delivery happens on a single dispatch task, so observers run one at a
//! time, in registration order, and never concurrently with each other.
//! UI layers can rely on that the same way they would rely on a main
//! thread.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

/// Capacity of the broadcast channel for async subscribers
const EVENT_CAPACITY: usize = 64;

/// Emitted whenever the mirrored connection status is updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChanged;

/// Framework-agnostic observer of status changes
///
/// `H` is the handle passed to the observer, the
/// [`TunnelController`](crate::TunnelController) for controller observers.
/// Implemented for any `Fn(&H)` closure.
pub trait StatusObserver<H>: Send + Sync {
    /// Called on the dispatch task after the mirrored status was updated
    fn on_status_changed(&self, handle: &H);
}

impl<H, F> StatusObserver<H> for F
where
    F: Fn(&H) + Send + Sync,
{
    fn on_status_changed(&self, handle: &H) {
        self(handle)
    }
}

/// Handle returned by [`StatusNotifier::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

type ObserverList<H> = Arc<RwLock<Vec<(ObserverId, Arc<dyn StatusObserver<H>>)>>>;

/// Publishes [`StatusChanged`] to registered observers and broadcast subscribers
pub struct StatusNotifier<H> {
    dispatch_tx: mpsc::UnboundedSender<StatusChanged>,
    observers: ObserverList<H>,
    events_tx: broadcast::Sender<StatusChanged>,
}

impl<H: Send + 'static> StatusNotifier<H> {
    /// Create a notifier and spawn its dispatch task.
    ///
    /// `resolve` produces the handle passed to observers for each event.
    /// It should hold only a weak reference to whatever owns the notifier;
    /// once it returns `None` the dispatcher stops. The dispatch task also
    /// exits once the notifier is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<R>(resolve: R) -> Self
    where
        R: Fn() -> Option<H> + Send + 'static,
    {
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let observers: ObserverList<H> = Arc::new(RwLock::new(Vec::new()));

        tokio::spawn(dispatch_loop(
            dispatch_rx,
            observers.clone(),
            events_tx.clone(),
            resolve,
        ));

        Self {
            dispatch_tx,
            observers,
            events_tx,
        }
    }

    /// Queue a status change event for delivery
    pub fn notify(&self) {
        if self.dispatch_tx.send(StatusChanged).is_err() {
            debug!("Status dispatcher has stopped, dropping status change event");
        }
    }

    /// Subscribe to status change events
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChanged> {
        self.events_tx.subscribe()
    }

    /// Register an observer; it is called for every subsequent event
    pub fn add_observer<O>(&self, observer: O) -> ObserverId
    where
        O: StatusObserver<H> + 'static,
    {
        let id = ObserverId(Uuid::new_v4());
        let observer: Arc<dyn StatusObserver<H>> = Arc::new(observer);
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Unregister every observer, releasing whatever they captured
    pub fn clear_observers(&self) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

async fn dispatch_loop<H, R>(
    mut dispatch_rx: mpsc::UnboundedReceiver<StatusChanged>,
    observers: ObserverList<H>,
    events_tx: broadcast::Sender<StatusChanged>,
    resolve: R,
) where
    H: Send + 'static,
    R: Fn() -> Option<H> + Send + 'static,
{
    while let Some(event) = dispatch_rx.recv().await {
        // Snapshot so observers may add or remove observers while being called
        let snapshot: Vec<Arc<dyn StatusObserver<H>>> = observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        if !snapshot.is_empty() {
            let Some(handle) = resolve() else {
                break;
            };
            for observer in snapshot {
                observer.on_status_changed(&handle);
            }
        }

        if let Err(e) = events_tx.send(event) {
            debug!("No subscribers for status change event: {}", e);
        }
    }

    debug!("Status dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let notifier = StatusNotifier::new(|| Some(()));
        let mut rx = notifier.subscribe();

        notifier.notify();

        assert_eq!(rx.recv().await.unwrap(), StatusChanged);
    }

    #[tokio::test]
    async fn test_observers_called_in_registration_order() {
        let notifier = StatusNotifier::new(|| Some(()));
        let calls = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let calls = calls.clone();
            notifier.add_observer(move |_: &()| calls.lock().unwrap().push(label));
        }

        let mut rx = notifier.subscribe();
        notifier.notify();
        rx.recv().await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_observers_receive_resolved_handle() {
        let notifier = StatusNotifier::new(|| Some(7u32));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        notifier.add_observer(move |handle: &u32| sink.lock().unwrap().push(*handle));

        let mut rx = notifier.subscribe();
        notifier.notify();
        rx.recv().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_cleared_observers_are_released() {
        let notifier = StatusNotifier::new(|| Some(()));
        let captured = Arc::new(());
        let held = captured.clone();
        notifier.add_observer(move |_: &()| {
            assert!(Arc::strong_count(&held) > 0);
        });
        assert_eq!(Arc::strong_count(&captured), 2);

        notifier.clear_observers();

        assert_eq!(Arc::strong_count(&captured), 1);
    }

    #[tokio::test]
    async fn test_every_notify_is_delivered() {
        let notifier = StatusNotifier::new(|| Some(()));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        notifier.add_observer(move |_: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut rx = notifier.subscribe();
        for _ in 0..3 {
            notifier.notify();
        }
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_removed_observer_is_not_called() {
        let notifier = StatusNotifier::new(|| Some(()));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let id = notifier.add_observer(move |_: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(notifier.remove_observer(id));
        assert!(!notifier.remove_observer(id));

        let mut rx = notifier.subscribe();
        notifier.notify();
        rx.recv().await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_close_after_drop() {
        let notifier = StatusNotifier::new(|| Some(()));
        let mut rx = notifier.subscribe();
        drop(notifier);

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
