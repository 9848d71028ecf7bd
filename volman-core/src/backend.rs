//! Capability seam between the watcher and a concrete bus binding
//!
//! The watcher only ever talks to these traits; the UDisks2 binding in
//! `volman-udisks` is the production implementation and the tests script
//! fakes against them. The connect/attach split mirrors the two recovery
//! scopes: losing the transport restarts both phases, losing just the
//! service keeps the transport and restarts the attach phase.

use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::Stream;
use futures::task::{Context, Poll};
use tokio::sync::mpsc;
use volman_types::DeviceSnapshot;

/// Operations against an attached device service.
pub trait VolumeOps: Send + Sync {
    /// Snapshot every device the service currently exposes.
    fn enumerate(&self) -> BoxFuture<'_, Result<Vec<DeviceSnapshot>>>;

    /// Snapshot one device. `Ok(None)` when the device is gone; transient
    /// read failures are reported the same way, the next notification
    /// re-derives the state.
    fn snapshot(&self, id: &str) -> BoxFuture<'_, Result<Option<DeviceSnapshot>>>;

    fn mount(&self, id: &str) -> BoxFuture<'_, Result<()>>;
    fn unmount(&self, id: &str) -> BoxFuture<'_, Result<()>>;
}

/// Notifications a binding feeds into the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A device (or a displayable facet of it) appeared.
    DeviceAdded(String),
    /// A device disappeared outright.
    DeviceRemoved(String),
    /// Some property of a device changed; the watcher re-derives mount
    /// state and busyness from a fresh snapshot if it tracks the id.
    DeviceChanged(String),
    /// The service's bus name gained or lost its owner.
    ServiceOwnerChanged(bool),
    /// The bus connection itself is gone.
    TransportClosed,
}

/// Stream of [`BackendEvent`]s for one attached service session.
pub struct BackendEvents {
    receiver: mpsc::Receiver<BackendEvent>,
}

impl BackendEvents {
    pub fn new(receiver: mpsc::Receiver<BackendEvent>) -> Self {
        Self { receiver }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<BackendEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }
}

impl Stream for BackendEvents {
    type Item = BackendEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// What a successful attach hands to the watcher.
pub struct ServiceLink {
    pub ops: Arc<dyn VolumeOps>,
    pub events: BackendEvents,
}

/// An established bus connection.
pub trait BackendTransport: Send + Sync {
    /// Acquire a session with the device service: subscribe to its
    /// notifications and return the operations handle. Fails while the
    /// service is unavailable; safe to call repeatedly.
    fn attach(&self) -> BoxFuture<'_, Result<ServiceLink>>;
}

/// Entry point to a concrete bus binding.
pub trait BackendConnector: Send + Sync {
    /// Establish the bus connection.
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn BackendTransport>>>;
}
