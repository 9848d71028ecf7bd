//! Backend connection lifecycle
//!
//! States: disconnected, connecting, watching, lost, reconnecting.
//! Bootstrap (connect + attach + full enumeration) happens once and is
//! fatal on failure. Afterwards the watcher sits in a select loop over
//! backend notifications and user commands. Two loss triggers exist:
//! the service's bus name losing its owner (the transport survives, only
//! the attach phase is retried) and the transport itself going away
//! (connect and attach are both retried). Either way the registry is
//! cleared and rebuilt from a full enumeration once the backend is
//! reachable again; retries run on a fixed interval, forever.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use volman_types::{DeviceSnapshot, classify, should_display, should_mount};

use crate::backend::{BackendConnector, BackendEvent, BackendEvents, BackendTransport, ServiceLink, VolumeOps};
use crate::dispatch::{CommandDispatcher, ControlMessage, Controls};
use crate::error::WatchError;
use crate::registry::{DockFrame, VolumeRegistry};

/// Spacing between reconnection attempts. No backoff, no limit.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Watching,
    Lost,
    Reconnecting,
}

/// Everything tied to one successful connect + attach round. Dropped and
/// rebuilt wholesale on transport loss; the transport half survives a
/// service restart.
pub struct ActiveLink {
    transport: Box<dyn BackendTransport>,
    ops: Arc<dyn VolumeOps>,
    events: BackendEvents,
    dispatcher: CommandDispatcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loss {
    /// The service vanished from the bus; the transport is still good.
    Service,
    /// The bus connection itself is gone.
    Transport,
}

pub struct Watcher {
    connector: Arc<dyn BackendConnector>,
    registry: VolumeRegistry,
    state: LinkState,
    controls_rx: mpsc::UnboundedReceiver<ControlMessage>,
    feedback: mpsc::UnboundedSender<ControlMessage>,
}

impl Watcher {
    /// Build a watcher publishing redraw frames to `frames`. The returned
    /// [`Controls`] handle is what the input collaborator drives.
    pub fn new(
        connector: Arc<dyn BackendConnector>,
        frames: mpsc::UnboundedSender<DockFrame>,
    ) -> (Self, Controls) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controls = Controls::new(tx.clone());
        let watcher = Self {
            connector,
            registry: VolumeRegistry::new(frames),
            state: LinkState::Disconnected,
            controls_rx: rx,
            feedback: tx,
        };
        (watcher, controls)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Connect, attach and enumerate. Any failure here is fatal: without
    /// a backend at startup there is nothing to supervise.
    pub async fn bootstrap(&mut self) -> Result<ActiveLink, WatchError> {
        self.state = LinkState::Connecting;
        let transport = self
            .connector
            .connect()
            .await
            .map_err(WatchError::Initialization)?;

        let (ops, events) = self
            .attach_service(transport.as_ref())
            .await
            .map_err(WatchError::Initialization)?;

        Ok(self.activate(transport, ops, events))
    }

    /// Process notifications and commands until the process exits.
    pub async fn run(mut self, mut link: ActiveLink) {
        loop {
            let loss = self.watch(&mut link).await;
            link = self.recover(loss, link).await;
        }
    }

    /// Attach to the service and rebuild the registry from a full
    /// enumeration. Safe to call repeatedly; each attempt stands alone.
    async fn attach_service(
        &mut self,
        transport: &dyn BackendTransport,
    ) -> Result<(Arc<dyn VolumeOps>, BackendEvents)> {
        let ServiceLink { ops, events } = transport.attach().await?;
        self.sync_all(&ops).await?;

        // Commands queued while no backend was attached lost their race
        // with the disconnect; drop them.
        while self.controls_rx.try_recv().is_ok() {}

        Ok((ops, events))
    }

    fn activate(
        &mut self,
        transport: Box<dyn BackendTransport>,
        ops: Arc<dyn VolumeOps>,
        events: BackendEvents,
    ) -> ActiveLink {
        let dispatcher = CommandDispatcher::new(Arc::clone(&ops), self.feedback.clone());
        self.state = LinkState::Watching;
        info!(volumes = self.registry.len(), "watching device service");
        ActiveLink {
            transport,
            ops,
            events,
            dispatcher,
        }
    }

    async fn sync_all(&mut self, ops: &Arc<dyn VolumeOps>) -> Result<()> {
        for snapshot in ops.enumerate().await? {
            self.apply_snapshot(snapshot);
        }
        Ok(())
    }

    async fn watch(&mut self, link: &mut ActiveLink) -> Loss {
        loop {
            tokio::select! {
                maybe_event = link.events.next() => {
                    let Some(event) = maybe_event else {
                        warn!("backend event stream ended; clearing volumes");
                        self.registry.remove_all();
                        return Loss::Transport;
                    };
                    if let Some(loss) = self.handle_event(&link.ops, event).await {
                        return loss;
                    }
                }
                maybe_message = self.controls_rx.recv() => {
                    // Never `None`: we hold a sender for dispatcher feedback.
                    if let Some(message) = maybe_message {
                        self.handle_control(link, message);
                    }
                }
            }
        }
    }

    async fn handle_event(
        &mut self,
        ops: &Arc<dyn VolumeOps>,
        event: BackendEvent,
    ) -> Option<Loss> {
        match event {
            BackendEvent::DeviceAdded(id) => {
                self.refresh_device(ops, &id, true).await;
                None
            }
            BackendEvent::DeviceChanged(id) => {
                self.refresh_device(ops, &id, false).await;
                None
            }
            BackendEvent::DeviceRemoved(id) => {
                self.registry.remove(&id);
                None
            }
            BackendEvent::ServiceOwnerChanged(true) => None,
            BackendEvent::ServiceOwnerChanged(false) => {
                warn!("device service lost its bus name; clearing volumes");
                self.registry.remove_all();
                Some(Loss::Service)
            }
            BackendEvent::TransportClosed => {
                warn!("bus connection closed; clearing volumes");
                self.registry.remove_all();
                Some(Loss::Transport)
            }
        }
    }

    /// Re-derive one device's registry entry from a fresh snapshot.
    /// Change notifications for ids we never displayed are discarded
    /// before any backend round-trip.
    async fn refresh_device(&mut self, ops: &Arc<dyn VolumeOps>, id: &str, announced: bool) {
        if !announced && !self.registry.is_managed(id) {
            return;
        }

        match ops.snapshot(id).await {
            Ok(Some(snapshot)) => self.apply_snapshot(snapshot),
            Ok(None) => self.registry.remove(id),
            Err(e) => debug!(id, "device snapshot failed: {e:#}"),
        }
    }

    fn apply_snapshot(&mut self, snapshot: DeviceSnapshot) {
        let DeviceSnapshot {
            id,
            block,
            drive,
            mount_point,
            mounted,
            busy,
        } = snapshot;

        if !should_display(&block, drive.as_ref()) {
            self.registry.remove(&id);
            return;
        }

        let Some(device_path) = block.device_path.as_deref().filter(|p| !p.is_empty()) else {
            debug!(%id, "displayable device without a device node; skipping");
            self.registry.remove(&id);
            return;
        };

        // Classification and mountability only take effect when the id is
        // first inserted; the registry keeps them fixed afterwards.
        let icon = classify(&block, drive.as_ref());
        let mountable = should_mount(&block);
        self.registry.upsert(&id, device_path, icon, mountable);
        self.registry.set_mount_state(&id, mount_point.as_deref(), mounted);
        self.registry.set_busy(&id, busy);
    }

    fn handle_control(&mut self, link: &ActiveLink, message: ControlMessage) {
        match message {
            ControlMessage::SelectPrevious => self.registry.select_previous(),
            ControlMessage::SelectNext => self.registry.select_next(),
            ControlMessage::ToggleMount => {
                let Some((id, mounted)) = self
                    .registry
                    .current()
                    .map(|volume| (volume.id.clone(), volume.mounted))
                else {
                    return;
                };
                if mounted {
                    link.dispatcher.request_unmount(&self.registry, &id);
                } else {
                    link.dispatcher.request_mount(&self.registry, &id);
                }
            }
            ControlMessage::RequestMount(id) => link.dispatcher.request_mount(&self.registry, &id),
            ControlMessage::RequestUnmount(id) => {
                link.dispatcher.request_unmount(&self.registry, &id)
            }
            ControlMessage::CommandFinished { id, ok } => self.registry.set_error(&id, !ok),
        }
    }

    /// Retry the lost phase on a fixed interval until the backend is
    /// reachable again, then re-enter watching with a fresh enumeration.
    async fn recover(&mut self, loss: Loss, link: ActiveLink) -> ActiveLink {
        self.state = LinkState::Lost;
        let ActiveLink { transport, .. } = link;

        self.state = LinkState::Reconnecting;
        let mut retry = tokio::time::interval(RETRY_INTERVAL);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately; consume it
        // so attempts are spaced one interval apart from the loss.
        retry.tick().await;

        match loss {
            Loss::Service => loop {
                retry.tick().await;
                match self.attach_service(transport.as_ref()).await {
                    Ok((ops, events)) => {
                        info!("device service is back");
                        return self.activate(transport, ops, events);
                    }
                    Err(e) => debug!("service attach attempt failed: {e:#}"),
                }
            },
            Loss::Transport => {
                drop(transport);
                loop {
                    retry.tick().await;
                    let transport = match self.connector.connect().await {
                        Ok(transport) => transport,
                        Err(e) => {
                            debug!("bus connect attempt failed: {e:#}");
                            continue;
                        }
                    };
                    match self.attach_service(transport.as_ref()).await {
                        Ok((ops, events)) => {
                            info!("bus connection re-established");
                            return self.activate(transport, ops, events);
                        }
                        // Drop this transport too; the next tick redoes
                        // the whole connect phase.
                        Err(e) => debug!("service attach attempt failed: {e:#}"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use volman_types::{BlockAttributes, DriveAttributes, IconCategory};

    use super::*;
    use crate::registry::DockFrame;

    #[derive(Default)]
    struct FakeOps {
        devices: Mutex<Vec<DeviceSnapshot>>,
        mount_calls: Mutex<Vec<String>>,
    }

    impl FakeOps {
        fn set_devices(&self, devices: Vec<DeviceSnapshot>) {
            *self.devices.lock().unwrap() = devices;
        }

        fn update_device(&self, id: &str, f: impl FnOnce(&mut DeviceSnapshot)) {
            let mut devices = self.devices.lock().unwrap();
            let device = devices.iter_mut().find(|d| d.id == id).unwrap();
            f(device);
        }
    }

    impl VolumeOps for FakeOps {
        fn enumerate(&self) -> BoxFuture<'_, Result<Vec<DeviceSnapshot>>> {
            let devices = self.devices.lock().unwrap().clone();
            Box::pin(async move { Ok(devices) })
        }

        fn snapshot(&self, id: &str) -> BoxFuture<'_, Result<Option<DeviceSnapshot>>> {
            let found = self
                .devices
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == id)
                .cloned();
            Box::pin(async move { Ok(found) })
        }

        fn mount(&self, id: &str) -> BoxFuture<'_, Result<()>> {
            self.mount_calls.lock().unwrap().push(format!("mount {id}"));
            Box::pin(async { Ok(()) })
        }

        fn unmount(&self, id: &str) -> BoxFuture<'_, Result<()>> {
            self.mount_calls
                .lock()
                .unwrap()
                .push(format!("unmount {id}"));
            Box::pin(async { Ok(()) })
        }
    }

    struct FakeTransport {
        ops: Arc<FakeOps>,
        senders: Arc<Mutex<Vec<mpsc::Sender<BackendEvent>>>>,
        attaches: Arc<AtomicUsize>,
        fail_attaches: usize,
    }

    impl BackendTransport for FakeTransport {
        fn attach(&self) -> BoxFuture<'_, Result<ServiceLink>> {
            Box::pin(async move {
                let attempt = self.attaches.fetch_add(1, Ordering::SeqCst);
                if attempt < self.fail_attaches {
                    anyhow::bail!("service unavailable");
                }
                let (sender, events) = BackendEvents::channel(16);
                self.senders.lock().unwrap().push(sender);
                Ok(ServiceLink {
                    ops: self.ops.clone(),
                    events,
                })
            })
        }
    }

    #[derive(Clone)]
    struct FakeConnector {
        ops: Arc<FakeOps>,
        senders: Arc<Mutex<Vec<mpsc::Sender<BackendEvent>>>>,
        attaches: Arc<AtomicUsize>,
        connects: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn new(ops: Arc<FakeOps>) -> Self {
            Self {
                ops,
                senders: Arc::new(Mutex::new(Vec::new())),
                attaches: Arc::new(AtomicUsize::new(0)),
                connects: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn latest_sender(&self) -> mpsc::Sender<BackendEvent> {
            self.senders.lock().unwrap().last().unwrap().clone()
        }
    }

    impl BackendConnector for FakeConnector {
        fn connect(&self) -> BoxFuture<'_, Result<Box<dyn BackendTransport>>> {
            Box::pin(async move {
                self.connects.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeTransport {
                    ops: self.ops.clone(),
                    senders: self.senders.clone(),
                    attaches: self.attaches.clone(),
                    fail_attaches: 0,
                }) as Box<dyn BackendTransport>)
            })
        }
    }

    fn usb_stick(id: &str, device: &str) -> DeviceSnapshot {
        DeviceSnapshot {
            id: id.into(),
            block: BlockAttributes {
                id_usage: Some("filesystem".into()),
                device_path: Some(device.into()),
                ..Default::default()
            },
            drive: Some(DriveAttributes {
                removable: true,
                connection_bus: Some("usb".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn harness(
        devices: Vec<DeviceSnapshot>,
    ) -> (
        Watcher,
        Controls,
        FakeConnector,
        Arc<FakeOps>,
        mpsc::UnboundedReceiver<DockFrame>,
    ) {
        let ops = Arc::new(FakeOps::default());
        ops.set_devices(devices);
        let connector = FakeConnector::new(ops.clone());
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (watcher, controls) = Watcher::new(Arc::new(connector.clone()), frames_tx);
        (watcher, controls, connector, ops, frames_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DockFrame>) -> Vec<DockFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn bootstrap_enumerates_and_classifies() {
        let (mut watcher, _controls, _connector, _ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);

        assert_eq!(watcher.state(), LinkState::Disconnected);
        let _link = watcher.bootstrap().await.unwrap();
        assert_eq!(watcher.state(), LinkState::Watching);

        let volume = watcher.registry.find("/org/x/sdb1").unwrap();
        assert_eq!(volume.icon, IconCategory::RemovableUsb);
        assert!(volume.mountable);
        assert_eq!(volume.display_name, "/dev/sdb1");
        assert_eq!(watcher.registry.current().unwrap().id, "/org/x/sdb1");
    }

    #[tokio::test]
    async fn non_displayable_devices_are_skipped_at_bootstrap() {
        let mut internal = usb_stick("/org/x/sda1", "/dev/sda1");
        internal.block.hint_system = true;

        let no_media = DeviceSnapshot {
            id: "/org/x/sr0".into(),
            block: BlockAttributes {
                device_path: Some("/dev/sr0".into()),
                ..Default::default()
            },
            drive: Some(DriveAttributes {
                optical: true,
                media_available: false,
                ..Default::default()
            }),
            ..Default::default()
        };

        let (mut watcher, _controls, _connector, _ops, _frames) = harness(vec![
            internal,
            no_media,
            usb_stick("/org/x/sdb1", "/dev/sdb1"),
        ]);

        watcher.bootstrap().await.unwrap();
        assert_eq!(watcher.registry.len(), 1);
        assert!(watcher.registry.is_managed("/org/x/sdb1"));
    }

    #[tokio::test]
    async fn added_and_removed_devices_update_the_registry() {
        let (mut watcher, _controls, connector, ops, mut frames) = harness(Vec::new());
        let mut link = watcher.bootstrap().await.unwrap();
        drain(&mut frames);

        ops.set_devices(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let sender = connector.latest_sender();
        sender
            .send(BackendEvent::DeviceAdded("/org/x/sdb1".into()))
            .await
            .unwrap();
        sender
            .send(BackendEvent::DeviceRemoved("/org/x/sdb1".into()))
            .await
            .unwrap();
        drop(sender);
        connector.senders.lock().unwrap().clear();

        let loss = watcher.watch(&mut link).await;
        assert_eq!(loss, Loss::Transport);

        let frames = drain(&mut frames);
        // Add (current set), mount-state/busy produce no frames (no
        // change), remove (empty), and nothing further: the registry was
        // already empty when the stream ended.
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].current.as_ref().unwrap().display_name,
            "/dev/sdb1"
        );
        assert!(frames[1].current.is_none());
        assert!(watcher.registry.is_empty());
    }

    #[tokio::test]
    async fn change_notifications_for_untracked_ids_are_discarded() {
        let (mut watcher, _controls, connector, ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();

        // The device exists backend-side but was never displayed here.
        ops.set_devices(vec![
            usb_stick("/org/x/sdb1", "/dev/sdb1"),
            usb_stick("/org/x/ghost", "/dev/ghost"),
        ]);

        watcher
            .handle_event(&link.ops, BackendEvent::DeviceChanged("/org/x/ghost".into()))
            .await;

        assert_eq!(watcher.registry.len(), 1);
        assert!(!watcher.registry.is_managed("/org/x/ghost"));
        drop(connector);
        drop(link);
    }

    #[tokio::test]
    async fn mount_state_changes_flow_into_the_registry() {
        let (mut watcher, _controls, _connector, ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();

        ops.update_device("/org/x/sdb1", |device| {
            device.mounted = true;
            device.mount_point = Some("/run/media/user/STICK".into());
        });
        watcher
            .handle_event(&link.ops, BackendEvent::DeviceChanged("/org/x/sdb1".into()))
            .await;

        let volume = watcher.registry.find("/org/x/sdb1").unwrap();
        assert!(volume.mounted);
        assert_eq!(volume.display_name, "/run/media/user/STICK");

        ops.update_device("/org/x/sdb1", |device| {
            device.busy = true;
        });
        watcher
            .handle_event(&link.ops, BackendEvent::DeviceChanged("/org/x/sdb1".into()))
            .await;
        assert!(watcher.registry.find("/org/x/sdb1").unwrap().busy);
    }

    #[tokio::test]
    async fn device_that_stops_being_displayable_is_dropped() {
        let (mut watcher, _controls, _connector, ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();
        assert!(watcher.registry.is_managed("/org/x/sdb1"));

        ops.update_device("/org/x/sdb1", |device| {
            device.block.hint_ignore = true;
        });
        watcher
            .handle_event(&link.ops, BackendEvent::DeviceChanged("/org/x/sdb1".into()))
            .await;

        assert!(watcher.registry.is_empty());
    }

    #[tokio::test]
    async fn service_owner_loss_clears_everything_once() {
        let (mut watcher, _controls, _connector, ops, mut frames) = harness(vec![
            usb_stick("/org/x/sda1", "/dev/sda1"),
            usb_stick("/org/x/sdb1", "/dev/sdb1"),
            usb_stick("/org/x/sdc1", "/dev/sdc1"),
        ]);
        let link = watcher.bootstrap().await.unwrap();
        assert_eq!(watcher.registry.len(), 3);
        drain(&mut frames);

        let loss = watcher
            .handle_event(&link.ops, BackendEvent::ServiceOwnerChanged(false))
            .await;
        assert_eq!(loss, Some(Loss::Service));
        assert!(watcher.registry.is_empty());
        assert!(watcher.registry.current().is_none());

        let emitted = drain(&mut frames);
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].current.is_none());

        // A stale change notification for a now-untracked id is harmless.
        watcher
            .handle_event(&link.ops, BackendEvent::DeviceChanged("/org/x/sdb1".into()))
            .await;
        assert!(watcher.registry.is_empty());
        assert!(drain(&mut frames).is_empty());
        drop(ops);
    }

    #[tokio::test]
    async fn mount_request_for_unknown_id_issues_no_backend_call() {
        let (mut watcher, _controls, _connector, ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();

        watcher.handle_control(&link, ControlMessage::RequestMount("/org/x/gone".into()));
        tokio::task::yield_now().await;

        assert!(ops.mount_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_follows_the_current_volume_mount_state() {
        let (mut watcher, _controls, _connector, ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();

        watcher.handle_control(&link, ControlMessage::ToggleMount);
        tokio::task::yield_now().await;
        assert_eq!(
            *ops.mount_calls.lock().unwrap(),
            vec!["mount /org/x/sdb1".to_string()]
        );

        watcher
            .registry
            .set_mount_state("/org/x/sdb1", Some("/mnt/stick"), true);
        watcher.handle_control(&link, ControlMessage::ToggleMount);
        tokio::task::yield_now().await;
        assert_eq!(
            ops.mount_calls.lock().unwrap().last().unwrap(),
            "unmount /org/x/sdb1"
        );
    }

    #[tokio::test]
    async fn command_completions_drive_the_error_flag() {
        let (mut watcher, _controls, _connector, _ops, _frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();

        watcher.handle_control(
            &link,
            ControlMessage::CommandFinished {
                id: "/org/x/sdb1".into(),
                ok: false,
            },
        );
        assert!(watcher.registry.find("/org/x/sdb1").unwrap().error);

        watcher.handle_control(
            &link,
            ControlMessage::CommandFinished {
                id: "/org/x/sdb1".into(),
                ok: true,
            },
        );
        assert!(!watcher.registry.find("/org/x/sdb1").unwrap().error);

        // A completion racing with removal dies at the registry lookup.
        watcher.registry.remove("/org/x/sdb1");
        watcher.handle_control(
            &link,
            ControlMessage::CommandFinished {
                id: "/org/x/sdb1".into(),
                ok: false,
            },
        );
        assert!(watcher.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_loss_recovers_with_a_clean_rebuild() {
        let (mut watcher, _controls, connector, ops, mut frames) =
            harness(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);
        let link = watcher.bootstrap().await.unwrap();
        drain(&mut frames);

        // Kill the first event stream; run() must clear the registry and
        // reconnect through the connector.
        connector.senders.lock().unwrap().clear();

        let task = tokio::spawn(watcher.run(link));

        // One frame for the cleared registry, then the rebuilt volume.
        let empty = frames.recv().await.unwrap();
        assert!(empty.current.is_none());

        let rebuilt = frames.recv().await.unwrap();
        assert_eq!(
            rebuilt.current.as_ref().unwrap().display_name,
            "/dev/sdb1"
        );

        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        task.abort();
        drop(ops);
    }

    #[tokio::test(start_paused = true)]
    async fn service_loss_retries_attach_until_the_service_returns() {
        let ops = Arc::new(FakeOps::default());
        ops.set_devices(vec![usb_stick("/org/x/sdb1", "/dev/sdb1")]);

        let senders = Arc::new(Mutex::new(Vec::new()));
        let attaches = Arc::new(AtomicUsize::new(0));
        let transport = FakeTransport {
            ops: ops.clone(),
            senders: senders.clone(),
            attaches: attaches.clone(),
            fail_attaches: 0,
        };

        let connector = FakeConnector::new(ops.clone());
        let (frames_tx, mut frames) = mpsc::unbounded_channel();
        let (mut watcher, _controls) = Watcher::new(Arc::new(connector.clone()), frames_tx);

        // Attach directly so the recovery path reuses a transport we
        // control; the first two recovery attempts fail before the
        // service comes back.
        let (ops_handle, events) = watcher.attach_service(&transport).await.unwrap();
        let link = watcher.activate(Box::new(FakeTransport {
            ops: ops.clone(),
            senders: senders.clone(),
            attaches: attaches.clone(),
            fail_attaches: 3,
        }), ops_handle, events);
        drain(&mut frames);

        let sender = senders.lock().unwrap().last().unwrap().clone();
        sender
            .send(BackendEvent::ServiceOwnerChanged(false))
            .await
            .unwrap();

        let task = tokio::spawn(watcher.run(link));

        let empty = frames.recv().await.unwrap();
        assert!(empty.current.is_none());

        let rebuilt = frames.recv().await.unwrap();
        assert_eq!(
            rebuilt.current.as_ref().unwrap().display_name,
            "/dev/sdb1"
        );

        // The bus connection itself was never re-established.
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        task.abort();
    }
}
