//! Signal fan-in: UDisks2 and bus signals to [`BackendEvent`]s
//!
//! One spawned task merges four sources into the watcher's event stream:
//! ObjectManager `InterfacesAdded`/`InterfacesRemoved` (device add and
//! remove, job busy tracking), `PropertiesChanged` under the UDisks2
//! path namespace (mount state, job progress) and the bus's
//! `NameOwnerChanged` for the service name. Any source ending means the
//! connection is gone; the task reports a transport loss and stops.

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::warn;
use volman_core::{BackendEvent, BackendEvents};
use zbus::Connection;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue};

use crate::jobs::{JOB_IFACE, JobTable, job_targets};
use crate::proxy::{InterfaceProperties, UDisks2ObjectManagerProxy};
use crate::{OBJECT_PATH_PREFIX, SERVICE_NAME};

pub(crate) const BLOCK_IFACE: &str = "org.freedesktop.UDisks2.Block";
pub(crate) const FILESYSTEM_IFACE: &str = "org.freedesktop.UDisks2.Filesystem";

/// Body of `org.freedesktop.DBus.Properties.PropertiesChanged`.
type PropertiesChangedBody = (
    String,
    std::collections::HashMap<String, OwnedValue>,
    Vec<String>,
);

pub(crate) async fn spawn_event_stream(
    connection: &Connection,
    jobs: JobTable,
) -> Result<BackendEvents> {
    let object_manager = UDisks2ObjectManagerProxy::new(connection).await?;
    let mut added = object_manager.receive_interfaces_added().await?;
    let mut removed = object_manager.receive_interfaces_removed().await?;

    let dbus = zbus::fdo::DBusProxy::new(connection).await?;
    let mut owner_changed = dbus
        .receive_name_owner_changed_with_args(&[(0, SERVICE_NAME)])
        .await?;

    let properties_rule = zbus::MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .interface("org.freedesktop.DBus.Properties")?
        .member("PropertiesChanged")?
        .path_namespace(OBJECT_PATH_PREFIX)?
        .build();
    let mut properties =
        zbus::MessageStream::for_match_rule(properties_rule, connection, Some(64)).await?;

    let (sender, events) = BackendEvents::channel(64);

    tokio::spawn(async move {
        'task: loop {
            tokio::select! {
                maybe_added = added.next() => {
                    let Some(signal) = maybe_added else { break 'task };
                    match signal.args() {
                        Ok(args) => {
                            let batch = added_events(
                                &args.object_path,
                                &args.interfaces_and_properties,
                                &jobs,
                            );
                            if !send_all(&sender, batch).await {
                                return;
                            }
                        }
                        Err(e) => warn!("unparseable InterfacesAdded signal: {e}"),
                    }
                }
                maybe_removed = removed.next() => {
                    let Some(signal) = maybe_removed else { break 'task };
                    match signal.args() {
                        Ok(args) => {
                            let batch = removed_events(&args.object_path, &args.interfaces, &jobs);
                            if !send_all(&sender, batch).await {
                                return;
                            }
                        }
                        Err(e) => warn!("unparseable InterfacesRemoved signal: {e}"),
                    }
                }
                maybe_owner = owner_changed.next() => {
                    let Some(signal) = maybe_owner else { break 'task };
                    match signal.args() {
                        Ok(args) => {
                            let present = args.new_owner.is_some();
                            if sender.send(BackendEvent::ServiceOwnerChanged(present)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("unparseable NameOwnerChanged signal: {e}"),
                    }
                }
                maybe_message = properties.next() => {
                    let Some(result) = maybe_message else { break 'task };
                    let message = match result {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("bad message on properties match: {e}");
                            continue;
                        }
                    };
                    let header = message.header();
                    let Some(path) = header.path() else { continue };
                    let body = message.body();
                    let Ok((interface_name, _, _)) = body.deserialize::<PropertiesChangedBody>()
                    else {
                        continue;
                    };
                    if let Some(event) = property_change_event(&interface_name, path)
                        && sender.send(event).await.is_err()
                    {
                        return;
                    }
                }
            }
        }

        // A signal stream only ends when the connection is gone.
        let _ = sender.send(BackendEvent::TransportClosed).await;
    });

    Ok(events)
}

async fn send_all(sender: &mpsc::Sender<BackendEvent>, events: Vec<BackendEvent>) -> bool {
    for event in events {
        if sender.send(event).await.is_err() {
            return false;
        }
    }
    true
}

/// Events for one `InterfacesAdded` signal. A new block device or a
/// filesystem facet appearing on one announces the device; a new job
/// marks its targets busy.
fn added_events(
    object_path: &OwnedObjectPath,
    interfaces: &InterfaceProperties,
    jobs: &JobTable,
) -> Vec<BackendEvent> {
    let mut events = Vec::new();

    if interfaces.contains_key(BLOCK_IFACE) || interfaces.contains_key(FILESYSTEM_IFACE) {
        events.push(BackendEvent::DeviceAdded(object_path.to_string()));
    }

    if let Some(props) = interfaces.get(JOB_IFACE) {
        let targets = jobs.insert(object_path.clone(), job_targets(props));
        events.extend(targets.into_iter().map(BackendEvent::DeviceChanged));
    }

    events
}

/// Events for one `InterfacesRemoved` signal. Losing the block interface
/// removes the device outright; losing just the filesystem interface
/// re-derives it; a finished job unmarks its targets.
fn removed_events(
    object_path: &OwnedObjectPath,
    interfaces: &[String],
    jobs: &JobTable,
) -> Vec<BackendEvent> {
    let mut events = Vec::new();

    if interfaces.iter().any(|i| i == BLOCK_IFACE) {
        events.push(BackendEvent::DeviceRemoved(object_path.to_string()));
    } else if interfaces.iter().any(|i| i == FILESYSTEM_IFACE) {
        events.push(BackendEvent::DeviceChanged(object_path.to_string()));
    }

    if interfaces.iter().any(|i| i == JOB_IFACE) {
        let targets = jobs.remove(object_path);
        events.extend(targets.into_iter().map(BackendEvent::DeviceChanged));
    }

    events
}

fn property_change_event(interface_name: &str, path: &ObjectPath<'_>) -> Option<BackendEvent> {
    if interface_name.starts_with("org.freedesktop.UDisks2") {
        Some(BackendEvent::DeviceChanged(path.to_string()))
    } else {
        None
    }
}
