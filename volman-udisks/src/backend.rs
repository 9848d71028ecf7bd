//! The `volman-core` capability traits over a real system bus

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use tracing::debug;
use udisks2::filesystem::FilesystemProxy;
use volman_core::{BackendConnector, BackendTransport, ServiceLink, VolumeOps};
use volman_types::DeviceSnapshot;
use zbus::Connection;
use zbus::zvariant::OwnedObjectPath;

use crate::events;
use crate::jobs::JobTable;
use crate::proxy::UDisks2ObjectManagerProxy;
use crate::snapshot;

/// Connects to the system bus; each connection is handed back as a
/// transport the watcher can attach to UDisks2 through.
pub struct UdisksConnector;

impl BackendConnector for UdisksConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn BackendTransport>>> {
        Box::pin(async {
            let connection = Connection::system().await?;
            Ok(Box::new(UdisksTransport { connection }) as Box<dyn BackendTransport>)
        })
    }
}

struct UdisksTransport {
    connection: Connection,
}

impl BackendTransport for UdisksTransport {
    fn attach(&self) -> BoxFuture<'_, Result<ServiceLink>> {
        Box::pin(async {
            let object_manager = UDisks2ObjectManagerProxy::new(&self.connection).await?;

            // Round-trip that proves the service is reachable (activating
            // it if necessary) and primes the job table.
            let managed = object_manager.get_managed_objects().await?;
            let jobs = JobTable::from_managed(&managed);

            let events = events::spawn_event_stream(&self.connection, jobs.clone()).await?;
            let ops: Arc<dyn VolumeOps> = Arc::new(UdisksVolumeOps {
                connection: self.connection.clone(),
                jobs,
            });

            Ok(ServiceLink { ops, events })
        })
    }
}

struct UdisksVolumeOps {
    connection: Connection,
    jobs: JobTable,
}

impl VolumeOps for UdisksVolumeOps {
    fn enumerate(&self) -> BoxFuture<'_, Result<Vec<DeviceSnapshot>>> {
        Box::pin(async {
            let object_manager = UDisks2ObjectManagerProxy::new(&self.connection).await?;
            let managed = object_manager.get_managed_objects().await?;

            // GetManagedObjects order is unspecified; sort so repeated
            // enumerations rebuild the registry in the same order.
            let mut paths: Vec<OwnedObjectPath> = managed
                .into_iter()
                .filter(|(_, interfaces)| interfaces.contains_key(events::BLOCK_IFACE))
                .map(|(path, _)| path)
                .collect();
            paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));

            let mut snapshots = Vec::new();
            for path in paths {
                let busy = self.jobs.is_busy(path.as_str());
                match snapshot::device_snapshot(&self.connection, &path, busy).await {
                    Ok(Some(snapshot)) => snapshots.push(snapshot),
                    Ok(None) => {}
                    Err(e) => debug!(%path, "skipping device: {e:#}"),
                }
            }

            Ok(snapshots)
        })
    }

    fn snapshot(&self, id: &str) -> BoxFuture<'_, Result<Option<DeviceSnapshot>>> {
        let path = OwnedObjectPath::try_from(id).ok();
        let busy = self.jobs.is_busy(id);
        Box::pin(async move {
            let Some(path) = path else {
                return Ok(None);
            };
            snapshot::device_snapshot(&self.connection, &path, busy).await
        })
    }

    fn mount(&self, id: &str) -> BoxFuture<'_, Result<()>> {
        let id = id.to_owned();
        Box::pin(async move {
            let proxy = FilesystemProxy::builder(&self.connection)
                .path(id)?
                .build()
                .await?;
            proxy.mount(HashMap::new()).await?;
            Ok(())
        })
    }

    fn unmount(&self, id: &str) -> BoxFuture<'_, Result<()>> {
        let id = id.to_owned();
        Box::pin(async move {
            let proxy = FilesystemProxy::builder(&self.connection)
                .path(id)?
                .build()
                .await?;
            proxy.unmount(HashMap::new()).await?;
            Ok(())
        })
    }
}
