//! Ordered volume registry with a single selection cursor
//!
//! The registry is a sequence: volumes keep their insertion order and are
//! never re-sorted. At most one volume is "current"; the cursor is `None`
//! exactly when the registry is empty. Every effective mutation publishes
//! a [`DockFrame`] so the rendering collaborator can redraw; no-op
//! mutations (same mount state, same busy flag, ...) are swallowed to
//! keep duplicate backend notifications from causing redundant redraws.

use tokio::sync::mpsc;
use tracing::trace;
use volman_types::IconCategory;

use crate::volume::Volume;

/// What the dock needs to know about the current volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentVolume {
    pub id: String,
    pub display_name: String,
    pub icon: IconCategory,
    pub mounted: bool,
    pub busy: bool,
    pub error: bool,
}

/// Enablement of the three dock controls, derived from registry state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonStates {
    /// Current volume exists, is mountable and has no operation running.
    pub mount_enabled: bool,
    /// A volume precedes the current one in insertion order.
    pub prev_enabled: bool,
    /// A volume follows the current one in insertion order.
    pub next_enabled: bool,
}

/// One redraw's worth of state for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockFrame {
    pub current: Option<CurrentVolume>,
    pub buttons: ButtonStates,
}

pub struct VolumeRegistry {
    volumes: Vec<Volume>,
    current: Option<usize>,
    frames: mpsc::UnboundedSender<DockFrame>,
}

impl VolumeRegistry {
    pub fn new(frames: mpsc::UnboundedSender<DockFrame>) -> Self {
        Self {
            volumes: Vec::new(),
            current: None,
            frames,
        }
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn current(&self) -> Option<&Volume> {
        self.current.map(|index| &self.volumes[index])
    }

    pub fn find(&self, id: &str) -> Option<&Volume> {
        self.volumes.iter().find(|volume| volume.id == id)
    }

    /// Cheap gate for the notification layer: property changes for ids we
    /// never displayed are discarded without further backend traffic.
    pub fn is_managed(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.volumes.iter().position(|volume| volume.id == id)
    }

    /// Insert a new volume or refresh an existing one.
    ///
    /// A new volume is appended and becomes current. For a known id only
    /// the device path is refreshed: `icon` and `mountable` are fixed
    /// when the volume is first seen and deliberately never re-derived.
    pub fn upsert(&mut self, id: &str, device_path: &str, icon: IconCategory, mountable: bool) {
        match self.position(id) {
            Some(index) => {
                let volume = &mut self.volumes[index];
                volume.device_path = device_path.to_owned();
                volume.refresh_display_name();
            }
            None => {
                self.volumes.push(Volume::new(id, device_path, icon, mountable));
                self.current = Some(self.volumes.len() - 1);
            }
        }
        self.redraw();
    }

    /// Drop a volume. Unknown ids are a silent no-op. When the current
    /// volume goes away the cursor moves to its insertion-order
    /// predecessor, else its successor, else nothing.
    pub fn remove(&mut self, id: &str) {
        let Some(index) = self.position(id) else {
            return;
        };

        self.volumes.remove(index);

        self.current = match self.current {
            Some(current) if current == index => {
                if index > 0 {
                    Some(index - 1)
                } else if !self.volumes.is_empty() {
                    Some(0)
                } else {
                    None
                }
            }
            Some(current) if current > index => Some(current - 1),
            other => other,
        };

        self.redraw();
    }

    /// Empty the registry on backend disconnect. The selection is cleared
    /// first and published as a single "no volume" redraw; dropping the
    /// entries themselves does not redraw again.
    pub fn remove_all(&mut self) {
        if self.volumes.is_empty() && self.current.is_none() {
            return;
        }

        self.current = None;
        self.redraw();
        self.volumes.clear();
    }

    /// Update mount point and mounted flag together. Publishes a redraw
    /// only when one of them actually changed.
    pub fn set_mount_state(&mut self, id: &str, mount_point: Option<&str>, mounted: bool) {
        let Some(index) = self.position(id) else {
            return;
        };

        let volume = &mut self.volumes[index];
        if volume.mounted == mounted && volume.mount_point.as_deref() == mount_point {
            return;
        }

        volume.mounted = mounted;
        volume.mount_point = mount_point.map(str::to_owned);
        volume.refresh_display_name();
        self.redraw();
    }

    pub fn set_busy(&mut self, id: &str, busy: bool) {
        let Some(index) = self.position(id) else {
            return;
        };

        if self.volumes[index].busy == busy {
            return;
        }

        self.volumes[index].busy = busy;
        self.redraw();
    }

    pub fn set_error(&mut self, id: &str, error: bool) {
        let Some(index) = self.position(id) else {
            return;
        };

        if self.volumes[index].error == error {
            return;
        }

        self.volumes[index].error = error;
        self.redraw();
    }

    /// Move the cursor one position back. No-op at the first volume.
    pub fn select_previous(&mut self) {
        if let Some(current) = self.current
            && current > 0
        {
            self.current = Some(current - 1);
            self.redraw();
        }
    }

    /// Move the cursor one position forward. No-op at the last volume.
    pub fn select_next(&mut self) {
        if let Some(current) = self.current
            && current + 1 < self.volumes.len()
        {
            self.current = Some(current + 1);
            self.redraw();
        }
    }

    /// Compose what the dock would show right now.
    pub fn frame(&self) -> DockFrame {
        let current = self.current().map(|volume| CurrentVolume {
            id: volume.id.clone(),
            display_name: volume.display_name.clone(),
            icon: volume.icon,
            mounted: volume.mounted,
            busy: volume.busy,
            error: volume.error,
        });

        let buttons = match self.current {
            Some(index) => {
                let volume = &self.volumes[index];
                ButtonStates {
                    mount_enabled: volume.mountable && !volume.busy,
                    prev_enabled: index > 0,
                    next_enabled: index + 1 < self.volumes.len(),
                }
            }
            None => ButtonStates::default(),
        };

        DockFrame { current, buttons }
    }

    fn redraw(&self) {
        if self.frames.send(self.frame()).is_err() {
            trace!("dock frame receiver dropped");
        }
    }
}
