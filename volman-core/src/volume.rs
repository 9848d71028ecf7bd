//! One tracked volume

use volman_types::IconCategory;

/// A single registry entry. The registry owns all mutation; fields are
/// public for inspection by the view layer and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Backend-assigned identifier, unique within the registry.
    pub id: String,

    /// Device node string. Always non-empty for a registered volume.
    pub device_path: String,

    pub mount_point: Option<String>,

    /// Mount point when present, device path otherwise. Kept in sync by
    /// the registry whenever either input changes.
    pub display_name: String,

    /// Fixed at creation; a later change of the device's content usage
    /// does not flip this.
    pub mountable: bool,

    pub mounted: bool,

    /// A backend job is running against this volume, or a mount/unmount
    /// request is in flight.
    pub busy: bool,

    /// The most recent mount/unmount attempt failed.
    pub error: bool,

    /// Fixed at creation.
    pub icon: IconCategory,
}

impl Volume {
    pub(crate) fn new(id: &str, device_path: &str, icon: IconCategory, mountable: bool) -> Self {
        let mut volume = Self {
            id: id.to_owned(),
            device_path: device_path.to_owned(),
            mount_point: None,
            display_name: String::new(),
            mountable,
            mounted: false,
            busy: false,
            error: false,
            icon,
        };
        volume.refresh_display_name();
        volume
    }

    pub(crate) fn refresh_display_name(&mut self) {
        self.display_name = match self.mount_point.as_deref() {
            Some(mount_point) if !mount_point.is_empty() => mount_point.to_owned(),
            _ => self.device_path.clone(),
        };
    }
}
