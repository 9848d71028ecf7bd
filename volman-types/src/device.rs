//! Attribute bags describing one backend device
//!
//! A [`DeviceSnapshot`] is a point-in-time, owned copy of everything the
//! display and classification predicates need. The bus binding fills it
//! in; missing or unreadable backend attributes become `None`/defaults
//! rather than errors, so the pure layer downstream never has to deal
//! with partial reads.

use serde::{Deserialize, Serialize};

/// Attributes read from the block device itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAttributes {
    /// Backend hint that this is a system-internal device.
    pub hint_system: bool,

    /// Backend hint that this device should never be shown.
    pub hint_ignore: bool,

    /// Detected content usage, e.g. `"filesystem"`, `"crypto"`, `"raid"`.
    /// `None` when the backend has not probed the device or the read
    /// failed.
    pub id_usage: Option<String>,

    /// Device node, e.g. `/dev/sdb1`. A volume without one is invalid
    /// and never enters the registry.
    pub device_path: Option<String>,
}

/// Attributes read from the drive backing a block device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveAttributes {
    /// Whether the drive is an optical drive.
    pub optical: bool,

    /// Whether removable media is currently present.
    pub media_available: bool,

    /// Media subtype as reported by the backend, e.g. `"optical_cd_r"`
    /// or `"flash_sd"`.
    pub media: Option<String>,

    /// Number of audio tracks on inserted optical media.
    pub audio_track_count: u32,

    /// Whether the drive uses removable media.
    pub removable: bool,

    /// Transport bus the drive hangs off, e.g. `"usb"` or `"ieee1394"`.
    pub connection_bus: Option<String>,
}

/// Point-in-time state of one backend device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Backend-assigned identifier, stable for the device's lifetime.
    pub id: String,

    pub block: BlockAttributes,

    /// `None` when the block device has no backing drive object.
    pub drive: Option<DriveAttributes>,

    /// First mount point, when mounted.
    pub mount_point: Option<String>,

    pub mounted: bool,

    /// Whether the backend currently reports a job running against this
    /// device.
    pub busy: bool,
}
