//! Build a [`DeviceSnapshot`] from the typed UDisks2 proxies
//!
//! Attribute reads degrade instead of failing: a missing drive object,
//! an absent filesystem interface or an unreadable property all map to
//! the conservative default, which downstream treats as "do not show"
//! or "do not refine".

use anyhow::Result;
use tracing::debug;
use udisks2::drive::MediaCompatibility;
use udisks2::{block::BlockProxy, drive::DriveProxy, filesystem::FilesystemProxy};
use zbus::Connection;
use zbus::zvariant::OwnedObjectPath;
use volman_types::{BlockAttributes, DeviceSnapshot, DriveAttributes};

use crate::bytestring as bs;

/// Read one device's attributes. `Ok(None)` when the object no longer
/// exposes a block interface, which is how a device that vanished
/// between a signal and this read shows up.
pub(crate) async fn device_snapshot(
    connection: &Connection,
    path: &OwnedObjectPath,
    busy: bool,
) -> Result<Option<DeviceSnapshot>> {
    let block_proxy = BlockProxy::builder(connection).path(path)?.build().await?;

    // The first property read doubles as the existence probe.
    let drive_path = match block_proxy.drive().await {
        Ok(drive_path) => drive_path,
        Err(e) => {
            debug!(%path, "not a block device: {e}");
            return Ok(None);
        }
    };

    let preferred_device =
        bs::decode_c_string_bytes(&block_proxy.preferred_device().await.unwrap_or_default());
    let device = if preferred_device.is_empty() {
        bs::decode_c_string_bytes(&block_proxy.device().await.unwrap_or_default())
    } else {
        preferred_device
    };

    let block = BlockAttributes {
        hint_system: block_proxy.hint_system().await.unwrap_or(false),
        hint_ignore: block_proxy.hint_ignore().await.unwrap_or(false),
        id_usage: match block_proxy.id_usage().await {
            Ok(usage) if !usage.is_empty() => Some(usage),
            _ => None,
        },
        device_path: if device.is_empty() { None } else { Some(device) },
    };

    // "/" marks a block device with no backing drive object.
    let drive = if drive_path.as_str() == "/" {
        None
    } else {
        drive_attributes(connection, &drive_path).await
    };

    let (mount_point, mounted) = match FilesystemProxy::builder(connection)
        .path(path)?
        .build()
        .await
    {
        Ok(proxy) => match proxy.mount_points().await {
            Ok(mps) => {
                let decoded = bs::decode_mount_points(mps);
                let mounted = !decoded.is_empty();
                (decoded.into_iter().next(), mounted)
            }
            Err(_) => (None, false),
        },
        Err(_) => (None, false),
    };

    Ok(Some(DeviceSnapshot {
        id: path.to_string(),
        block,
        drive,
        mount_point,
        mounted,
        busy,
    }))
}

/// Canonical UDisks2 "Media" id string for a typed [`MediaCompatibility`].
///
/// udisks2 0.3.1 exposes the `Media` property as this enum rather than the
/// raw string; the id strings below are the enum's own snake_case names and
/// match the media tables in `volman_types::classify`. The blank-media
/// `Unknown` variant (and any future variant) maps to `None`.
fn media_id(media: MediaCompatibility) -> Option<&'static str> {
    use MediaCompatibility::*;
    Some(match media {
        Thumb => "thumb",
        Flash => "flash",
        FlashCf => "flash_cf",
        FlashMs => "flash_ms",
        FlashSm => "flash_sm",
        FlashSd => "flash_sd",
        FlashSdhc => "flash_sdhc",
        FlashSdxc => "flash_sdxc",
        FlashSdio => "flash_sdio",
        FlashSdCombo => "flash_sd_combo",
        FlashMmc => "flash_mmc",
        Floppy => "floppy",
        FloppyZip => "floppy_zip",
        FloppyJaz => "floppy_jaz",
        Optical => "optical",
        OpticalCd => "optical_cd",
        OpticalCdR => "optical_cd_r",
        OpticalCdRw => "optical_cd_rw",
        OpticalDvd => "optical_dvd",
        OpticalDvdR => "optical_dvd_r",
        OpticalDvdRw => "optical_dvd_rw",
        OpticalDvdRam => "optical_dvd_ram",
        OpticalDvdPlusR => "optical_dvd_plus_r",
        OpticalDvdPlusRw => "optical_dvd_plus_rw",
        OpticalDvdPlusRDl => "optical_dvd_plus_r_dl",
        OpticalDvdPlusRwDl => "optical_dvd_plus_rw_dl",
        OpticalBd => "optical_bd",
        OpticalBdR => "optical_bd_r",
        OpticalBdRe => "optical_bd_re",
        OpticalHddvd => "optical_hddvd",
        OpticalHddvdR => "optical_hddvd_r",
        OpticalHddvdRw => "optical_hddvd_rw",
        OpticalMo => "optical_mo",
        OpticalMrw => "optical_mrw",
        OpticalMrwW => "optical_mrw_w",
        _ => return None,
    })
}

async fn drive_attributes(
    connection: &Connection,
    path: &OwnedObjectPath,
) -> Option<DriveAttributes> {
    let proxy = DriveProxy::builder(connection)
        .path(path)
        .ok()?
        .build()
        .await
        .ok()?;

    Some(DriveAttributes {
        optical: proxy.optical().await.unwrap_or(false),
        media_available: proxy.media_available().await.unwrap_or(false),
        media: match proxy.media().await {
            Ok(media) => media_id(media).map(str::to_owned),
            _ => None,
        },
        audio_track_count: proxy.optical_num_audio_tracks().await.unwrap_or(0),
        removable: proxy.removable().await.unwrap_or(false),
        connection_bus: match proxy.connection_bus().await {
            Ok(bus) if !bus.is_empty() => Some(bus),
            _ => None,
        },
    })
}
