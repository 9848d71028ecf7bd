//! Display, mountability and icon classification predicates
//!
//! All three functions are pure and total: any attribute combination maps
//! to a decision, unmatched input lands on [`IconCategory::Unknown`].

use crate::device::{BlockAttributes, DriveAttributes};
use crate::icon::IconCategory;

/// Content usage value that marks a device as carrying a mountable
/// filesystem.
const USAGE_FILESYSTEM: &str = "filesystem";

/// Optical media subtype to icon category.
const OPTICAL_MEDIA_ICONS: &[(&str, IconCategory)] = &[
    ("optical_cd", IconCategory::Cdrom),
    ("optical_cd_r", IconCategory::Cdr),
    ("optical_cd_rw", IconCategory::Cdrw),
    ("optical_dvd", IconCategory::Dvdrom),
    ("optical_dvd_r", IconCategory::Dvdr),
    ("optical_dvd_rw", IconCategory::Dvdrw),
    ("optical_dvd_ram", IconCategory::Dvdram),
    ("optical_dvd_plus_r", IconCategory::DvdPlusR),
    ("optical_dvd_plus_rw", IconCategory::DvdPlusRw),
    ("optical_dvd_plus_r_dl", IconCategory::DvdPlusR),
    ("optical_dvd_plus_rw_dl", IconCategory::DvdPlusRw),
    ("optical_bd", IconCategory::Bd),
    ("optical_bd_r", IconCategory::Bdr),
    ("optical_bd_re", IconCategory::Bdre),
    ("optical_hddvd", IconCategory::Hddvd),
    ("optical_hddvd_r", IconCategory::Hddvdr),
    ("optical_hddvd_rw", IconCategory::Hddvdrw),
];

/// Flash-card media subtype to icon category.
const FLASH_MEDIA_ICONS: &[(&str, IconCategory)] = &[
    ("flash", IconCategory::CardCf),
    ("flash_cf", IconCategory::CardCf),
    ("flash_ms", IconCategory::CardMs),
    ("flash_sm", IconCategory::CardSm),
    ("flash_sd", IconCategory::CardSdMmc),
    ("flash_sdhc", IconCategory::CardSdMmc),
    ("flash_mmc", IconCategory::CardSdMmc),
];

fn lookup(table: &[(&str, IconCategory)], media: &str) -> Option<IconCategory> {
    table
        .iter()
        .find(|(name, _)| *name == media)
        .map(|(_, icon)| *icon)
}

/// Whether a device should appear in the registry at all.
///
/// System-internal and ignore-hinted devices are never shown. Optical
/// drives are shown only with media present; anything else must carry a
/// detected filesystem.
pub fn should_display(block: &BlockAttributes, drive: Option<&DriveAttributes>) -> bool {
    if block.hint_system || block.hint_ignore {
        return false;
    }

    if let Some(drive) = drive
        && drive.optical
    {
        return drive.media_available;
    }

    block.id_usage.as_deref() == Some(USAGE_FILESYSTEM)
}

/// Whether the mount control should ever be offered for a device.
pub fn should_mount(block: &BlockAttributes) -> bool {
    block.id_usage.as_deref() == Some(USAGE_FILESYSTEM)
}

/// Map device and drive attributes to an icon category.
///
/// First match wins: audio discs, then the optical media table, then the
/// flash-card table, then removability refined by transport bus. A device
/// without a drive object stays [`IconCategory::Unknown`].
pub fn classify(block: &BlockAttributes, drive: Option<&DriveAttributes>) -> IconCategory {
    let Some(drive) = drive else {
        return IconCategory::Unknown;
    };

    let media = drive.media.as_deref().unwrap_or_default();

    if drive.optical {
        if !should_mount(block) && drive.audio_track_count > 0 {
            return IconCategory::CdAudio;
        }

        return lookup(OPTICAL_MEDIA_ICONS, media).unwrap_or(IconCategory::CdUnknown);
    }

    if let Some(icon) = lookup(FLASH_MEDIA_ICONS, media) {
        return icon;
    }

    let bus = drive.connection_bus.as_deref();
    if drive.removable {
        match bus {
            Some("usb") => IconCategory::RemovableUsb,
            Some("ieee1394") => IconCategory::Removable1394,
            _ => IconCategory::Removable,
        }
    } else {
        match bus {
            Some("usb") => IconCategory::HarddiskUsb,
            Some("ieee1394") => IconCategory::Harddisk1394,
            _ => IconCategory::Harddisk,
        }
    }
}
