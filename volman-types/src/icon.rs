//! Icon taxonomy for tracked volumes
//!
//! A volume is classified exactly once, at creation, into one of these
//! categories. The renderer maps a category to a pixmap through
//! [`IconCategory::file_name`]; when a theme does not ship that file it
//! walks [`IconCategory::fallback`] until it finds one it has (the chain
//! always terminates at [`IconCategory::Unknown`]).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconCategory {
    Unknown,
    CdUnknown,
    Cdrom,
    CdAudio,
    Cdr,
    Cdrw,
    Dvdrom,
    Dvdram,
    Dvdr,
    Dvdrw,
    DvdPlusR,
    DvdPlusRw,
    Bd,
    Bdr,
    Bdre,
    Hddvd,
    Hddvdr,
    Hddvdrw,
    Harddisk,
    HarddiskUsb,
    Harddisk1394,
    Removable,
    RemovableUsb,
    Removable1394,
    CardCf,
    CardMs,
    CardSdMmc,
    CardSm,
}

impl IconCategory {
    /// Theme-relative pixmap file name for this category.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown.xpm",
            Self::CdUnknown => "cdrom-unknown.xpm",
            Self::Cdrom => "cdrom.xpm",
            Self::CdAudio => "disc-audio.xpm",
            Self::Cdr => "disc-cdr.xpm",
            Self::Cdrw => "disc-cdrw.xpm",
            Self::Dvdrom => "disc-dvdrom.xpm",
            Self::Dvdram => "disc-dvdram.xpm",
            Self::Dvdr => "disc-dvdr.xpm",
            Self::Dvdrw => "disc-dvdrw.xpm",
            Self::DvdPlusR => "disc-dvdr-plus.xpm",
            Self::DvdPlusRw => "disc-dvdrw-plus.xpm",
            Self::Bd => "disc-bd.xpm",
            Self::Bdr => "disc-bdr.xpm",
            Self::Bdre => "disc-bdre.xpm",
            Self::Hddvd => "disc-hddvd.xpm",
            Self::Hddvdr => "disc-hddvdr.xpm",
            Self::Hddvdrw => "disc-hddvdrw.xpm",
            Self::Harddisk => "harddisk.xpm",
            Self::HarddiskUsb => "harddisk-usb.xpm",
            Self::Harddisk1394 => "harddisk-1394.xpm",
            Self::Removable => "removable.xpm",
            Self::RemovableUsb => "removable-usb.xpm",
            Self::Removable1394 => "removable-1394.xpm",
            Self::CardCf => "card-cf.xpm",
            Self::CardMs => "card-ms.xpm",
            Self::CardSdMmc => "card-sdmmc.xpm",
            Self::CardSm => "card-sm.xpm",
        }
    }

    /// Next category to try when a theme lacks the pixmap for this one.
    /// `None` only for [`IconCategory::Unknown`], the root of every chain.
    pub fn fallback(self) -> Option<IconCategory> {
        match self {
            Self::Unknown => None,
            Self::CdUnknown => Some(Self::Unknown),
            Self::Cdrom => Some(Self::CdUnknown),
            Self::CdAudio => Some(Self::Cdrom),
            Self::Cdr => Some(Self::Cdrom),
            Self::Cdrw => Some(Self::Cdrom),
            Self::Dvdrom => Some(Self::Cdrom),
            Self::Dvdram => Some(Self::Dvdrom),
            Self::Dvdr => Some(Self::Dvdrom),
            Self::Dvdrw => Some(Self::Dvdrom),
            Self::DvdPlusR => Some(Self::Dvdrom),
            Self::DvdPlusRw => Some(Self::Dvdrom),
            Self::Bd => Some(Self::Dvdrom),
            Self::Bdr => Some(Self::Bd),
            Self::Bdre => Some(Self::Bd),
            Self::Hddvd => Some(Self::Dvdrom),
            Self::Hddvdr => Some(Self::Hddvd),
            Self::Hddvdrw => Some(Self::Hddvd),
            Self::Harddisk => Some(Self::Unknown),
            Self::HarddiskUsb => Some(Self::Harddisk),
            Self::Harddisk1394 => Some(Self::Harddisk),
            Self::Removable => Some(Self::Unknown),
            Self::RemovableUsb => Some(Self::Removable),
            Self::Removable1394 => Some(Self::Removable),
            Self::CardCf => Some(Self::Removable),
            Self::CardMs => Some(Self::Removable),
            Self::CardSdMmc => Some(Self::Removable),
            Self::CardSm => Some(Self::Removable),
        }
    }
}
