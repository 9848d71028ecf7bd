// SPDX-License-Identifier: GPL-3.0-only

//! UDisks2 binding for the volman volume manager
//!
//! Implements the `volman-core` backend capability traits on top of the
//! system bus: device snapshots come from the typed `udisks2` proxies,
//! notifications from the UDisks2 ObjectManager plus a properties match
//! rule, and service presence from the bus's `NameOwnerChanged` signal.
//! The UDisks2 object path doubles as the volume id.

mod backend;
mod bytestring;
mod events;
mod jobs;
mod proxy;
mod snapshot;

pub use backend::UdisksConnector;

/// Well-known bus name of the device service.
pub const SERVICE_NAME: &str = "org.freedesktop.UDisks2";

/// Object path namespace every UDisks2 object lives under.
pub const OBJECT_PATH_PREFIX: &str = "/org/freedesktop/UDisks2";
