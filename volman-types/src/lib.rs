// SPDX-License-Identifier: GPL-3.0-only

//! Shared domain types for the volman volume manager
//!
//! This crate defines the vocabulary the rest of the stack speaks:
//!
//! - **volman-udisks**: builds [`DeviceSnapshot`]s from backend attributes
//! - **volman-core**: feeds snapshots through the display/classification
//!   predicates and into the volume registry
//! - **volman-app**: consumes [`IconCategory`] to pick a dock icon
//!
//! Everything here is plain data plus pure functions; nothing talks to the
//! bus or the runtime.

pub mod classify;
pub mod device;
pub mod icon;

pub use classify::{classify, should_display, should_mount};
pub use device::{BlockAttributes, DeviceSnapshot, DriveAttributes};
pub use icon::IconCategory;
