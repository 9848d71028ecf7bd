// SPDX-License-Identifier: GPL-3.0-only

//! Backend-agnostic core of the volman volume manager
//!
//! The pieces, bottom-up:
//!
//! - [`Volume`] and [`VolumeRegistry`]: the ordered set of currently
//!   visible volumes plus the single selection cursor, publishing a
//!   [`DockFrame`] to the rendering collaborator after every effective
//!   mutation.
//! - [`backend`]: the capability traits a concrete bus binding has to
//!   provide ([`VolumeOps`], [`BackendConnector`], [`BackendTransport`])
//!   and the [`BackendEvent`] stream it feeds the watcher with.
//! - [`CommandDispatcher`]: fire-and-forget mount/unmount requests whose
//!   completions are folded back into the registry's error flag.
//! - [`Watcher`]: the connection lifecycle state machine. Bootstrap is
//!   fatal on failure; every later loss of the service or the transport
//!   is recovered by clearing the registry and retrying on a fixed
//!   interval until the backend is reachable again.

mod dispatch;
mod error;
mod registry;
mod volume;
mod watcher;

pub mod backend;

pub use backend::{
    BackendConnector, BackendEvent, BackendEvents, BackendTransport, ServiceLink, VolumeOps,
};
pub use dispatch::{CommandDispatcher, ControlMessage, Controls};
pub use error::WatchError;
pub use registry::{ButtonStates, CurrentVolume, DockFrame, VolumeRegistry};
pub use volume::Volume;
pub use watcher::{ActiveLink, LinkState, RETRY_INTERVAL, Watcher};
