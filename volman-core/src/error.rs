//! Error types for the watcher lifecycle

use thiserror::Error;

/// Errors the watcher can surface to its caller.
///
/// Only startup is fatal: once [`crate::Watcher::bootstrap`] has
/// succeeded, service restarts and transport drops are absorbed by the
/// retry loop and never reported as errors.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("could not establish the backend connection: {0}")]
    Initialization(#[source] anyhow::Error),
}
