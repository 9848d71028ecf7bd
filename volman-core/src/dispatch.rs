//! User commands and the async mount/unmount dispatcher
//!
//! Mount and unmount are fire-and-forget: the request task never blocks
//! the event loop, and its eventual completion is posted back as a
//! [`ControlMessage::CommandFinished`] which the watcher folds into the
//! volume's error flag. Requests against ids the registry no longer
//! tracks are dropped silently; they lost a race with a removal, which
//! is not an error.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::backend::VolumeOps;
use crate::registry::VolumeRegistry;

/// Everything the watcher's event loop can be asked to do from outside,
/// plus the dispatcher's own completion feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    SelectPrevious,
    SelectNext,
    /// Mount the current volume if unmounted, unmount it otherwise.
    ToggleMount,
    RequestMount(String),
    RequestUnmount(String),
    /// Posted by the dispatcher when an async request completes.
    CommandFinished { id: String, ok: bool },
}

/// Handle for the input-side collaborator (buttons, scroll wheel, ...).
#[derive(Clone)]
pub struct Controls {
    sender: mpsc::UnboundedSender<ControlMessage>,
}

impl Controls {
    pub(crate) fn new(sender: mpsc::UnboundedSender<ControlMessage>) -> Self {
        Self { sender }
    }

    pub fn select_previous(&self) {
        self.send(ControlMessage::SelectPrevious);
    }

    pub fn select_next(&self) {
        self.send(ControlMessage::SelectNext);
    }

    pub fn toggle_mount(&self) {
        self.send(ControlMessage::ToggleMount);
    }

    pub fn request_mount(&self, id: &str) {
        self.send(ControlMessage::RequestMount(id.to_owned()));
    }

    pub fn request_unmount(&self, id: &str) {
        self.send(ControlMessage::RequestUnmount(id.to_owned()));
    }

    fn send(&self, message: ControlMessage) {
        if self.sender.send(message).is_err() {
            trace!("watcher is gone; dropping control message");
        }
    }
}

/// Issues async mount/unmount requests for one attached service session.
pub struct CommandDispatcher {
    ops: Arc<dyn VolumeOps>,
    feedback: mpsc::UnboundedSender<ControlMessage>,
}

impl CommandDispatcher {
    pub fn new(ops: Arc<dyn VolumeOps>, feedback: mpsc::UnboundedSender<ControlMessage>) -> Self {
        Self { ops, feedback }
    }

    pub fn request_mount(&self, registry: &VolumeRegistry, id: &str) {
        self.request(registry, id, false);
    }

    pub fn request_unmount(&self, registry: &VolumeRegistry, id: &str) {
        self.request(registry, id, true);
    }

    fn request(&self, registry: &VolumeRegistry, id: &str, unmount: bool) {
        if !registry.is_managed(id) {
            trace!(id, "mount request for untracked volume dropped");
            return;
        }

        let ops = Arc::clone(&self.ops);
        let feedback = self.feedback.clone();
        let id = id.to_owned();

        tokio::spawn(async move {
            let result = if unmount {
                ops.unmount(&id).await
            } else {
                ops.mount(&id).await
            };

            let ok = match result {
                Ok(()) => true,
                Err(e) => {
                    warn!(%id, "{} failed: {e:#}", if unmount { "unmount" } else { "mount" });
                    false
                }
            };

            let _ = feedback.send(ControlMessage::CommandFinished { id, ok });
        });
    }
}
