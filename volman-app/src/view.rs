//! Logging stand-in for the dock renderer
//!
//! Consumes redraw frames and reports what a real dock would draw: the
//! current volume line, the resolved icon file and the control states.
//! Identical consecutive frames are dropped here rather than upstream,
//! mirroring how a renderer skips repaints of an unchanged window.

use tokio::sync::mpsc;
use tracing::info;
use volman_core::DockFrame;
use volman_types::IconCategory;

pub struct DockView {
    theme: String,
    last: Option<DockFrame>,
}

impl DockView {
    pub fn new(theme: String) -> Self {
        Self { theme, last: None }
    }

    pub async fn run(mut self, mut frames: mpsc::UnboundedReceiver<DockFrame>) {
        while let Some(frame) = frames.recv().await {
            if self.last.as_ref() == Some(&frame) {
                continue;
            }
            self.render(&frame);
            self.last = Some(frame);
        }
    }

    fn render(&self, frame: &DockFrame) {
        match &frame.current {
            Some(volume) => info!(
                target: "volman::dock",
                icon = %self.icon_file(volume.icon),
                mounted = volume.mounted,
                busy = volume.busy,
                error = volume.error,
                mount_button = frame.buttons.mount_enabled,
                prev = frame.buttons.prev_enabled,
                next = frame.buttons.next_enabled,
                "{}",
                volume.display_name,
            ),
            None => info!(target: "volman::dock", "no volume"),
        }
    }

    /// Theme-relative icon path. A real renderer walks the fallback
    /// chain until it finds a file the theme ships; we report the first
    /// candidate.
    fn icon_file(&self, icon: IconCategory) -> String {
        format!("{}/{}", self.theme, icon.file_name())
    }
}
