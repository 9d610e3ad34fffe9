use tracing::info;

use crate::error::DecodeError;
use crate::frame::{FrameStore, NewFrame};
use crate::imaging::{TransformSettings, placeholder_png};
use crate::viewers::{CommandToken, ViewerHub};

pub struct Screen {
    pub settings: TransformSettings,
    pub frames: FrameStore,
    pub viewers: ViewerHub,
}

impl Screen {
    pub fn new(settings: TransformSettings) -> Result<Self, DecodeError> {
        let placeholder = placeholder_png(settings.width, settings.height)?;
        info!(
            width = settings.width,
            height = settings.height,
            bytes = placeholder.len(),
            "Placeholder frame ready"
        );
        Ok(Self {
            settings,
            frames: FrameStore::new(NewFrame::placeholder(placeholder)),
            viewers: ViewerHub::new(),
        })
    }

    /// Normalize and broadcast a command. `None` when the command is blank.
    pub fn command(&self, raw: &str) -> Option<(CommandToken, usize)> {
        let token = CommandToken::parse(raw)?;
        let clients = self.viewers.broadcast(&token);
        info!(cmd = %token, clients, "ws_broadcast");
        Some((token, clients))
    }
}
