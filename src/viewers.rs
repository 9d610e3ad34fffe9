use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;

use crate::error::TransportError;

/// Normalized command text pushed to every viewer: trimmed, upper-cased and
/// never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandToken(String);

impl CommandToken {
    pub const PING: &'static str = "PING";
    pub const PONG: &'static str = "PONG";
    pub const FRAME: &'static str = "FRAME";

    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim().to_uppercase();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Hardware-style buttons b1..b4 map to keyboard-like navigation.
    pub fn for_button(id: &str) -> Option<Self> {
        let cmd = match id {
            "b1" => "TAB",
            "b2" => "ENTER",
            "b3" => "BACK",
            "b4" => "FORWARD",
            _ => return None,
        };
        Some(Self(cmd.to_string()))
    }

    pub fn frame() -> Self {
        Self(Self::FRAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn reply_to(text: &str) -> Option<&'static str> {
    if text.trim().eq_ignore_ascii_case(CommandToken::PING) {
        Some(CommandToken::PONG)
    } else {
        None
    }
}

pub trait Viewer: Send {
    fn send_text(&self, text: &str) -> Result<(), TransportError>;
}

impl Viewer for UnboundedSender<String> {
    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.send(text.to_string())
            .map_err(|_| TransportError::Closed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

/// Membership set of connected viewers. The transport owns each connection;
/// the hub only remembers how to reach it.
#[derive(Default)]
pub struct ViewerHub {
    next_id: AtomicU64,
    viewers: Mutex<HashMap<ViewerId, Box<dyn Viewer>>>,
}

impl ViewerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, viewer: Box<dyn Viewer>) -> (ViewerId, usize) {
        let id = ViewerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut viewers = self.lock();
        viewers.insert(id, viewer);
        (id, viewers.len())
    }

    /// Removing a viewer that is already gone is a no-op.
    pub fn unregister(&self, id: ViewerId) -> usize {
        let mut viewers = self.lock();
        viewers.remove(&id);
        viewers.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `token` to every viewer, dropping those whose send fails.
    /// Returns how many viewers remain.
    pub fn broadcast(&self, token: &CommandToken) -> usize {
        let mut viewers = self.lock();
        viewers.retain(|id, viewer| match viewer.send_text(token.as_str()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(%id, error = %e, "Dropping viewer");
                false
            }
        });
        viewers.len()
    }

    // Sends never panic while the lock is held, and a half-finished retain
    // still leaves a valid map.
    fn lock(&self) -> MutexGuard<'_, HashMap<ViewerId, Box<dyn Viewer>>> {
        self.viewers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
