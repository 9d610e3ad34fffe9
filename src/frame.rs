use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;

pub const PLACEHOLDER_SOURCE: &str = "placeholder";
pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameMeta {
    pub generation: u64,
    pub updated_at: String,
    pub source: String,
    pub content_type: String,
    pub bytes: usize,
    pub src_width: Option<u32>,
    pub src_height: Option<u32>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    pub png: Bytes,
    pub meta: FrameMeta,
}

#[derive(Clone, Debug)]
pub struct NewFrame {
    pub png: Vec<u8>,
    pub source: String,
    pub content_type: String,
    pub src_size: Option<(u32, u32)>,
}

impl NewFrame {
    pub fn placeholder(png: Vec<u8>) -> Self {
        Self {
            png,
            source: PLACEHOLDER_SOURCE.to_string(),
            content_type: PNG_CONTENT_TYPE.to_string(),
            src_size: None,
        }
    }
}

/// Holds the single live frame. Readers get an `Arc` snapshot so bytes and
/// metadata always come from the same generation.
#[derive(Debug)]
pub struct FrameStore {
    current: Mutex<Arc<Frame>>,
}

impl FrameStore {
    pub fn new(initial: NewFrame) -> Self {
        Self {
            current: Mutex::new(Arc::new(stamp(initial, 0))),
        }
    }

    /// Swap in a new frame, discarding the previous one. Returns its metadata.
    pub fn replace(&self, next: NewFrame) -> FrameMeta {
        let mut current = self.lock();
        let frame = Arc::new(stamp(next, current.meta.generation + 1));
        let meta = frame.meta.clone();
        *current = frame;
        meta
    }

    pub fn snapshot(&self) -> Arc<Frame> {
        Arc::clone(&self.lock())
    }

    pub fn meta(&self) -> FrameMeta {
        self.lock().meta.clone()
    }

    // Every critical section leaves the Arc fully formed, so a poisoned lock
    // still guards a valid frame.
    fn lock(&self) -> MutexGuard<'_, Arc<Frame>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn stamp(next: NewFrame, generation: u64) -> Frame {
    let meta = FrameMeta {
        generation,
        updated_at: now_str(),
        source: next.source,
        content_type: next.content_type,
        bytes: next.png.len(),
        src_width: next.src_size.map(|(w, _)| w),
        src_height: next.src_size.map(|(_, h)| h),
    };
    Frame {
        png: Bytes::from(next.png),
        meta,
    }
}

pub fn now_str() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
