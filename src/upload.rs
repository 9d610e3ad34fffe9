use tracing::{info, warn};

use crate::error::DecodeError;
use crate::frame::{FrameMeta, NewFrame};
use crate::imaging::transform;
use crate::screen::Screen;

pub const MULTIPART_SOURCE: &str = "multipart";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug)]
pub struct Upload {
    pub data: Vec<u8>,
    pub source: String,
    pub content_type: String,
}

impl Upload {
    pub fn raw(data: Vec<u8>, content_type: Option<&str>) -> Self {
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string();
        Self {
            data,
            source: content_type.clone(),
            content_type,
        }
    }

    pub fn multipart(data: Vec<u8>, content_type: Option<&str>) -> Self {
        Self {
            data,
            source: MULTIPART_SOURCE.to_string(),
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOutcome {
    pub src_width: u32,
    pub src_height: u32,
    pub meta: FrameMeta,
}

/// Transform an upload and make it the current frame. On any error the
/// previous frame stays current.
pub fn handle_upload(screen: &Screen, upload: Upload) -> Result<UploadOutcome, DecodeError> {
    if upload.data.is_empty() {
        warn!(source = %upload.source, "Upload rejected: empty body");
        return Err(DecodeError::Empty);
    }

    // Decode and resize before touching the store lock.
    let mono = transform(&upload.data, &screen.settings).map_err(|e| {
        warn!(error = %e, source = %upload.source, "/image error");
        e
    })?;

    let bytes_out = mono.png.len();
    let meta = screen.frames.replace(NewFrame {
        png: mono.png,
        source: upload.source,
        content_type: upload.content_type,
        src_size: Some((mono.src_width, mono.src_height)),
    });
    info!(
        source = %meta.source,
        bytes_in = upload.data.len(),
        bytes_out,
        generation = meta.generation,
        "/image"
    );

    Ok(UploadOutcome {
        src_width: mono.src_width,
        src_height: mono.src_height,
        meta,
    })
}
