use serde::Serialize;
use std::sync::Arc;

use crate::frame::FrameMeta;
use crate::screen::Screen;

#[derive(Clone)]
pub struct AppState {
    pub host: String,
    pub port: u16,
    pub screen: Arc<Screen>,
}

#[derive(Serialize)]
pub struct MetaResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub meta: FrameMeta,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub src_width: u32,
    pub src_height: u32,
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub ok: bool,
    pub cmd: String,
    pub clients: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub kind: &'static str,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(kind: &'static str, error: impl ToString) -> Self {
        Self {
            ok: false,
            kind,
            error: error.to_string(),
        }
    }
}
