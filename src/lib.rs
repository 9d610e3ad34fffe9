pub mod bitmap;
pub mod config;
pub mod error;
pub mod frame;
pub mod imaging;
pub mod peripheral;
pub mod screen;
pub mod upload;
pub mod viewers;

#[cfg(feature = "web")]
pub mod web;

pub use bitmap::{AsciiRenderer, BitOrder, BitmapHeader, BitmapLayout, PixelGrid, render, unpack};
pub use config::{BitmapMode, PeripheralConfig, ServerConfig};
pub use error::{BleperError, ConfigError, DecodeError, FormatError, Result, TransportError};
pub use frame::{Frame, FrameMeta, FrameStore, NewFrame};
pub use imaging::{Monochrome, TransformSettings, transform};
pub use peripheral::{Peripheral, WriteDispatcher, run_peripheral};
pub use screen::Screen;
pub use upload::{Upload, UploadOutcome, handle_upload};
pub use viewers::{CommandToken, Viewer, ViewerHub, ViewerId};

/// Resolves on Ctrl+C. If the signal handler cannot be installed this never
/// resolves, leaving the caller to stop some other way.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
