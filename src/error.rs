use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("need >= {expected} bytes for header, got {received}")]
    HeaderTooShort { expected: usize, received: usize },

    #[error("bad magic {0:02x?} (expected BMP1)")]
    BadMagic([u8; 4]),

    #[error("invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("row stride must be > 0")]
    ZeroRowStride,

    #[error("row stride {row_stride} too narrow for width {width} (need >= {needed})")]
    RowStrideTooNarrow {
        width: u32,
        row_stride: u32,
        needed: u32,
    },

    #[error("bitmap data too short: need >= {expected} bytes, got {received}")]
    PayloadTooShort { expected: usize, received: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{which} glyph must be a single character, got {value:?}")]
    InvalidGlyph { which: &'static str, value: String },

    #[error("size must look like 128x64, got {0:?}")]
    InvalidSize(String),

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("threshold must be 0..255, got {0}")]
    ThresholdOutOfRange(i64),

    #[error("--bitmap-header and --bitmap are mutually exclusive")]
    ConflictingModes,

    #[error("invalid bind address {0:?}")]
    BindAddress(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty body")]
    Empty,

    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),

    #[error("image task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("viewer channel closed")]
    Closed,

    #[error("viewer send failed: {0}")]
    Send(String),
}

#[derive(Error, Debug)]
pub enum BleperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl BleperError {
    /// Process exit status for this error; configuration problems exit with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            BleperError::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BleperError>;
