//! Typed, validated configuration built from raw command-line values.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::bitmap::{AsciiRenderer, BitOrder, BitmapLayout, min_row_stride};
use crate::error::ConfigError;
use crate::imaging::TransformSettings;

/// Parse `128x64` (also `128,64`, any case, surrounding spaces allowed).
pub fn parse_size(raw: &str) -> Result<(u32, u32), ConfigError> {
    let s = raw.trim().to_lowercase().replace(',', "x");
    let invalid = || ConfigError::InvalidSize(raw.to_string());
    let (w, h) = s.split_once('x').ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(ConfigError::NonPositive("bitmap width/height"));
    }
    Ok((width, height))
}

/// How incoming data writes are interpreted as bitmaps. Only one mode can be
/// active per process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitmapMode {
    Off,
    Sized(BitmapLayout),
    Header,
}

#[derive(Clone, Debug, Default)]
pub struct BitmapArgs {
    pub size: Option<String>,
    pub header: bool,
    pub row_bytes: Option<u32>,
    pub lsb_first: bool,
    pub invert: bool,
}

impl BitmapMode {
    pub fn from_args(args: &BitmapArgs) -> Result<Self, ConfigError> {
        if args.header && args.size.is_some() {
            return Err(ConfigError::ConflictingModes);
        }
        if args.row_bytes == Some(0) {
            return Err(ConfigError::NonPositive("bitmap row bytes"));
        }
        if args.header {
            return Ok(BitmapMode::Header);
        }
        let Some(size) = args.size.as_deref() else {
            return Ok(BitmapMode::Off);
        };
        let (width, height) = parse_size(size)?;
        Ok(BitmapMode::Sized(BitmapLayout {
            width,
            height,
            row_stride: args.row_bytes.unwrap_or_else(|| min_row_stride(width)),
            bit_order: if args.lsb_first {
                BitOrder::LsbFirst
            } else {
                BitOrder::MsbFirst
            },
            invert: args.invert,
        }))
    }
}

/// Characteristic identifiers the peripheral exposes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceIds {
    pub name: String,
    pub service: String,
    pub command: String,
    pub data: String,
}

impl Default for ServiceIds {
    fn default() -> Self {
        Self {
            name: "BlePer".into(),
            service: "FFF0".into(),
            command: "FFF1".into(),
            data: "FFF2".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DumpOptions {
    pub show_base64: bool,
    pub try_utf8: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            show_base64: false,
            try_utf8: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PeripheralConfig {
    pub ids: ServiceIds,
    pub dump: DumpOptions,
    pub mode: BitmapMode,
    pub renderer: AsciiRenderer,
}

impl PeripheralConfig {
    pub fn new(
        ids: ServiceIds,
        dump: DumpOptions,
        bitmap: &BitmapArgs,
        on: &str,
        off: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            ids,
            dump,
            mode: BitmapMode::from_args(bitmap)?,
            renderer: AsciiRenderer::new(on, off)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub transform: TransformSettings,
}

impl ServerConfig {
    pub fn new(
        host: &str,
        port: u16,
        screen_width: i64,
        screen_height: i64,
        threshold: i64,
        invert: bool,
    ) -> Result<Self, ConfigError> {
        if !(0..=255).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        let width = positive(screen_width, "screen width")?;
        let height = positive(screen_height, "screen height")?;
        Ok(Self {
            addr: SocketAddr::new(bind_ip(host)?, port),
            transform: TransformSettings {
                width,
                height,
                threshold: threshold as u8,
                invert,
            },
        })
    }
}

/// IP literal (IPv6 optionally in brackets) or `localhost`. Other names are
/// not resolved.
fn bind_ip(host: &str) -> Result<IpAddr, ConfigError> {
    let host = host.trim();
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    let literal = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    literal
        .parse()
        .map_err(|_| ConfigError::BindAddress(host.to_string()))
}

fn positive(value: i64, what: &'static str) -> Result<u32, ConfigError> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::NonPositive(what)),
    }
}
