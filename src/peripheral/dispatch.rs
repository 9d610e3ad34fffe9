use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::bitmap::{AsciiRenderer, BitmapHeader, unpack};
use crate::config::{BitmapMode, DumpOptions, ServiceIds};
use crate::error::FormatError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Command,
    Data,
    Unknown,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Command => "cmd",
            Channel::Data => "data",
            Channel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BitmapOutcome {
    Rendered {
        header: Option<BitmapHeader>,
        art: String,
    },
    Failed {
        header_mode: bool,
        error: FormatError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteReport {
    pub central: Option<String>,
    pub characteristic: String,
    pub channel: Channel,
    pub len: usize,
    pub hex: String,
    pub base64: Option<String>,
    pub utf8: Option<String>,
    pub bitmap: Option<BitmapOutcome>,
}

impl fmt::Display for WriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hex: {}", self.hex)?;
        if let Some(b64) = &self.base64 {
            write!(f, "\nb64: {b64}")?;
        }
        if let Some(text) = &self.utf8 {
            write!(f, "\nutf8: {text}")?;
        }
        if let Some(BitmapOutcome::Rendered { header, art }) = &self.bitmap {
            if let Some(h) = header {
                write!(
                    f,
                    "\nbitmap-header: {}x{} row_bytes={} msb_first={} invert={}",
                    h.width,
                    h.height,
                    h.row_stride,
                    h.bit_order.is_msb_first(),
                    h.invert
                )?;
            }
            write!(f, "\nbitmap:\n{art}")?;
        }
        Ok(())
    }
}

/// Interprets data written to the peripheral. Driven from a single task, one
/// write at a time.
#[derive(Debug)]
pub struct WriteDispatcher {
    ids: ServiceIds,
    dump: DumpOptions,
    mode: BitmapMode,
    renderer: AsciiRenderer,
    writes: u64,
}

impl WriteDispatcher {
    pub fn new(
        ids: ServiceIds,
        dump: DumpOptions,
        mode: BitmapMode,
        renderer: AsciiRenderer,
    ) -> Self {
        Self {
            ids,
            dump,
            mode,
            renderer,
            writes: 0,
        }
    }

    pub fn classify(&self, channel_id: &str) -> Channel {
        if channel_id.eq_ignore_ascii_case(&self.ids.command) {
            Channel::Command
        } else if channel_id.eq_ignore_ascii_case(&self.ids.data) {
            Channel::Data
        } else {
            Channel::Unknown
        }
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn on_write_received(&mut self, channel_id: &str, data: &[u8]) -> WriteReport {
        self.writes += 1;
        let channel = self.classify(channel_id);

        let utf8 = if self.dump.try_utf8 {
            std::str::from_utf8(data).ok().map(str::to_string)
        } else {
            None
        };

        let bitmap = match self.mode {
            BitmapMode::Off => None,
            BitmapMode::Sized(layout) => Some(
                match unpack(data, &layout) {
                    Ok(grid) => BitmapOutcome::Rendered {
                        header: None,
                        art: self.renderer.render(&grid),
                    },
                    Err(error) => BitmapOutcome::Failed {
                        header_mode: false,
                        error,
                    },
                },
            ),
            BitmapMode::Header => Some(self.render_with_header(data)),
        };

        WriteReport {
            central: None,
            characteristic: channel_id.to_string(),
            channel,
            len: data.len(),
            hex: hex::encode(data),
            base64: self.dump.show_base64.then(|| STANDARD.encode(data)),
            utf8,
            bitmap,
        }
    }

    fn render_with_header(&self, data: &[u8]) -> BitmapOutcome {
        let rendered = BitmapHeader::decode(data).and_then(|(header, payload)| {
            let grid = unpack(payload, &header.layout())?;
            Ok((header, grid))
        });
        match rendered {
            Ok((header, grid)) => BitmapOutcome::Rendered {
                header: Some(header),
                art: self.renderer.render(&grid),
            },
            Err(error) => BitmapOutcome::Failed {
                header_mode: true,
                error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{BitOrder, BitmapLayout};

    fn dispatcher(mode: BitmapMode) -> WriteDispatcher {
        WriteDispatcher::new(
            ServiceIds::default(),
            DumpOptions::default(),
            mode,
            AsciiRenderer::default(),
        )
    }

    #[test]
    fn classifies_by_characteristic_case_insensitively() {
        let d = dispatcher(BitmapMode::Off);
        assert_eq!(d.classify("fff1"), Channel::Command);
        assert_eq!(d.classify("FFF2"), Channel::Data);
        assert_eq!(d.classify("2A00"), Channel::Unknown);
    }

    #[test]
    fn plain_dump_has_hex_and_text() {
        let mut d = dispatcher(BitmapMode::Off);
        let report = d.on_write_received("FFF1", b"NEXT");
        assert_eq!(report.channel, Channel::Command);
        assert_eq!(report.characteristic, "FFF1");
        assert_eq!(report.hex, "4e455854");
        assert_eq!(report.utf8.as_deref(), Some("NEXT"));
        assert_eq!(report.base64, None);
        assert_eq!(report.bitmap, None);
        assert_eq!(report.to_string(), "hex: 4e455854\nutf8: NEXT");
    }

    #[test]
    fn base64_and_utf8_follow_options() {
        let mut d = WriteDispatcher::new(
            ServiceIds::default(),
            DumpOptions {
                show_base64: true,
                try_utf8: false,
            },
            BitmapMode::Off,
            AsciiRenderer::default(),
        );
        let report = d.on_write_received("FFF2", b"hi");
        assert_eq!(report.base64.as_deref(), Some("aGk="));
        assert_eq!(report.utf8, None);
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        let mut d = dispatcher(BitmapMode::Off);
        assert_eq!(d.on_write_received("FFF2", &[0xFF, 0xFE]).utf8, None);
    }

    #[test]
    fn sized_mode_renders_raw_bytes() {
        let mut d = dispatcher(BitmapMode::Sized(BitmapLayout::packed(8, 2)));
        let report = d.on_write_received("FFF2", &[0xAA, 0x0F]);
        assert_eq!(
            report.bitmap,
            Some(BitmapOutcome::Rendered {
                header: None,
                art: "#.#.#.#.\n....####".into()
            })
        );
    }

    #[test]
    fn header_mode_renders_embedded_dimensions() {
        let mut d = dispatcher(BitmapMode::Header);
        let mut buf = b"BMP1".to_vec();
        buf.extend_from_slice(&[8, 0, 1, 0, 1, 0, 0x00, 0x00, 0xAA]);
        let report = d.on_write_received("FFF2", &buf);
        let Some(BitmapOutcome::Rendered { header, art }) = &report.bitmap else {
            panic!("expected a rendered bitmap, got {:?}", report.bitmap);
        };
        assert_eq!(art, "#.#.#.#.");
        let header = header.unwrap();
        assert_eq!(header.bit_order, BitOrder::MsbFirst);
        assert!(report.to_string().ends_with(
            "bitmap-header: 8x1 row_bytes=1 msb_first=true invert=false\nbitmap:\n#.#.#.#."
        ));
    }

    #[test]
    fn failures_are_reported_and_processing_continues() {
        let mut d = dispatcher(BitmapMode::Header);
        let report = d.on_write_received("FFF2", b"BMP");
        assert!(matches!(
            report.bitmap,
            Some(BitmapOutcome::Failed {
                header_mode: true,
                error: FormatError::HeaderTooShort { .. }
            })
        ));
        let mut good = b"BMP1".to_vec();
        good.extend_from_slice(&[1, 0, 1, 0, 1, 0, 0x02, 0x00, 0x00]);
        let report = d.on_write_received("FFF2", &good);
        assert!(matches!(
            report.bitmap,
            Some(BitmapOutcome::Rendered { ref art, .. }) if art == "#"
        ));
        assert_eq!(d.writes(), 2);
    }
}
