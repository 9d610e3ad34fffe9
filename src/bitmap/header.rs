//! Tiny self-describing bitmap header.
//!
//! Layout (little-endian):
//!
//! ```text
//!   0..3   magic = b"BMP1"
//!   4..5   width (u16)
//!   6..7   height (u16)
//!   8..9   row_bytes (u16)
//!   10     flags (u8): bit0 = LSB-first, bit1 = invert
//!   11     reserved
//!   12..   bitmap payload
//! ```

use super::{BitOrder, BitmapLayout};
use crate::error::FormatError;

pub const MAGIC: [u8; 4] = *b"BMP1";
pub const HEADER_LEN: usize = 12;

const FLAG_LSB_FIRST: u8 = 0x01;
const FLAG_INVERT: u8 = 0x02;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapHeader {
    pub width: u16,
    pub height: u16,
    pub row_stride: u16,
    pub bit_order: BitOrder,
    pub invert: bool,
}

impl BitmapHeader {
    pub fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.bit_order == BitOrder::LsbFirst {
            flags |= FLAG_LSB_FIRST;
        }
        if self.invert {
            flags |= FLAG_INVERT;
        }
        flags
    }

    /// Serialize the header. The reserved byte is always written as zero.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..6].copy_from_slice(&self.width.to_le_bytes());
        out[6..8].copy_from_slice(&self.height.to_le_bytes());
        out[8..10].copy_from_slice(&self.row_stride.to_le_bytes());
        out[10] = self.flags();
        out
    }

    /// Parse a header off the front of `data`, returning it with the payload
    /// that follows. Payload length is checked later by the unpacker.
    pub fn decode(data: &[u8]) -> Result<(BitmapHeader, &[u8]), FormatError> {
        if data.len() < HEADER_LEN {
            return Err(FormatError::HeaderTooShort {
                expected: HEADER_LEN,
                received: data.len(),
            });
        }
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }

        let width = u16::from_le_bytes([data[4], data[5]]);
        let height = u16::from_le_bytes([data[6], data[7]]);
        let row_stride = u16::from_le_bytes([data[8], data[9]]);
        let flags = data[10];

        if width == 0 || height == 0 {
            return Err(FormatError::InvalidSize {
                width: width.into(),
                height: height.into(),
            });
        }
        if row_stride == 0 {
            return Err(FormatError::ZeroRowStride);
        }

        let header = BitmapHeader {
            width,
            height,
            row_stride,
            bit_order: if flags & FLAG_LSB_FIRST != 0 {
                BitOrder::LsbFirst
            } else {
                BitOrder::MsbFirst
            },
            invert: flags & FLAG_INVERT != 0,
        };
        Ok((header, &data[HEADER_LEN..]))
    }

    pub fn layout(&self) -> BitmapLayout {
        BitmapLayout {
            width: self.width.into(),
            height: self.height.into(),
            row_stride: self.row_stride.into(),
            bit_order: self.bit_order,
            invert: self.invert,
        }
    }
}
