pub mod ascii;
pub mod header;
pub mod unpack;

pub use ascii::{AsciiRenderer, render};
pub use header::{BitmapHeader, HEADER_LEN, MAGIC};
pub use unpack::{PixelGrid, unpack};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BitOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

impl BitOrder {
    /// Bit position inside the owning byte for column `x`.
    pub fn bit_position(self, x: usize) -> u32 {
        let bit_in_byte = (x % 8) as u32;
        match self {
            BitOrder::MsbFirst => 7 - bit_in_byte,
            BitOrder::LsbFirst => bit_in_byte,
        }
    }

    pub fn is_msb_first(self) -> bool {
        self == BitOrder::MsbFirst
    }
}

/// How a 1bpp buffer is laid out in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapLayout {
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub bit_order: BitOrder,
    pub invert: bool,
}

impl BitmapLayout {
    /// Layout with the tightest stride for `width`, i.e. `ceil(width / 8)`.
    pub fn packed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            row_stride: min_row_stride(width),
            bit_order: BitOrder::MsbFirst,
            invert: false,
        }
    }

    pub fn required_len(&self) -> usize {
        self.row_stride as usize * self.height as usize
    }
}

pub fn min_row_stride(width: u32) -> u32 {
    width.div_ceil(8)
}
