use super::{BitmapLayout, min_row_stride};
use crate::error::FormatError;

/// Rectangular grid of on/off pixels, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl PixelGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(self.width)
    }

    pub fn count_on(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}

/// Unpack a 1bpp buffer into a [`PixelGrid`].
///
/// Only the first `ceil(width / 8)` bytes of each row carry pixels; any
/// padding up to `row_stride` is skipped.
pub fn unpack(payload: &[u8], layout: &BitmapLayout) -> Result<PixelGrid, FormatError> {
    if layout.width == 0 || layout.height == 0 {
        return Err(FormatError::InvalidSize {
            width: layout.width,
            height: layout.height,
        });
    }
    if layout.row_stride == 0 {
        return Err(FormatError::ZeroRowStride);
    }
    let needed_stride = min_row_stride(layout.width);
    if layout.row_stride < needed_stride {
        return Err(FormatError::RowStrideTooNarrow {
            width: layout.width,
            row_stride: layout.row_stride,
            needed: needed_stride,
        });
    }
    let needed = layout.required_len();
    if payload.len() < needed {
        return Err(FormatError::PayloadTooShort {
            expected: needed,
            received: payload.len(),
        });
    }

    let width = layout.width as usize;
    let height = layout.height as usize;
    let stride = layout.row_stride as usize;
    let flip = u8::from(layout.invert);

    let mut pixels = Vec::with_capacity(width * height);
    for row in payload[..needed].chunks_exact(stride) {
        for x in 0..width {
            let bit = (row[x / 8] >> layout.bit_order.bit_position(x)) & 1;
            pixels.push((bit ^ flip) == 1);
        }
    }

    Ok(PixelGrid {
        width,
        height,
        pixels,
    })
}
