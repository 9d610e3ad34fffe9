//! Turns arbitrary uploaded images into the monochrome PNG shown on the
//! simulated e-book screen.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, Luma};

use crate::error::DecodeError;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Target screen and binarization parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransformSettings {
    pub width: u32,
    pub height: u32,
    pub threshold: u8,
    pub invert: bool,
}

/// A transformed image: PNG bytes plus the dimensions of the upload.
#[derive(Clone, Debug)]
pub struct Monochrome {
    pub png: Vec<u8>,
    pub src_width: u32,
    pub src_height: u32,
}

/// Decode, grayscale, optionally invert, resize and threshold an image.
pub fn transform(data: &[u8], settings: &TransformSettings) -> Result<Monochrome, DecodeError> {
    let img = image::load_from_memory(data)?;
    let (src_width, src_height) = img.dimensions();

    let mut gray = img.to_luma8();
    if settings.invert {
        imageops::invert(&mut gray);
    }

    let resized = resize_exact(&gray, settings.width, settings.height);
    let bw = binarize(&resized, settings.threshold);

    Ok(Monochrome {
        png: encode_png(bw)?,
        src_width,
        src_height,
    })
}

fn resize_exact(gray: &GrayImage, width: u32, height: u32) -> GrayImage {
    if gray.dimensions() == (width, height) {
        return gray.clone();
    }
    imageops::resize(gray, width, height, FilterType::Lanczos3)
}

/// Pixels strictly brighter than `threshold` become white, the rest black.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            WHITE
        } else {
            BLACK
        }
    })
}

pub fn encode_png(img: GrayImage) -> Result<Vec<u8>, DecodeError> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Startup frame: white screen with a black border and an hourglass in the
/// middle. Always identical for the same size.
pub fn placeholder_image(width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, WHITE);
    if width == 0 || height == 0 {
        return img;
    }

    let border = (width.min(height) / 60).max(1);
    for y in 0..height {
        for x in 0..width {
            if x < border || y < border || x >= width - border || y >= height - border {
                img.put_pixel(x, y, BLACK);
            }
        }
    }

    let cx = (width / 2) as i32;
    let cy = (height / 2) as i32;
    let half_h = (height as f32 * 0.12) as i32;
    let max_half_w = (width as f32 * 0.18) as i32;
    for dy in -half_h..=half_h {
        let t = dy.abs() as f32 / half_h.max(1) as f32;
        let half = (max_half_w as f32 * t) as i32;
        let y = cy + dy;
        if y < 0 || y >= height as i32 {
            continue;
        }
        let x0 = (cx - half).max(0) as u32;
        let x1 = (cx + half).min(width as i32 - 1) as u32;
        for x in x0..=x1 {
            img.put_pixel(x, y as u32, BLACK);
        }
    }
    img
}

pub fn placeholder_png(width: u32, height: u32) -> Result<Vec<u8>, DecodeError> {
    encode_png(placeholder_image(width, height))
}
