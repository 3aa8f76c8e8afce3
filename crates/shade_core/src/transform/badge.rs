//! Crop away a promotional badge and recentre the product on a grey square.

use crate::color::{Rgb, STORE_GREY};
use crate::error::Result;
use crate::transform::{open_image, png_path, save_png};
use image::{DynamicImage, Rgba, RgbaImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeCropOptions {
    /// Fraction of the width kept from the left edge.
    pub keep_left: f32,
    /// Rows with any channel below this count as content.
    pub content_threshold: u8,
    pub pad_top: u32,
    pub pad_bottom: u32,
    pub scale: f32,
    /// Horizontal placement of the product inside the free canvas space.
    pub x_position: f32,
    pub background: Rgb,
}

impl Default for BadgeCropOptions {
    fn default() -> Self {
        Self {
            keep_left: 0.70,
            content_threshold: 240,
            pad_top: 20,
            pad_bottom: 50,
            scale: 1.8,
            x_position: 0.20,
            background: STORE_GREY,
        }
    }
}

pub fn crop_right(img: &RgbaImage, keep_left: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let keep = ((w as f32 * keep_left) as u32).clamp(1, w.max(1));
    image::imageops::crop_imm(img, 0, 0, keep, h).to_image()
}

/// Vertical span of rows containing non-white content, padded.
pub fn content_rows(img: &RgbaImage, threshold: u8, pad_top: u32, pad_bottom: u32) -> Option<(u32, u32)> {
    let (w, h) = img.dimensions();
    let has_content = |y: u32| {
        (0..w).any(|x| {
            let [r, g, b, _] = img.get_pixel(x, y).0;
            r < threshold || g < threshold || b < threshold
        })
    };
    let first = (0..h).find(|&y| has_content(y))?;
    let last = (0..h).rev().find(|&y| has_content(y))?;
    let top = first.saturating_sub(pad_top);
    let bottom = (last + 1 + pad_bottom).min(h);
    Some((top, bottom))
}

pub fn trim_to_content(img: &RgbaImage, opts: &BadgeCropOptions) -> RgbaImage {
    match content_rows(img, opts.content_threshold, opts.pad_top, opts.pad_bottom) {
        Some((top, bottom)) => {
            image::imageops::crop_imm(img, 0, top, img.width(), bottom - top).to_image()
        }
        None => img.clone(),
    }
}

pub fn scale(img: &RgbaImage, factor: f32) -> RgbaImage {
    let w = ((img.width() as f32 * factor) as u32).max(1);
    let h = ((img.height() as f32 * factor) as u32).max(1);
    image::imageops::resize(img, w, h, FilterType::Lanczos3)
}

/// Square canvas of the larger side, product placed at `x_position` of the
/// spare width and centred vertically.
pub fn place_on_canvas(img: &RgbaImage, x_position: f32, background: Rgb) -> RgbaImage {
    let (w, h) = img.dimensions();
    let side = w.max(h);
    let mut canvas = RgbaImage::from_pixel(
        side,
        side,
        Rgba([background[0], background[1], background[2], 255]),
    );
    let x = ((side - w) as f32 * x_position) as i64;
    let y = ((side - h) / 2) as i64;
    image::imageops::overlay(&mut canvas, img, x, y);
    canvas
}

/// Full badge-removal pipeline.
pub fn badge_crop(img: &DynamicImage, opts: &BadgeCropOptions) -> DynamicImage {
    let rgba = img.to_rgba8();
    let cropped = crop_right(&rgba, opts.keep_left);
    let trimmed = trim_to_content(&cropped, opts);
    let scaled = scale(&trimmed, opts.scale);
    tracing::debug!(
        "badge crop: {}x{} -> {}x{} -> {}x{}",
        rgba.width(),
        rgba.height(),
        trimmed.width(),
        trimmed.height(),
        scaled.width(),
        scaled.height()
    );
    DynamicImage::ImageRgba8(place_on_canvas(&scaled, opts.x_position, opts.background))
}

/// Runs [`badge_crop`] on a file and writes a PNG next to `output`.
pub fn badge_crop_file(input: &Path, output: &Path, opts: &BadgeCropOptions) -> Result<PathBuf> {
    let img = open_image(input)?;
    let out = png_path(output);
    save_png(&badge_crop(&img, opts), &out)?;
    tracing::info!("{} -> {}", input.display(), out.display());
    Ok(out)
}
