//! Luma keying of dark backgrounds with a feathered edge.

use crate::color::luma;
use crate::error::Result;
use crate::transform::{open_image, png_path, save_png};
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};

/// Alpha for a pixel of the given luma: 0 at or below `t0`, `None`
/// (unchanged) at or above `t1`, linear in between.
pub fn keyed_alpha(luma: u8, t0: u8, t1: u8) -> Option<u8> {
    if luma <= t0 {
        Some(0)
    } else if luma < t1 {
        let ramp = f32::from(luma - t0) / f32::from(t1 - t0);
        Some((ramp * 255.0) as u8)
    } else {
        None
    }
}

/// Keys out near-black pixels. Fully transparent input pixels are left as is,
/// and existing alpha is never raised.
pub fn alpha_key_luma(img: &mut RgbaImage, t0: u8, t1: u8) {
    for px in img.pixels_mut() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        if let Some(keyed) = keyed_alpha(luma([r, g, b]), t0, t1) {
            px.0[3] = a.min(keyed);
        }
    }
}

/// Keys `input` and writes the result as PNG, the only target that keeps alpha.
pub fn alpha_key_file(input: &Path, output: &Path, t0: u8, t1: u8) -> Result<PathBuf> {
    let mut img = open_image(input)?.to_rgba8();
    alpha_key_luma(&mut img, t0, t1);
    let out = png_path(output);
    save_png(&DynamicImage::ImageRgba8(img), &out)?;
    tracing::info!("keyed {} -> {}", input.display(), out.display());
    Ok(out)
}
