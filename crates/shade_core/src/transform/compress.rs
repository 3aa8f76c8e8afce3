//! Re-encoding oversized product photos.

use crate::error::{Error, Result};
use crate::transform::{BatchReport, open_image};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const COMPRESSIBLE: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// JPEG quality, 1 to 100.
    pub quality: u8,
    /// Longest side after resizing.
    pub max_dimension: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: 85,
            max_dimension: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionOutcome {
    pub path: PathBuf,
    pub original_bytes: u64,
    pub new_bytes: u64,
    pub resized: bool,
    /// The re-encode was not smaller, so the original bytes were kept.
    pub kept_original: bool,
}

impl CompressionOutcome {
    pub fn saved_bytes(&self) -> u64 {
        self.original_bytes.saturating_sub(self.new_bytes)
    }

    pub fn saved_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            0.0
        } else {
            self.saved_bytes() as f64 * 100.0 / self.original_bytes as f64
        }
    }
}

/// Composites any alpha onto white.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let a = u16::from(a);
        let mix = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        *dst = Rgb([mix(r), mix(g), mix(b)]);
    }
    out
}

/// Target size that fits within `max_dimension`, aspect preserved.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }
    let (w, h) = if width > height {
        let h = (max_dimension as f64 / width as f64 * height as f64) as u32;
        (max_dimension, h)
    } else {
        let w = (max_dimension as f64 / height as f64 * width as f64) as u32;
        (w, max_dimension)
    };
    Some((w.max(1), h.max(1)))
}

/// Formats `compress_file` can write, picked by the output extension.
fn output_format(path: &Path) -> Option<ImageFormat> {
    ImageFormat::from_path(path)
        .ok()
        .filter(|f| matches!(f, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP))
}

fn encode(img: &RgbImage, format: ImageFormat, quality: u8) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            img.write_with_encoder(encoder)?;
        }
        ImageFormat::WebP => img.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?,
        _ => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
            img.write_with_encoder(encoder)?;
        }
    }
    Ok(buf)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Re-encodes `input` into `output` (in place when `None`).
///
/// JPEG outputs use `opts.quality`, PNG outputs maximum deflate and WebP
/// outputs lossless encoding. The original bytes are kept instead when they
/// are already in the output's format, no resize happened and the re-encode
/// would not be smaller.
pub fn compress_file(input: &Path, output: Option<&Path>, opts: &CompressOptions) -> Result<CompressionOutcome> {
    let output = output.unwrap_or(input);
    let format = output_format(output).ok_or_else(|| {
        Error::Invalid(format!("unsupported output format for {}", output.display()))
    })?;
    let original = fs::read(input).map_err(|e| Error::io(input, e))?;
    let img = open_image(input)?;
    let mut rgb = flatten_on_white(&img);
    let resized = match fit_within(rgb.width(), rgb.height(), opts.max_dimension) {
        Some((w, h)) => {
            rgb = image::imageops::resize(&rgb, w, h, FilterType::Lanczos3);
            true
        }
        None => false,
    };
    let encoded = encode(&rgb, format, opts.quality).map_err(|e| Error::image(output, e))?;

    let same_format = image::guess_format(&original).is_ok_and(|f| f == format);
    let kept_original = same_format && !resized && encoded.len() >= original.len();
    let bytes = if kept_original { &original } else { &encoded };
    if !(kept_original && output == input) {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(output, bytes).map_err(|e| Error::io(output, e))?;
    }
    Ok(CompressionOutcome {
        path: output.to_path_buf(),
        original_bytes: original.len() as u64,
        new_bytes: bytes.len() as u64,
        resized,
        kept_original,
    })
}

/// Images at least `min_bytes` large under `dir`, largest first.
pub fn find_large_images(dir: &Path, min_bytes: u64) -> Result<Vec<(PathBuf, u64)>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !COMPRESSIBLE.contains(&extension_of(entry.path()).as_str()) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size >= min_bytes {
            found.push((entry.into_path(), size));
        }
    }
    found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(found)
}

/// Compresses every large image in place, tallying failures.
pub fn compress_large_images(
    dir: &Path,
    min_bytes: u64,
    opts: &CompressOptions,
) -> Result<(Vec<CompressionOutcome>, BatchReport)> {
    let targets = find_large_images(dir, min_bytes)?;
    let total = targets.len();
    let mut outcomes = Vec::new();
    let mut report = BatchReport::default();
    for (idx, (path, size)) in targets.into_iter().enumerate() {
        tracing::info!("[{}/{}] {} ({} bytes)", idx + 1, total, path.display(), size);
        match compress_file(&path, None, opts) {
            Ok(outcome) => {
                tracing::info!(
                    "  {} -> {} bytes ({:.1}% saved{})",
                    outcome.original_bytes,
                    outcome.new_bytes,
                    outcome.saved_percent(),
                    if outcome.resized { ", resized" } else { "" }
                );
                if outcome.kept_original {
                    report.skipped += 1;
                } else {
                    report.succeeded += 1;
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                tracing::warn!("  failed: {e}");
                report.failed += 1;
            }
        }
    }
    Ok((outcomes, report))
}
