//! Pixel transforms for product photos, plus their file and batch drivers.

pub mod background;
pub mod badge;
pub mod compress;
pub mod keying;

use crate::error::{Error, Result};
use image::DynamicImage;
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use background::{
    FloodOptions, FloodOutcome, flood_replace_dir, flood_replace_file, flood_replace_white,
    replace_white, replace_white_dir, replace_white_file,
};
pub use badge::{BadgeCropOptions, badge_crop, badge_crop_file};
pub use compress::{
    CompressOptions, CompressionOutcome, compress_file, compress_large_images, find_large_images,
};
pub use keying::{alpha_key_file, alpha_key_luma};

/// Tally for a batch run. Individual failures never abort the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "bmp", "gif"];

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Image files under `root`, sorted by path. Unreadable entries are logged
/// and skipped.
pub fn scan_images(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::Invalid(format!("not a directory: {}", root.display())));
    }
    let walker = if recursive {
        WalkDir::new(root)
    } else {
        WalkDir::new(root).max_depth(1)
    };
    let mut files = Vec::new();
    for entry in walker.sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_image_extension(path) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::image(path, e))
}

/// Writes `img` as PNG, creating parent directories.
pub fn save_png(img: &DynamicImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| Error::image(path, e))
}

/// Writes `img` in the format implied by the extension of `path`.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn save_image(img: &DynamicImage, path: &Path) -> Result<()> {
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let saved = if is_jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8()).save(path)
    } else {
        img.save(path)
    };
    saved.map_err(|e| Error::image(path, e))
}

/// Same path with a `.png` extension.
pub fn png_path(path: &Path) -> PathBuf {
    path.with_extension("png")
}
