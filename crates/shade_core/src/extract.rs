//! Dominant colour extraction from bottle photographs.

use crate::color::{Rgb, channel_sum, saturation, to_hex};
use crate::error::{Error, Result};
use image::{RgbImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Fractional crop window, each edge in `[0, 1]` of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CropBox {
    pub fn apply(&self, img: &RgbImage) -> RgbImage {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return img.clone();
        }
        let left = ((w as f32 * self.left) as u32).min(w - 1);
        let top = ((h as f32 * self.top) as u32).min(h - 1);
        let right = ((w as f32 * self.right) as u32).clamp(left + 1, w);
        let bottom = ((h as f32 * self.bottom) as u32).clamp(top + 1, h);
        image::imageops::crop_imm(img, left, top, right - left, bottom - top).to_image()
    }
}

/// Tunables for [`extract_dominant_color`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub crop: Option<CropBox>,
    /// Square side to resample to before filtering.
    pub resize: Option<u32>,
    /// Pixels must have `min_sum < r+g+b < max_sum`.
    pub min_sum: u16,
    pub max_sum: u16,
    pub min_saturation: Option<f32>,
    pub relaxed_saturation: Option<f32>,
    pub strict_min_pixels: usize,
    pub relaxed_min_pixels: usize,
    pub clusters: usize,
}

impl ExtractorConfig {
    /// Whole image, brightness band only, single cluster.
    pub fn v1() -> Self {
        Self {
            crop: None,
            resize: Some(150),
            min_sum: 50,
            max_sum: 700,
            min_saturation: None,
            relaxed_saturation: None,
            strict_min_pixels: 0,
            relaxed_min_pixels: 0,
            clusters: 1,
        }
    }

    /// Bottle-centre crop with saturation filtering, two clusters.
    pub fn v2() -> Self {
        Self {
            crop: Some(CropBox {
                left: 0.25,
                top: 0.25,
                right: 0.75,
                bottom: 0.85,
            }),
            resize: Some(100),
            min_sum: 80,
            max_sum: 680,
            min_saturation: Some(0.15),
            relaxed_saturation: Some(0.08),
            strict_min_pixels: 50,
            relaxed_min_pixels: 20,
            clusters: 2,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::v2()
    }
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| Error::image(path, e))?;
    Ok(img.to_rgb8())
}

fn prepare(img: &RgbImage, crop: Option<CropBox>, resize: Option<u32>) -> Vec<Rgb> {
    let cropped = match crop {
        Some(c) => c.apply(img),
        None => img.clone(),
    };
    let sampled = match resize {
        Some(side) => image::imageops::resize(&cropped, side, side, FilterType::CatmullRom),
        None => cropped,
    };
    sampled.pixels().map(|p| p.0).collect()
}

/// Pixels left after the brightness/saturation cascade.
pub fn filter_pixels(pixels: &[Rgb], cfg: &ExtractorConfig) -> Vec<Rgb> {
    let in_band = |p: &Rgb| {
        let sum = channel_sum(*p);
        sum > cfg.min_sum && sum < cfg.max_sum
    };
    let saturated = |p: &Rgb, floor: Option<f32>| floor.is_none_or(|f| saturation(*p) > f);

    let mut kept: Vec<Rgb> = pixels
        .iter()
        .copied()
        .filter(|p| in_band(p) && saturated(p, cfg.min_saturation))
        .collect();
    if kept.len() < cfg.strict_min_pixels {
        kept = pixels
            .iter()
            .copied()
            .filter(|p| in_band(p) && saturated(p, cfg.relaxed_saturation))
            .collect();
    }
    if kept.len() < cfg.relaxed_min_pixels {
        kept = pixels.iter().copied().filter(|p| in_band(p)).collect();
    }
    if kept.is_empty() {
        kept = pixels.to_vec();
    }
    kept
}

/// Centroid of the largest cluster, channels truncated toward zero.
pub fn dominant_of(pixels: &[Rgb], clusters: usize) -> Option<Rgb> {
    let clusters = kmeans(pixels, clusters.max(1), 50);
    let (centroid, _) = clusters.into_iter().max_by_key(|(_, n)| *n)?;
    Some(centroid.map(|c| c.clamp(0.0, 255.0) as u8))
}

/// Extracts the most representative colour of a bottle photograph.
pub fn extract_dominant_color(path: impl AsRef<Path>, cfg: &ExtractorConfig) -> Result<Rgb> {
    let path = path.as_ref();
    let img = load_rgb(path)?;
    let pixels = prepare(&img, cfg.crop, cfg.resize);
    let filtered = filter_pixels(&pixels, cfg);
    tracing::debug!(
        "{}: {} of {} pixels kept",
        path.display(),
        filtered.len(),
        pixels.len()
    );
    dominant_of(&filtered, cfg.clusters)
        .ok_or_else(|| Error::Invalid(format!("no pixels in {}", path.display())))
}

/// Like [`extract_dominant_color`], logging and swallowing failures.
pub fn dominant_color(path: impl AsRef<Path>, cfg: &ExtractorConfig) -> Option<Rgb> {
    let path = path.as_ref();
    match extract_dominant_color(path, cfg) {
        Ok(rgb) => Some(rgb),
        Err(e) => {
            tracing::warn!("colour extraction failed for {}: {e}", path.display());
            None
        }
    }
}

fn dist2(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn as_f64(p: Rgb) -> [f64; 3] {
    p.map(f64::from)
}

/// Lloyd's k-means with farthest-point seeding. Returns `(centroid, size)`
/// for each non-empty cluster.
fn kmeans(pixels: &[Rgb], k: usize, max_iter: usize) -> Vec<([f64; 3], usize)> {
    if pixels.is_empty() {
        return Vec::new();
    }
    let points: Vec<[f64; 3]> = pixels.iter().copied().map(as_f64).collect();
    let n = points.len() as f64;
    let mean = points.iter().fold([0.0; 3], |acc, p| {
        [acc[0] + p[0] / n, acc[1] + p[1] / n, acc[2] + p[2] / n]
    });

    let mut centroids = vec![mean];
    while centroids.len() < k.min(points.len()) {
        let far = points
            .iter()
            .copied()
            .max_by(|a, b| {
                let da = centroids.iter().map(|c| dist2(*a, *c)).fold(f64::MAX, f64::min);
                let db = centroids.iter().map(|c| dist2(*b, *c)).fold(f64::MAX, f64::min);
                da.total_cmp(&db)
            })
            .unwrap_or(mean);
        if centroids.iter().any(|c| dist2(*c, far) == 0.0) {
            break;
        }
        centroids.push(far);
    }

    let mut assignment = vec![usize::MAX; points.len()];
    for _ in 0..max_iter {
        let mut changed = false;
        for (slot, p) in assignment.iter_mut().zip(points.iter()) {
            let nearest = centroids
                .iter()
                .enumerate()
                .min_by(|a, b| dist2(*p, *a.1).total_cmp(&dist2(*p, *b.1)))
                .map(|(i, _)| i)
                .unwrap_or(0);
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }
        let mut sums = vec![[0.0f64; 3]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (&a, p) in assignment.iter().zip(points.iter()) {
            counts[a] += 1;
            for c in 0..3 {
                sums[a][c] += p[c];
            }
        }
        for (i, centroid) in centroids.iter_mut().enumerate() {
            if counts[i] > 0 {
                let m = counts[i] as f64;
                *centroid = [sums[i][0] / m, sums[i][1] / m, sums[i][2] / m];
            }
        }
        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; centroids.len()];
    for &a in &assignment {
        counts[a] += 1;
    }
    centroids
        .into_iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .collect()
}

/// Colour entry written by [`extract_all_swatches`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwatchColor {
    pub hex: String,
    pub rgb: Rgb,
}

const SWATCH_CROP: CropBox = CropBox {
    left: 0.3,
    top: 0.3,
    right: 0.7,
    bottom: 0.7,
};

/// Most vibrant of the frequent colours in the centre of a swatch image.
pub fn swatch_color_of(img: &RgbImage) -> Rgb {
    let pixels = prepare(img, Some(SWATCH_CROP), Some(50));
    let mut filtered: Vec<Rgb> = pixels
        .iter()
        .copied()
        .filter(|&[r, g, b]| {
            if r > 240 && g > 240 && b > 240 {
                return false;
            }
            if r < 15 && g < 15 && b < 15 {
                return false;
            }
            let max = r.max(g).max(b);
            !(max > 200 && saturation([r, g, b]) < 0.1)
        })
        .collect();
    if filtered.is_empty() {
        filtered = pixels;
    }

    // (count, first index) keeps ties in first-seen order
    let mut counts: HashMap<Rgb, (usize, usize)> = HashMap::new();
    for (i, p) in filtered.iter().enumerate() {
        counts.entry(*p).or_insert((0, i)).0 += 1;
    }
    let mut ranked: Vec<(Rgb, usize, usize)> =
        counts.into_iter().map(|(c, (n, i))| (c, n, i)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let total = filtered.len() as f32;
    let mut best: Option<(Rgb, f32)> = None;
    for (color, count, _) in ranked.iter().take(20) {
        let score = saturation(*color) * 0.7 + (*count as f32 / total) * 0.3;
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((*color, score));
        }
    }
    best.map_or([128, 128, 128], |(c, _)| c)
}

pub fn extract_swatch_color(path: impl AsRef<Path>) -> Result<Rgb> {
    let path = path.as_ref();
    Ok(swatch_color_of(&load_rgb(path)?))
}

fn first_image_in(folder: &Path) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    let with_ext = |wanted: &[&str]| {
        files
            .iter()
            .find(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| wanted.contains(&e.to_ascii_lowercase().as_str()))
            })
            .cloned()
    };
    with_ext(&["png"]).or_else(|| with_ext(&["jpg", "jpeg"]))
}

/// Swatch colour for each shade folder directly under `shades_dir`.
///
/// Folders without an image or whose image fails to decode are skipped.
pub fn extract_all_swatches(shades_dir: impl AsRef<Path>) -> Result<BTreeMap<String, SwatchColor>> {
    let root = shades_dir.as_ref();
    if !root.is_dir() {
        return Err(Error::NotFound(root.to_path_buf()));
    }
    let mut folders: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    folders.sort();

    let total = folders.len();
    let mut out = BTreeMap::new();
    for (idx, folder) in folders.iter().enumerate() {
        let shade = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(image) = first_image_in(folder) else {
            tracing::warn!("[{}/{}] {}: no images found", idx + 1, total, shade);
            continue;
        };
        match extract_swatch_color(&image) {
            Ok(rgb) => {
                tracing::info!("[{}/{}] {}: {}", idx + 1, total, shade, to_hex(rgb));
                out.insert(
                    shade,
                    SwatchColor {
                        hex: to_hex(rgb),
                        rgb,
                    },
                );
            }
            Err(e) => tracing::warn!("[{}/{}] {}: {e}", idx + 1, total, shade),
        }
    }
    Ok(out)
}
