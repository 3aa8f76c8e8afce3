//! Replacing white backgrounds with the store grey.

use crate::color::{Rgb, STORE_GREY, all_at_least, color_distance, within_tolerance};
use crate::error::{Error, Result};
use crate::transform::{BatchReport, open_image, png_path, save_image, save_png, scan_images};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Replaces every pixel whose R, G and B are all `>= threshold` with `grey`,
/// keeping alpha. Returns the number of replaced pixels.
pub fn replace_white(img: &mut RgbaImage, threshold: u8, grey: Rgb) -> u64 {
    let mut replaced = 0;
    for px in img.pixels_mut() {
        let [r, g, b, a] = px.0;
        if all_at_least([r, g, b], threshold) {
            *px = Rgba([grey[0], grey[1], grey[2], a]);
            replaced += 1;
        }
    }
    replaced
}

/// Threshold replacement for a file, always written as PNG.
pub fn replace_white_file(input: &Path, output: &Path, threshold: u8, grey: Rgb) -> Result<u64> {
    let mut img = open_image(input)?.to_rgba8();
    let total = u64::from(img.width()) * u64::from(img.height());
    let replaced = replace_white(&mut img, threshold, grey);
    let out = png_path(output);
    save_png(&DynamicImage::ImageRgba8(img), &out)?;
    tracing::info!(
        "{} -> {} ({:.1}% pixels replaced)",
        input.display(),
        out.display(),
        replaced as f64 * 100.0 / total.max(1) as f64
    );
    Ok(replaced)
}

/// Runs [`replace_white_file`] over every image below `input_dir`.
///
/// Outputs mirror the relative layout under `output_dir` as PNG; pass the
/// same directory for both to overwrite in place.
pub fn replace_white_dir(
    input_dir: &Path,
    output_dir: &Path,
    threshold: u8,
    grey: Rgb,
) -> Result<BatchReport> {
    if !input_dir.is_dir() {
        return Err(Error::NotFound(input_dir.to_path_buf()));
    }
    let mut report = BatchReport::default();
    for path in scan_images(input_dir, true)? {
        let Ok(relative) = path.strip_prefix(input_dir) else {
            continue;
        };
        match replace_white_file(&path, &output_dir.join(relative), threshold, grey) {
            Ok(_) => report.succeeded += 1,
            Err(e) => {
                tracing::warn!("{e}");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Parameters for [`flood_replace_white`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodOptions {
    /// Border pixels at or above this in every channel seed a fill.
    pub white_threshold: u8,
    /// Largest summed channel distance from the seed colour the fill may cross.
    pub flood_tolerance: u16,
    /// Per-channel distance within which a pixel already counts as grey.
    pub grey_tolerance: u8,
    pub grey: Rgb,
}

impl Default for FloodOptions {
    fn default() -> Self {
        Self {
            white_threshold: 250,
            flood_tolerance: 25,
            grey_tolerance: 6,
            grey: STORE_GREY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FloodOutcome {
    Processed(u64),
    AlreadyGrey,
    NoWhiteBorder,
}

fn rgb_at(img: &RgbaImage, x: u32, y: u32) -> Rgb {
    let [r, g, b, _] = img.get_pixel(x, y).0;
    [r, g, b]
}

/// First pixel of every contiguous near-white run along the four edges.
pub fn border_seeds(img: &RgbaImage, opts: &FloodOptions) -> Vec<(u32, u32)> {
    let (w, h) = img.dimensions();
    let qualifies = |x: u32, y: u32| {
        let rgb = rgb_at(img, x, y);
        all_at_least(rgb, opts.white_threshold)
            && !within_tolerance(rgb, opts.grey, opts.grey_tolerance)
    };
    let edges: [Vec<(u32, u32)>; 4] = [
        (0..w).map(|x| (x, 0)).collect(),
        (0..w).map(|x| (x, h - 1)).collect(),
        (0..h).map(|y| (0, y)).collect(),
        (0..h).map(|y| (w - 1, y)).collect(),
    ];

    let mut seeds = Vec::new();
    for edge in edges {
        let mut prev = false;
        for (x, y) in edge {
            let cur = qualifies(x, y);
            if cur && !prev && !seeds.contains(&(x, y)) {
                seeds.push((x, y));
            }
            prev = cur;
        }
    }
    seeds
}

/// Replaces only edge-connected white background, leaving interior
/// highlights alone.
///
/// Each seed fills the 4-connected region whose summed channel distance to
/// the seed colour is within `flood_tolerance`. A seed already that close to
/// `grey` is left alone.
pub fn flood_replace_white(img: &mut RgbaImage, opts: &FloodOptions) -> FloodOutcome {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return FloodOutcome::NoWhiteBorder;
    }
    let seeds = border_seeds(img, opts);
    if seeds.is_empty() {
        let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
        let grey = corners
            .iter()
            .all(|&(x, y)| within_tolerance(rgb_at(img, x, y), opts.grey, opts.grey_tolerance));
        return if grey {
            FloodOutcome::AlreadyGrey
        } else {
            FloodOutcome::NoWhiteBorder
        };
    }

    // stamped with the fill generation, so one buffer serves every seed
    let mut visited = vec![0u32; (w as usize) * (h as usize)];
    let mut filled = 0;
    for (generation, (sx, sy)) in (1u32..).zip(seeds) {
        let seed = rgb_at(img, sx, sy);
        if color_distance(seed, opts.grey) <= opts.flood_tolerance {
            continue;
        }
        filled += fill_from(img, (sx, sy), seed, opts, &mut visited, generation);
    }
    FloodOutcome::Processed(filled)
}

fn fill_from(
    img: &mut RgbaImage,
    start: (u32, u32),
    seed: Rgb,
    opts: &FloodOptions,
    visited: &mut [u32],
    generation: u32,
) -> u64 {
    let (w, h) = img.dimensions();
    let mut queue = VecDeque::from([start]);
    visited[(start.1 * w + start.0) as usize] = generation;
    let mut filled = 0;

    while let Some((x, y)) = queue.pop_front() {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        if color_distance([r, g, b], seed) > opts.flood_tolerance {
            continue;
        }
        let grey = opts.grey;
        img.put_pixel(x, y, Rgba([grey[0], grey[1], grey[2], a]));
        filled += 1;

        let neighbours = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbours {
            if nx >= w || ny >= h {
                continue;
            }
            let idx = (ny * w + nx) as usize;
            if visited[idx] != generation {
                visited[idx] = generation;
                queue.push_back((nx, ny));
            }
        }
    }
    filled
}

/// Applies [`flood_replace_white`] to a file in place unless `dry_run`.
pub fn flood_replace_file(path: &Path, opts: &FloodOptions, dry_run: bool) -> Result<FloodOutcome> {
    let mut img = open_image(path)?.to_rgba8();
    if dry_run {
        let seeds = border_seeds(&img, opts);
        if !seeds.is_empty() {
            return Ok(FloodOutcome::Processed(0));
        }
    }
    let outcome = flood_replace_white(&mut img, opts);
    if let FloodOutcome::Processed(_) = outcome
        && !dry_run
    {
        save_image(&DynamicImage::ImageRgba8(img), path)?;
    }
    Ok(outcome)
}

fn name_matches(path: &Path, names: &[String]) -> bool {
    if names.is_empty() {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| names.iter().any(|want| want.eq_ignore_ascii_case(n)))
}

/// Runs [`flood_replace_file`] over every image below `root` whose file
/// name is one of `names` (all images when `names` is empty).
pub fn flood_replace_dir(
    root: &Path,
    names: &[String],
    opts: &FloodOptions,
    dry_run: bool,
) -> Result<(Vec<(PathBuf, FloodOutcome)>, BatchReport)> {
    let targets: Vec<PathBuf> = scan_images(root, true)?
        .into_iter()
        .filter(|p| name_matches(p, names))
        .collect();
    tracing::info!("{} flood targets under {}", targets.len(), root.display());

    let mut outcomes = Vec::new();
    let mut report = BatchReport::default();
    for path in targets {
        match flood_replace_file(&path, opts, dry_run) {
            Ok(outcome) => {
                match outcome {
                    FloodOutcome::Processed(_) => report.succeeded += 1,
                    _ => report.skipped += 1,
                }
                outcomes.push((path, outcome));
            }
            Err(e) => {
                tracing::warn!("{e}");
                report.failed += 1;
            }
        }
    }
    Ok((outcomes, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rgba(w: u32, h: u32, c: Rgb) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([c[0], c[1], c[2], 255]))
    }

    #[test]
    fn threshold_replace_turns_near_white_grey() {
        let mut img = rgba(100, 100, [250, 250, 250]);
        let replaced = replace_white(&mut img, 240, STORE_GREY);
        assert_eq!(replaced, 10_000);
        assert!(img.pixels().all(|p| p.0 == [245, 245, 245, 255]));
    }

    #[test]
    fn threshold_replace_is_idempotent() {
        let mut img = rgba(20, 20, [250, 250, 250]);
        img.put_pixel(3, 3, Rgba([200, 10, 10, 255]));
        img.put_pixel(4, 4, Rgba([255, 255, 255, 0]));
        replace_white(&mut img, 240, STORE_GREY);
        let once = img.clone();
        replace_white(&mut img, 240, STORE_GREY);
        assert_eq!(img, once);
        assert_eq!(img.get_pixel(3, 3).0, [200, 10, 10, 255]);
        // alpha survives
        assert_eq!(img.get_pixel(4, 4).0, [245, 245, 245, 0]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut img = rgba(2, 1, [240, 240, 240]);
        img.put_pixel(1, 0, Rgba([239, 255, 255, 255]));
        assert_eq!(replace_white(&mut img, 240, STORE_GREY), 1);
    }

    #[test]
    fn flood_leaves_interior_highlights() {
        let mut img = rgba(30, 30, [255, 255, 255]);
        // red square with a white highlight inside
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
        }
        img.put_pixel(15, 15, Rgba([255, 255, 255, 255]));

        let outcome = flood_replace_white(&mut img, &FloodOptions::default());
        assert_eq!(outcome, FloodOutcome::Processed(900 - 100));
        assert_eq!(img.get_pixel(0, 0).0, [245, 245, 245, 255]);
        assert_eq!(img.get_pixel(15, 15).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(12, 12).0, [200, 0, 0, 255]);

        assert_eq!(
            flood_replace_white(&mut img, &FloodOptions::default()),
            FloodOutcome::AlreadyGrey
        );
    }

    #[test]
    fn flood_reports_missing_white_border() {
        let mut img = rgba(10, 10, [20, 20, 20]);
        assert_eq!(
            flood_replace_white(&mut img, &FloodOptions::default()),
            FloodOutcome::NoWhiteBorder
        );
    }

    #[test]
    fn seeds_mark_run_starts_only() {
        let mut img = rgba(6, 3, [10, 10, 10]);
        for x in [1, 2, 4] {
            img.put_pixel(x, 0, Rgba([255, 255, 255, 255]));
        }
        let seeds = border_seeds(&img, &FloodOptions::default());
        assert_eq!(seeds, vec![(1, 0), (4, 0)]);
    }

    #[test]
    fn flood_stops_at_off_white_islands() {
        let mut img = rgba(5, 5, [255, 255, 255]);
        img.put_pixel(2, 2, Rgba([231, 231, 231, 255]));
        let outcome = flood_replace_white(&mut img, &FloodOptions::default());
        assert_eq!(outcome, FloodOutcome::Processed(24));
        assert_eq!(img.get_pixel(2, 2).0, [231, 231, 231, 255]);
        assert_eq!(img.get_pixel(2, 1).0, [245, 245, 245, 255]);
    }

    #[test]
    fn flood_skips_seeds_already_near_grey() {
        let mut img = rgba(4, 4, [252, 252, 252]);
        let before = img.clone();
        let outcome = flood_replace_white(&mut img, &FloodOptions::default());
        assert_eq!(outcome, FloodOutcome::Processed(0));
        assert_eq!(img, before);
    }

    #[test]
    fn later_seeds_reach_pixels_an_earlier_fill_rejected() {
        let opts = FloodOptions {
            white_threshold: 250,
            flood_tolerance: 5,
            grey_tolerance: 0,
            grey: [10, 10, 10],
        };
        let mut img = rgba(3, 1, [250, 250, 250]);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        assert_eq!(border_seeds(&img, &opts), vec![(0, 0), (2, 0)]);

        let outcome = flood_replace_white(&mut img, &opts);
        assert_eq!(outcome, FloodOutcome::Processed(3));
        assert!(img.pixels().all(|p| p.0 == [10, 10, 10, 255]));
    }

    fn write_png(path: &Path, c: Rgb) -> Result<()> {
        std::fs::create_dir_all(path.parent().unwrap()).map_err(|e| Error::io(path, e))?;
        rgba(6, 6, c).save(path).map_err(|e| Error::image(path, e))
    }

    #[test]
    fn flood_dir_recurses_and_filters_names() -> Result<()> {
        let root = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let rose = root.path().join("100 Rose");
        let red = root.path().join("nested/200 Red");
        write_png(&rose.join("01.png"), [255, 255, 255])?;
        write_png(&rose.join("02.png"), [255, 255, 255])?;
        write_png(&red.join("03.png"), [255, 255, 255])?;

        let names = vec!["02.png".to_string(), "03.png".to_string()];
        let (outcomes, report) = flood_replace_dir(root.path(), &names, &FloodOptions::default(), false)?;
        assert_eq!(report.succeeded, 2);
        let touched: Vec<PathBuf> = outcomes.into_iter().map(|(p, _)| p).collect();
        assert_eq!(touched, vec![rose.join("02.png"), red.join("03.png")]);

        let primary = open_image(&rose.join("01.png"))?.to_rgb8();
        assert_eq!(primary.get_pixel(0, 0).0, [255, 255, 255]);
        let secondary = open_image(&red.join("03.png"))?.to_rgb8();
        assert_eq!(secondary.get_pixel(0, 0).0, STORE_GREY);
        Ok(())
    }

    #[test]
    fn flood_dir_without_names_takes_every_image() -> Result<()> {
        let root = tempdir().map_err(|e| Error::io("tempdir", e))?;
        write_png(&root.path().join("a/01.png"), [255, 255, 255])?;
        write_png(&root.path().join("b/02.png"), [20, 20, 20])?;

        let (outcomes, report) = flood_replace_dir(root.path(), &[], &FloodOptions::default(), true)?;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);
        Ok(())
    }

    #[test]
    fn dir_batch_mirrors_layout_and_counts_failures() -> Result<()> {
        let input = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let output = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let nested = input.path().join("cream-colors");
        std::fs::create_dir_all(&nested).map_err(|e| Error::io(&nested, e))?;
        let good = nested.join("01.jpg");
        DynamicImage::ImageRgba8(rgba(8, 8, [255, 255, 255]))
            .to_rgb8()
            .save(&good)
            .map_err(|e| Error::image(&good, e))?;
        std::fs::write(input.path().join("broken.png"), b"nope")
            .map_err(|e| Error::io("broken.png", e))?;
        std::fs::write(input.path().join("notes.txt"), b"skip")
            .map_err(|e| Error::io("notes.txt", e))?;

        let report = replace_white_dir(input.path(), output.path(), 240, STORE_GREY)?;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let out = output.path().join("cream-colors/01.png");
        let img = open_image(&out)?.to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, STORE_GREY);
        Ok(())
    }
}
