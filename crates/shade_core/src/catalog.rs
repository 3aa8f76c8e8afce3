//! Product store and per-product shade classification.

use crate::classify::ColorNamer;
use crate::color::to_hsv;
use crate::error::{Error, Result};
use crate::extract::{ExtractorConfig, dominant_color};
use crate::model::{ColorMapping, Product, ShadeDetail, read_json, write_json};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Lowercases, drops punctuation and joins words with `-`.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let cleaned = NON_SLUG.replace_all(&lowered, "");
    SEPARATORS.replace_all(&cleaned, "-").into_owned()
}

/// Picks the image for `shade_name` in `dir`.
///
/// A file whose name contains the shade name with `+` for spaces wins;
/// otherwise the last word of the shade name is tried. Ties resolve to the
/// first file name in sorted order.
pub fn find_shade_image(dir: &Path, shade_name: &str) -> Result<Option<PathBuf>> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    files.sort();

    let plus_name = shade_name.replace(' ', "+");
    let last_word = shade_name.split_whitespace().last();
    let needles = std::iter::once(plus_name.as_str()).chain(last_word);
    for needle in needles {
        if needle.is_empty() {
            continue;
        }
        if let Some((_, path)) = files.iter().find(|(name, _)| name.contains(needle)) {
            return Ok(Some(path.clone()));
        }
    }
    Ok(None)
}

/// Counters from [`classify_product_shades`] besides the mapping itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ClassifyStats {
    pub missing_images: usize,
    pub failed: usize,
}

/// Extracts and names the colour of every shade of `product`.
pub fn classify_product_shades(
    product: &Product,
    images_dir: &Path,
    extractor: &ExtractorConfig,
    namer: &dyn ColorNamer,
    version: u32,
) -> Result<(ColorMapping, ClassifyStats)> {
    if !images_dir.is_dir() {
        return Err(Error::NotFound(images_dir.to_path_buf()));
    }
    let mut mapping = ColorMapping::new(product.slug.clone());
    mapping.version = Some(version);
    mapping.algorithm = Some(namer.algorithm().to_string());
    mapping.total_shades = product.shades.len();

    let mut stats = ClassifyStats::default();
    for (i, shade) in product.shades.iter().enumerate() {
        let Some(image) = find_shade_image(images_dir, &shade.name)? else {
            tracing::warn!("{:2}. {} -> image not found", i + 1, shade.name);
            stats.missing_images += 1;
            continue;
        };
        let Some(rgb) = dominant_color(&image, extractor) else {
            stats.failed += 1;
            continue;
        };
        let color = namer.name(rgb);
        let hsv = to_hsv(rgb).display_triple();
        tracing::info!(
            "{:2}. {:30} -> {:12} RGB({:3},{:3},{:3}) HSV({:3},{:2}%,{:2}%)",
            i + 1,
            shade.name,
            color.as_str(),
            rgb[0],
            rgb[1],
            rgb[2],
            hsv[0],
            hsv[1],
            hsv[2]
        );
        mapping.push(ShadeDetail {
            name: shade.name.clone(),
            color,
            image: image.to_string_lossy().into_owned(),
            rgb: Some(rgb),
            hsv: Some(hsv),
        });
    }
    mapping.classified_shades = Some(mapping.classified());
    Ok((mapping, stats))
}

/// A JSON array of products on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductStore {
    pub products: Vec<Product>,
}

impl ProductStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            products: read_json(path)?,
        })
    }

    /// Like [`ProductStore::load`], but a missing file is an empty store.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path, &self.products)
    }

    pub fn find(&self, slug: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.slug == slug)
    }

    /// Removes any product with the same slug and appends `product`.
    /// Returns true when an existing entry was replaced.
    pub fn upsert_by_slug(&mut self, product: Product) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.slug != product.slug);
        let replaced = self.products.len() != before;
        self.products.push(product);
        replaced
    }

    /// Keeps the first product for each slug. Returns how many were dropped.
    pub fn dedupe_by_slug(&mut self) -> usize {
        let before = self.products.len();
        let mut seen = HashSet::new();
        self.products.retain(|p| seen.insert(p.slug.clone()));
        before - self.products.len()
    }
}
