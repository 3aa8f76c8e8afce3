//! JSON documents exchanged between the tools.

use crate::category::ColorCategory;
use crate::color::Rgb;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A scraped product page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub url: String,
    pub slug: String,
    pub title: String,
    pub price: String,
    pub tagline: String,
    pub main_description: String,
    pub key_ingredients: String,
    pub how_to_use: String,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub local_images: Vec<String>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shades: Vec<Shade>,
    /// Fields written by other tools, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single colour variant of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shade {
    pub name: String,
    pub image: String,
}

/// One classified shade inside a [`ColorMapping`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadeDetail {
    pub name: String,
    pub color: ColorCategory,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsv: Option<[u16; 3]>,
}

/// Colour grouping report for one product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMapping {
    pub product_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    pub total_shades: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classified_shades: Option<usize>,
    pub color_groups: BTreeMap<ColorCategory, Vec<String>>,
    pub shade_details: Vec<ShadeDetail>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ColorMapping {
    pub fn new(product_slug: impl Into<String>) -> Self {
        Self {
            product_slug: product_slug.into(),
            ..Default::default()
        }
    }

    /// Appends a detail and files its name under the detail's category.
    pub fn push(&mut self, detail: ShadeDetail) {
        self.color_groups
            .entry(detail.color)
            .or_default()
            .push(detail.name.clone());
        self.shade_details.push(detail);
    }

    pub fn classified(&self) -> usize {
        self.color_groups.values().map(Vec::len).sum()
    }

    /// Groups ordered by descending size, ties in category order.
    pub fn groups_by_size(&self) -> Vec<(ColorCategory, &[String])> {
        let mut groups: Vec<_> = self
            .color_groups
            .iter()
            .map(|(c, names)| (*c, names.as_slice()))
            .collect();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));
        groups
    }
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| Error::json(path, e))
}

/// Pretty-prints `value` to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let body = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;
    fs::write(path, body).map_err(|e| Error::io(path, e))
}

/// `color_mapping_*.json` files directly inside `dir`, sorted by name.
pub fn color_mapping_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && name.starts_with("color_mapping_") && name.ends_with(".json") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
