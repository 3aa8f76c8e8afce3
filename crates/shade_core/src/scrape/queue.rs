//! The shade work queue shared between `prepare-queue` and `scrape-shades`.

use crate::category::ColorCategory;
use crate::error::{Error, Result};
use crate::model::ColorMapping;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use std::sync::LazyLock;

static NUMBERED_SHADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(.+)").expect("valid regex"));

pub const QUEUE_HEADERS: [&str; 4] = ["Main Color", "Shade Number", "Shade Name", "Product Slug"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadeQueueRow {
    #[serde(rename = "Main Color")]
    pub main_color: String,
    #[serde(rename = "Shade Number")]
    pub shade_number: String,
    #[serde(rename = "Shade Name")]
    pub shade_name: String,
    #[serde(rename = "Product Slug")]
    pub product_slug: String,
}

/// One row per numbered shade across `mappings`, excluding `Special`.
///
/// Duplicates by number and name keep the first occurrence; the result is
/// ordered by shade number.
pub fn build_shade_queue(mappings: &[ColorMapping]) -> Vec<ShadeQueueRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for mapping in mappings {
        for (category, shades) in &mapping.color_groups {
            if *category == ColorCategory::Special {
                continue;
            }
            for shade in shades {
                let Some(caps) = NUMBERED_SHADE.captures(shade) else {
                    tracing::debug!("unnumbered shade {shade:?} skipped");
                    continue;
                };
                let number = caps[1].to_string();
                let name = caps[2].trim().to_string();
                if !seen.insert((number.clone(), name.clone())) {
                    continue;
                }
                rows.push(ShadeQueueRow {
                    main_color: category.as_str().to_string(),
                    shade_number: number,
                    shade_name: name,
                    product_slug: mapping.product_slug.clone(),
                });
            }
        }
    }
    rows.sort_by(|a, b| {
        let key = |r: &ShadeQueueRow| r.shade_number.parse::<u64>().unwrap_or(u64::MAX);
        key(a)
            .cmp(&key(b))
            .then_with(|| a.shade_number.cmp(&b.shade_number))
            .then_with(|| a.shade_name.cmp(&b.shade_name))
    });
    rows
}

pub fn write_queue(path: impl AsRef<Path>, rows: &[ShadeQueueRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        wtr.write_record(QUEUE_HEADERS)?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Reads a queue CSV, failing if any required column is absent. Cells are
/// trimmed.
pub fn read_queue(path: impl AsRef<Path>) -> Result<Vec<ShadeQueueRow>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = rdr.headers()?.clone();
    let missing: Vec<&str> = QUEUE_HEADERS
        .iter()
        .copied()
        .filter(|h| !headers.iter().any(|c| c == *h))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Invalid(format!(
            "{} is missing columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }
    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}
