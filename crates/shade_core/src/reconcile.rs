//! Cross-checking a reference product list against scraped products.

use crate::error::{Error, Result};
use crate::model::Product;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Upper-cased with everything but ASCII letters and digits removed.
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Human-ish name recovered from a slug: prefix removed, hyphens as spaces.
pub fn name_from_slug(slug: &str, prefix: &str) -> String {
    slug.replacen(prefix, "", 1).replace('-', " ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub reference_name: String,
    pub slug: String,
    pub extracted_name: String,
    pub images_count: usize,
    pub has_image_folder: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Scraped products considered (those carrying the slug prefix).
    pub scraped: usize,
    pub reference: usize,
    pub matched: Vec<Match>,
    pub unmatched: Vec<String>,
    pub without_images: Vec<String>,
    pub without_titles: Vec<String>,
}

impl ReconcileReport {
    pub fn all_matched(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Matches each reference name to the first scraped product whose slug
/// name contains it, is contained by it, or equals it after normalisation.
///
/// Only products whose slug starts with `prefix` take part. When
/// `images_dir` is given, a folder named after the slug counts as images.
pub fn reconcile(
    reference: &[String],
    products: &[Product],
    prefix: &str,
    images_dir: Option<&Path>,
) -> ReconcileReport {
    let candidates: Vec<&Product> = products.iter().filter(|p| p.slug.starts_with(prefix)).collect();
    let folders: HashSet<String> = images_dir
        .and_then(|dir| fs::read_dir(dir).ok())
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();

    let mut report = ReconcileReport {
        scraped: candidates.len(),
        reference: reference.len(),
        ..Default::default()
    };
    for p in &candidates {
        if p.images.is_empty() && !folders.contains(&p.slug) {
            report.without_images.push(p.slug.clone());
        }
        if p.title.trim().is_empty() {
            report.without_titles.push(p.slug.clone());
        }
    }

    for name in reference {
        let wanted = normalize_name(name);
        let hit = candidates.iter().find_map(|p| {
            let extracted = name_from_slug(&p.slug, prefix);
            let have = normalize_name(&extracted);
            let matches = have.contains(&wanted) || wanted.contains(&have) || have == wanted;
            matches.then(|| (p, extracted))
        });
        match hit {
            Some((p, extracted)) => report.matched.push(Match {
                reference_name: name.clone(),
                slug: p.slug.clone(),
                extracted_name: extracted,
                images_count: p.images.len(),
                has_image_folder: folders.contains(&p.slug),
            }),
            None => report.unmatched.push(name.clone()),
        }
    }
    tracing::info!(
        "matched {}/{} reference products",
        report.matched.len(),
        report.reference
    );
    report
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceEntry {
    Name(String),
    Product { title: String },
}

/// Reads reference names from a JSON array (strings or objects with a
/// `title`), or from plain text with one name per line.
pub fn load_reference_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if raw.trim_start().starts_with('[') {
        let entries: Vec<ReferenceEntry> =
            serde_json::from_str(&raw).map_err(|e| Error::json(path, e))?;
        return Ok(entries
            .into_iter()
            .map(|e| match e {
                ReferenceEntry::Name(n) => n,
                ReferenceEntry::Product { title } => title,
            })
            .filter(|n| !n.trim().is_empty())
            .collect());
    }
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("MAVA-FLEX", "MAVAFLEX")]
    #[case("Cream Color's", "CREAMCOLORS")]
    #[case("Mavala 002 Protective", "MAVALA002PROTECTIVE")]
    #[case("Crème", "CRME")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    fn scraped(slug: &str, title: &str, images: usize) -> Product {
        Product {
            slug: slug.to_string(),
            title: title.to_string(),
            images: (0..images).map(|i| format!("https://cdn/{i}.jpg")).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn matches_by_containment() {
        let products = vec![
            scraped("all-products_mava-flex-serum", "Mava-Flex", 2),
            scraped("all-products_nail-shield", "", 0),
            scraped("other_cuticle-oil", "Cuticle Oil", 1),
        ];
        let reference: Vec<String> = ["MAVA-FLEX", "NAIL SHIELD", "CUTICLE OIL"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = reconcile(&reference, &products, "all-products_", None);

        assert_eq!(report.scraped, 2);
        assert_eq!(report.matched.len(), 2);
        assert_eq!(report.matched[0].slug, "all-products_mava-flex-serum");
        assert_eq!(report.matched[0].extracted_name, "mava flex serum");
        assert_eq!(report.matched[0].images_count, 2);
        assert_eq!(report.unmatched, vec!["CUTICLE OIL"]);
        assert_eq!(report.without_images, vec!["all-products_nail-shield"]);
        assert_eq!(report.without_titles, vec!["all-products_nail-shield"]);
        assert!(!report.all_matched());
    }

    #[test]
    fn image_folder_counts_as_images() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let folder = dir.path().join("all-products_nail-shield");
        fs::create_dir_all(&folder).map_err(|e| Error::io(&folder, e))?;
        let products = vec![scraped("all-products_nail-shield", "Nail Shield", 0)];
        let report = reconcile(&["Nail Shield".to_string()], &products, "all-products_", Some(dir.path()));
        assert!(report.without_images.is_empty());
        assert!(report.matched[0].has_image_folder);
        Ok(())
    }

    #[test]
    fn reference_lists_from_json_and_text() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tempdir", e))?;
        let names = dir.path().join("names.json");
        fs::write(&names, r#"["NAILACTAN", "MAVADERMA"]"#).map_err(|e| Error::io(&names, e))?;
        assert_eq!(load_reference_names(&names)?, vec!["NAILACTAN", "MAVADERMA"]);

        let products = dir.path().join("products.json");
        fs::write(&products, r#"[{"title": "Hand Cream", "slug": "hand-cream"}, {"title": ""}]"#)
            .map_err(|e| Error::io(&products, e))?;
        assert_eq!(load_reference_names(&products)?, vec!["Hand Cream"]);

        let text = dir.path().join("names.txt");
        fs::write(&text, "HAND CREAM\n\n  LIP BALM  \n").map_err(|e| Error::io(&text, e))?;
        assert_eq!(load_reference_names(&text)?, vec!["HAND CREAM", "LIP BALM"]);
        Ok(())
    }
}
