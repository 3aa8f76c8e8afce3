//! Catalog shade codes with an authoritative colour category.
//!
//! This is the trustworthy path; image heuristics only cover shades whose
//! code cannot be recovered.

use crate::category::ColorCategory;
use crate::error::Result;
use crate::model::{
    ColorMapping, Product, ShadeDetail, color_mapping_files, read_json, write_json,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const OFFICIAL_SOURCE: &str = "Official Color Categorization by Shade Number";

/// Shade names that are scraping artefacts rather than real shades.
pub const INVALID_SHADES: [&str; 2] = ["90927 VERNIS PROF.JPG", "MINI COLOR WITH REFLECTION"];

const OFFICIAL_TABLE: &[(ColorCategory, &[&str])] = &[
    (ColorCategory::Black, &["048", "163"]),
    (
        ColorCategory::Blue,
        &[
            "059", "115", "158", "167", "171", "181", "219", "238", "269", "287", "301", "343",
            "417", "447", "457", "466", "486", "946", "975",
        ],
    ),
    (
        ColorCategory::Brown,
        &[
            "032", "034", "081", "151", "310", "370", "403", "451", "971", "972", "991",
        ],
    ),
    (ColorCategory::Gold, &["970"]),
    (
        ColorCategory::Green,
        &["025", "123", "166", "183", "304", "414", "949", "982"],
    ),
    (
        ColorCategory::Grey,
        &[
            "012", "039", "217", "218", "229", "401", "402", "453", "463", "969", "973",
        ],
    ),
    (
        ColorCategory::Nude,
        &[
            "006", "090", "091", "132", "165", "186", "268", "311", "318", "366", "396", "406",
            "446", "448", "471", "474", "475", "476", "477", "478", "479", "480", "993",
        ],
    ),
    (
        ColorCategory::Orange,
        &[
            "020", "050", "088", "127", "182", "302", "345", "426", "445", "454", "458", "482",
        ],
    ),
    (
        ColorCategory::Pink,
        &[
            "009", "011", "013", "014", "016", "017", "019", "044", "052", "055", "056", "065",
            "071", "075", "076", "083", "084", "097", "098", "114", "157", "162", "164", "168",
            "169", "172", "180", "188", "189", "190", "215", "225", "244", "253", "283", "285",
            "288", "303", "312", "316", "317", "322", "323", "325", "328", "338", "367", "418",
            "425", "427", "429", "431", "444", "450", "455", "459", "464", "468", "469", "473",
            "481", "944",
        ],
    ),
    (
        ColorCategory::Purple,
        &[
            "024", "029", "030", "062", "152", "184", "237", "239", "245", "305", "315", "319",
            "321", "395", "415", "430", "435", "467",
        ],
    ),
    (
        ColorCategory::Red,
        &[
            "001", "002", "003", "007", "027", "033", "046", "053", "063", "064", "069", "072",
            "074", "078", "092", "156", "185", "187", "206", "240", "248", "266", "286", "292",
            "306", "326", "327", "339", "364", "372", "381", "449", "452", "462", "945",
        ],
    ),
    (ColorCategory::Silver, &["213", "947"]),
    (ColorCategory::Transparent, &["040", "041", "042", "043"]),
    (
        ColorCategory::White,
        &["004", "022", "047", "049", "324", "399", "461", "465"],
    ),
    (
        ColorCategory::Yellow,
        &["179", "416", "428", "472", "483", "985"],
    ),
];

static CODE_TO_CATEGORY: LazyLock<HashMap<&'static str, ColorCategory>> = LazyLock::new(|| {
    OFFICIAL_TABLE
        .iter()
        .flat_map(|(category, codes)| codes.iter().map(move |code| (*code, *category)))
        .collect()
});

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("static regex"));

/// Every code in the table, with its category.
pub fn official_codes() -> impl Iterator<Item = (&'static str, ColorCategory)> {
    OFFICIAL_TABLE
        .iter()
        .flat_map(|(category, codes)| codes.iter().map(move |code| (*code, *category)))
}

/// Leading shade number of a name, zero-padded to three digits.
///
/// `"49 WHITE"` yields `"049"`; names without leading digits yield `None`.
pub fn extract_shade_number(shade_name: &str) -> Option<String> {
    let caps = LEADING_DIGITS.captures(shade_name.trim())?;
    let digits = caps.get(1)?.as_str();
    let stripped = digits.trim_start_matches('0');
    let stripped = if stripped.is_empty() { "0" } else { stripped };
    Some(format!("{stripped:0>3}"))
}

/// Category for a three-digit code, `Special` when unknown.
pub fn category_for_code(code: &str) -> ColorCategory {
    let stripped = code.trim().trim_start_matches('0');
    let padded = format!("{stripped:0>3}");
    CODE_TO_CATEGORY
        .get(padded.as_str())
        .copied()
        .unwrap_or(ColorCategory::Special)
}

/// Category for a shade name such as `"363 LONG ISLAND"`.
pub fn official_category(shade_name: &str) -> ColorCategory {
    match extract_shade_number(shade_name) {
        Some(code) => category_for_code(&code),
        None => ColorCategory::Special,
    }
}

pub fn is_invalid_shade(shade_name: &str) -> bool {
    INVALID_SHADES.contains(&shade_name)
}

/// Result of [`apply_official_mapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct OfficialMapping {
    pub mapping: ColorMapping,
    pub skipped: Vec<String>,
}

impl OfficialMapping {
    pub fn special_count(&self) -> usize {
        self.mapping
            .color_groups
            .get(&ColorCategory::Special)
            .map_or(0, Vec::len)
    }
}

/// Classifies every shade of `product` through the official table.
pub fn apply_official_mapping(product: &Product) -> OfficialMapping {
    let mut mapping = ColorMapping::new(product.slug.clone());
    mapping.version = Some(2);
    mapping.source = Some(OFFICIAL_SOURCE.to_string());
    let mut skipped = Vec::new();

    for shade in &product.shades {
        if shade.name.is_empty() {
            continue;
        }
        if is_invalid_shade(&shade.name) {
            skipped.push(shade.name.clone());
            continue;
        }
        mapping.push(ShadeDetail {
            name: shade.name.clone(),
            color: official_category(&shade.name),
            image: shade.image.clone(),
            rgb: None,
            hsv: None,
        });
    }
    mapping.total_shades = mapping.shade_details.len();
    tracing::info!(
        "{}: {} shades classified, {} skipped",
        product.slug,
        mapping.total_shades,
        skipped.len()
    );
    OfficialMapping { mapping, skipped }
}

fn normalize_for_match(name: &str) -> String {
    name.replace('*', "").to_uppercase().trim().to_string()
}

/// Drops the `Special` group and its shade details. Returns the removed names.
pub fn strip_special(mapping: &mut ColorMapping) -> Vec<String> {
    let Some(removed) = mapping.color_groups.remove(&ColorCategory::Special) else {
        return Vec::new();
    };
    let doomed: HashSet<String> = removed.iter().map(|n| normalize_for_match(n)).collect();
    mapping
        .shade_details
        .retain(|d| !doomed.contains(&normalize_for_match(&d.name)));
    removed
}

/// Rewrites every `color_mapping_*.json` under `dir` without its `Special` group.
///
/// Returns the files that changed. Unreadable files are logged and skipped.
pub fn strip_special_in_dir(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut changed = Vec::new();
    for path in color_mapping_files(dir)? {
        let mut mapping: ColorMapping = match read_json(&path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        let removed = strip_special(&mut mapping);
        if removed.is_empty() {
            continue;
        }
        tracing::info!("{}: removed {} Special shades", path.display(), removed.len());
        write_json(&path, &mapping)?;
        changed.push(path);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Shade;
    use rstest::rstest;

    #[rstest]
    #[case("49 WHITE", Some("049"))]
    #[case("049 WHITE", Some("049"))]
    #[case("363 LONG ISLAND", Some("363"))]
    #[case("  7 ROUGE", Some("007"))]
    #[case("MINI COLOR", None)]
    fn shade_numbers(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_shade_number(name).as_deref(), expected);
    }

    #[test]
    fn every_known_code_is_stable() {
        for (code, category) in official_codes() {
            assert_eq!(category_for_code(code), category, "code {code}");
            assert_eq!(category_for_code(code), category_for_code(code));
            let unpadded = code.trim_start_matches('0');
            assert_eq!(category_for_code(unpadded), category, "code {unpadded}");
        }
    }

    #[test]
    fn codes_are_unique_across_categories() {
        let mut seen = HashSet::new();
        for (code, _) in official_codes() {
            assert!(seen.insert(code), "duplicate code {code}");
        }
    }

    #[rstest]
    #[case("49 WHITE", ColorCategory::White)]
    #[case("970 GOLD", ColorCategory::Gold)]
    #[case("1 ROUGE", ColorCategory::Red)]
    #[case("999 UNKNOWN", ColorCategory::Special)]
    #[case("000 NOTHING", ColorCategory::Special)]
    #[case("PEARL", ColorCategory::Special)]
    fn categories(#[case] name: &str, #[case] expected: ColorCategory) {
        assert_eq!(official_category(name), expected);
    }

    fn product(names: &[&str]) -> Product {
        Product {
            slug: "cream-colors".into(),
            shades: names
                .iter()
                .map(|n| Shade {
                    name: n.to_string(),
                    image: format!("https://cdn.example/{n}.png"),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn official_mapping_skips_invalid_and_buckets_unknown() {
        let result = apply_official_mapping(&product(&[
            "49 WHITE",
            "MINI COLOR WITH REFLECTION",
            "",
            "999 MYSTERY",
            "*PEARL*",
        ]));
        assert_eq!(result.skipped, vec!["MINI COLOR WITH REFLECTION"]);
        assert_eq!(result.mapping.total_shades, 3);
        assert_eq!(result.special_count(), 2);
        assert_eq!(result.mapping.version, Some(2));
        assert_eq!(
            result.mapping.color_groups[&ColorCategory::White],
            vec!["49 WHITE"]
        );
    }

    #[test]
    fn strip_special_removes_group_and_details() {
        let mut mapping = apply_official_mapping(&product(&["49 WHITE", "*pearl*", "999 X"])).mapping;
        // detail name differs only by asterisks and case
        mapping.shade_details[1].name = "PEARL".into();
        let removed = strip_special(&mut mapping);
        assert_eq!(removed.len(), 2);
        assert!(!mapping.color_groups.contains_key(&ColorCategory::Special));
        assert_eq!(mapping.shade_details.len(), 1);
        assert!(strip_special(&mut mapping).is_empty());
    }

    #[test]
    fn strip_special_in_dir_rewrites_only_changed_files() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| crate::Error::io("tempdir", e))?;
        let with_special = apply_official_mapping(&product(&["49 WHITE", "999 X"])).mapping;
        let without = apply_official_mapping(&product(&["49 WHITE"])).mapping;
        write_json(dir.path().join("color_mapping_a.json"), &with_special)?;
        write_json(dir.path().join("color_mapping_b.json"), &without)?;
        write_json(dir.path().join("other.json"), &with_special)?;

        let changed = strip_special_in_dir(dir.path())?;
        assert_eq!(changed, vec![dir.path().join("color_mapping_a.json")]);
        let reread: ColorMapping = read_json(dir.path().join("color_mapping_a.json"))?;
        assert_eq!(reread.shade_details.len(), 1);
        let untouched: ColorMapping = read_json(dir.path().join("other.json"))?;
        assert_eq!(untouched.shade_details.len(), 2);
        Ok(())
    }
}
