//! Catalog tooling for a nail-polish storefront: product photo transforms,
//! dominant-colour extraction, shade classification, scraping and
//! reconciliation.

pub mod catalog;
pub mod category;
pub mod classify;
pub mod color;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod official;
pub mod reconcile;
pub mod scrape;
pub mod transform;

pub use category::ColorCategory;
pub use classify::{ColorNamer, HeuristicVersion, HsvHeuristic, RgbHeuristic};
pub use color::{Rgb, STORE_GREY};
pub use config::Config;
pub use error::{Error, Result};
pub use extract::{ExtractorConfig, SwatchColor, extract_all_swatches, extract_dominant_color};
pub use model::{ColorMapping, Product, Shade, ShadeDetail, read_json, write_json};
pub use transform::BatchReport;
