//! Storefront scraping over plain HTTP.

pub mod client;
pub mod page;
pub mod queue;
pub mod runner;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::{HttpClient, PageSource};
pub use page::{normalize_image_url, parse_product_page, parse_shade_images, shade_url};
pub use queue::{ShadeQueueRow, build_shade_queue, read_queue, write_queue};
pub use runner::{
    ScrapeSummary, ShadeScraper, download_product_images, save_scraped_product, scrape_product,
};

/// How a single shade page scrape went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ScrapeStatus {
    Success,
    NoImages,
    Error(String),
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::NoImages => f.write_str("no_images"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl From<ScrapeStatus> for String {
    fn from(status: ScrapeStatus) -> Self {
        status.to_string()
    }
}

impl From<String> for ScrapeStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "success" => Self::Success,
            "no_images" => Self::NoImages,
            other => Self::Error(other.strip_prefix("error: ").unwrap_or(other).to_string()),
        }
    }
}

/// One row of `product_details.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadeScrape {
    pub main_color: String,
    pub shade_number: String,
    pub shade_name: String,
    pub product_slug: String,
    pub url: String,
    pub image_urls: Vec<String>,
    /// RFC 3339 local time.
    pub scraped_at: String,
    pub status: ScrapeStatus,
}

impl ShadeScrape {
    /// `"<number> <name>"` reduced to a single path component, so a shade
    /// name from the queue cannot climb out of the images directory.
    pub fn folder_name(&self) -> String {
        let joined = format!("{} {}", self.shade_number, self.shade_name);
        let cleaned: String = joined
            .chars()
            .map(|c| {
                if matches!(c, '/' | '\\' | ':') || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        let cleaned = cleaned.trim();
        if cleaned.chars().all(|c| c == '.') {
            "_".to_string()
        } else {
            cleaned.to_string()
        }
    }
}
