//! Sequential scrape runs and image downloads.

use crate::catalog::ProductStore;
use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::model::{Product, write_json};
use crate::scrape::page::{parse_product_page, parse_shade_images, shade_url};
use crate::scrape::queue::ShadeQueueRow;
use crate::scrape::{PageSource, ScrapeStatus, ShadeScrape};
use crate::transform::BatchReport;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

pub const RESULTS_FILE: &str = "product_details.json";
pub const IMAGES_DIR: &str = "product_images";

const DOWNLOAD_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Totals printed at the end of a [`ShadeScraper::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    pub scraped: usize,
    pub successful: usize,
    pub images: BatchReport,
}

/// Walks a shade queue one page at a time, then fetches the gallery images.
pub struct ShadeScraper<S> {
    source: S,
    cfg: ScraperConfig,
    output_dir: PathBuf,
    download_images: bool,
    results: Vec<ShadeScrape>,
}

impl<S: PageSource> ShadeScraper<S> {
    pub fn new(source: S, cfg: ScraperConfig, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        let images_dir = output_dir.join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).map_err(|e| Error::io(&images_dir, e))?;
        Ok(Self {
            source,
            cfg,
            output_dir,
            download_images: true,
            results: Vec::new(),
        })
    }

    pub fn with_downloads(mut self, enabled: bool) -> Self {
        self.download_images = enabled;
        self
    }

    pub fn results(&self) -> &[ShadeScrape] {
        &self.results
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(RESULTS_FILE)
    }

    fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR)
    }

    pub fn save_results(&self) -> Result<()> {
        write_json(self.results_path(), &self.results)
    }

    /// Scrapes `rows[start..]`, at most `max` of them when given.
    pub fn run(&mut self, rows: &[ShadeQueueRow], start: usize, max: Option<usize>) -> Result<ScrapeSummary> {
        let batch: Vec<&ShadeQueueRow> = rows
            .iter()
            .skip(start)
            .take(max.unwrap_or(usize::MAX))
            .collect();
        tracing::info!("scraping {} shades starting from index {}", batch.len(), start);

        for row in &batch {
            let result = self.scrape_shade(row);
            match &result.status {
                ScrapeStatus::Error(msg) => {
                    tracing::warn!("[{}] {msg}", result.folder_name())
                }
                _ => tracing::info!("[{}] {} imgs", result.folder_name(), result.image_urls.len()),
            }
            self.results.push(result);
            thread::sleep(self.cfg.page_delay());

            if self.cfg.save_every > 0 && self.results.len() % self.cfg.save_every == 0 {
                self.save_results()?;
                tracing::info!("progress saved: {}/{}", self.results.len(), batch.len());
            }
        }
        self.save_results()?;

        let images = if self.download_images {
            self.download_all()
        } else {
            BatchReport::default()
        };
        let successful = self
            .results
            .iter()
            .filter(|r| r.status == ScrapeStatus::Success)
            .count();
        tracing::info!("complete: {}/{} successful", successful, self.results.len());
        Ok(ScrapeSummary {
            scraped: self.results.len(),
            successful,
            images,
        })
    }

    pub fn scrape_shade(&self, row: &ShadeQueueRow) -> ShadeScrape {
        let url = shade_url(
            &self.cfg.base_url,
            &row.main_color,
            &row.shade_number,
            &row.shade_name,
        );
        let (image_urls, status) = match self.source.get_text(&url) {
            Ok(html) => {
                let urls = parse_shade_images(&html, self.cfg.max_shade_images);
                let status = if urls.is_empty() {
                    ScrapeStatus::NoImages
                } else {
                    ScrapeStatus::Success
                };
                (urls, status)
            }
            Err(e) => (Vec::new(), ScrapeStatus::Error(e.to_string())),
        };
        ShadeScrape {
            main_color: row.main_color.clone(),
            shade_number: row.shade_number.clone(),
            shade_name: row.shade_name.clone(),
            product_slug: row.product_slug.clone(),
            url,
            image_urls,
            scraped_at: chrono::Local::now().to_rfc3339(),
            status,
        }
    }

    fn download_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for result in self.results.iter().filter(|r| !r.image_urls.is_empty()) {
            let folder = self.images_dir().join(result.folder_name());
            let mut downloaded = 0;
            for (idx, url) in result.image_urls.iter().enumerate() {
                match self.download_shade_image(url, &folder, idx + 1) {
                    Ok(true) => {
                        report.succeeded += 1;
                        downloaded += 1;
                    }
                    Ok(false) => report.skipped += 1,
                    Err(e) => {
                        tracing::warn!("{e}");
                        report.failed += 1;
                    }
                }
                thread::sleep(self.cfg.download_delay());
            }
            tracing::info!("[{}]: {} imgs", result.folder_name(), downloaded);
        }
        report
    }

    /// Returns `Ok(false)` when the file is already on disk.
    fn download_shade_image(&self, url: &str, folder: &Path, index: usize) -> Result<bool> {
        let path = folder.join(format!("{index:02}.{}", url_extension(url)));
        if path.exists() {
            return Ok(false);
        }
        let bytes = self.source.get_bytes(url)?;
        fs::create_dir_all(folder).map_err(|e| Error::io(folder, e))?;
        fs::write(&path, bytes).map_err(|e| Error::io(&path, e))?;
        Ok(true)
    }
}

/// Extension of the last path segment of an image URL, `jpg` when
/// unrecognised.
fn url_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let Some((_, tail)) = file.rsplit_once('.') else {
        return "jpg";
    };
    let tail = tail.to_ascii_lowercase();
    DOWNLOAD_EXTENSIONS
        .into_iter()
        .find(|ext| *ext == tail)
        .unwrap_or("jpg")
}

/// Fetches and parses a single product page. A page without a title is an
/// error.
pub fn scrape_product(source: &impl PageSource, url: &str, cfg: &ScraperConfig) -> Result<Product> {
    let html = source.get_text(url)?;
    let product = parse_product_page(&html, url, cfg.max_product_images);
    if product.title.is_empty() {
        return Err(Error::Invalid(format!("no product title found at {url}")));
    }
    tracing::info!(
        "{}: {} images, description {} chars",
        product.title,
        product.images.len(),
        product.main_description.len()
    );
    Ok(product)
}

/// Downloads `product.images` into `<out_dir>/images/<slug>/NN_<slug>.<ext>`
/// and records the paths, relative to `out_dir`, in `local_images`.
pub fn download_product_images(source: &impl PageSource, product: &mut Product, out_dir: &Path) -> BatchReport {
    let slug = product.slug.clone();
    let rel_dir = Path::new("images").join(&slug);
    let mut report = BatchReport::default();
    let mut local = Vec::new();
    for (i, url) in product.images.iter().enumerate() {
        let rel = rel_dir.join(format!("{:02}_{slug}.{}", i + 1, url_extension(url)));
        let target = out_dir.join(&rel);
        let saved = source.get_bytes(url).and_then(|bytes| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fs::write(&target, bytes).map_err(|e| Error::io(&target, e))
        });
        match saved {
            Ok(()) => {
                report.succeeded += 1;
                local.push(rel.to_string_lossy().into_owned());
            }
            Err(e) => {
                tracing::warn!("failed to download image {}: {e}", i + 1);
                report.failed += 1;
            }
        }
    }
    product.local_images = local;
    report
}

/// Writes `products_full/<slug>.json` and upserts the product into
/// `all_products_new.json`, both under `out_dir`.
pub fn save_scraped_product(product: &Product, out_dir: &Path) -> Result<PathBuf> {
    let json_path = out_dir.join("products_full").join(format!("{}.json", product.slug));
    write_json(&json_path, product)?;
    let store_path = out_dir.join("all_products_new.json");
    let mut store = ProductStore::load_or_default(&store_path)?;
    if store.upsert_by_slug(product.clone()) {
        tracing::info!("product '{}' already existed, updated", product.slug);
    }
    store.save(&store_path)?;
    Ok(json_path)
}
