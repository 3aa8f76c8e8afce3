//! `shadekit.toml` settings. Every section and field is optional.

use crate::classify::HeuristicVersion;
use crate::color::{Rgb, STORE_GREY};
use crate::error::{Error, Result};
use crate::extract::ExtractorConfig;
use crate::transform::{BadgeCropOptions, CompressOptions, FloodOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "shadekit.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub background: BackgroundConfig,
    pub keying: KeyingConfig,
    pub compress: CompressConfig,
    pub badge: BadgeCropOptions,
    pub extraction: ExtractionConfig,
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Channels at or above this count as white.
    pub threshold: u8,
    pub grey: Rgb,
    pub flood_white_threshold: u8,
    pub flood_tolerance: u16,
    pub grey_tolerance: u8,
    /// File names the flood fill picks out of a directory tree.
    pub flood_files: Vec<String>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        let flood = FloodOptions::default();
        Self {
            threshold: 240,
            grey: STORE_GREY,
            flood_white_threshold: flood.white_threshold,
            flood_tolerance: flood.flood_tolerance,
            grey_tolerance: flood.grey_tolerance,
            flood_files: vec!["02.png".to_string(), "03.png".to_string()],
        }
    }
}

impl BackgroundConfig {
    pub fn flood_options(&self) -> FloodOptions {
        FloodOptions {
            white_threshold: self.flood_white_threshold,
            flood_tolerance: self.flood_tolerance,
            grey_tolerance: self.grey_tolerance,
            grey: self.grey,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyingConfig {
    pub t0: u8,
    pub t1: u8,
}

impl Default for KeyingConfig {
    fn default() -> Self {
        Self { t0: 8, t1: 42 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    #[serde(flatten)]
    pub options: CompressOptions,
    /// Files smaller than this are not touched by directory runs.
    pub min_size_kb: u64,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            options: CompressOptions::default(),
            min_size_kb: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub heuristic: HeuristicVersion,
    /// Overrides the extractor profile paired with `heuristic`.
    pub extractor: Option<ExtractorConfig>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            heuristic: HeuristicVersion::V2,
            extractor: None,
        }
    }
}

impl ExtractionConfig {
    pub fn extractor_for(&self, heuristic: HeuristicVersion) -> ExtractorConfig {
        self.extractor.clone().unwrap_or_else(|| match heuristic {
            HeuristicVersion::V1 => ExtractorConfig::v1(),
            HeuristicVersion::V2 => ExtractorConfig::v2(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
    pub download_delay_ms: u64,
    pub save_every: usize,
    pub max_product_images: usize,
    pub max_shade_images: usize,
    /// Slug prefix stripped before comparing names during reconciliation.
    pub slug_prefix: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.mavala.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout_secs: 30,
            page_delay_ms: 2000,
            download_delay_ms: 300,
            save_every: 10,
            max_product_images: 5,
            max_shade_images: 3,
            slug_prefix: "all-products_".to_string(),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

impl Config {
    pub fn from_toml(raw: &str, origin: &Path) -> Result<Self> {
        toml::from_str(raw).map_err(|source| Error::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&raw, path)
    }

    /// Loads `path` when given, else `shadekit.toml` in `dir` if it exists,
    /// else the defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    tracing::debug!("using config {}", candidate.display());
                    Self::load(candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_gives_defaults() -> Result<()> {
        let cfg = Config::from_toml("", Path::new("inline"))?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.keying, KeyingConfig { t0: 8, t1: 42 });
        assert_eq!(cfg.background.grey, [245, 245, 245]);
        assert_eq!(cfg.compress.options.quality, 85);
        Ok(())
    }

    #[test]
    fn partial_sections_override_fields() -> Result<()> {
        let raw = r#"
            [background]
            threshold = 230
            grey = [240, 240, 240]

            [compress]
            quality = 70
            min_size_kb = 100

            [extraction]
            heuristic = "v1"

            [scraper]
            page_delay_ms = 0
        "#;
        let cfg = Config::from_toml(raw, Path::new("inline"))?;
        assert_eq!(cfg.background.threshold, 230);
        assert_eq!(cfg.background.flood_options().grey, [240, 240, 240]);
        assert_eq!(cfg.background.flood_tolerance, 25);
        assert_eq!(cfg.background.flood_files, ["02.png", "03.png"]);
        assert_eq!(cfg.compress.options.quality, 70);
        assert_eq!(cfg.compress.options.max_dimension, 2000);
        assert_eq!(cfg.compress.min_size_kb, 100);
        assert_eq!(cfg.extraction.heuristic, HeuristicVersion::V1);
        assert_eq!(
            cfg.extraction.extractor_for(cfg.extraction.heuristic),
            ExtractorConfig::v1()
        );
        assert_eq!(cfg.scraper.page_delay(), Duration::ZERO);
        assert_eq!(cfg.scraper.save_every, 10);
        Ok(())
    }

    #[test]
    fn flood_files_can_be_replaced() -> Result<()> {
        let raw = "[background]\nflood_files = [\"04.png\"]\nflood_tolerance = 300\n";
        let cfg = Config::from_toml(raw, Path::new("inline"))?;
        assert_eq!(cfg.background.flood_files, ["04.png"]);
        assert_eq!(cfg.background.flood_options().flood_tolerance, 300);
        Ok(())
    }

    #[test]
    fn bad_toml_reports_path() {
        let err = Config::from_toml("[keying]\nt0 = \"dark\"", Path::new("bad.toml"));
        match err {
            Err(Error::Config { path, .. }) => assert_eq!(path, Path::new("bad.toml")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn discover_falls_back_to_defaults() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::io("tempdir", e))?;
        assert_eq!(Config::discover(None, dir.path())?, Config::default());

        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[keying]\nt1 = 50\n")
            .map_err(|e| Error::io("config", e))?;
        assert_eq!(Config::discover(None, dir.path())?.keying.t1, 50);
        Ok(())
    }
}
