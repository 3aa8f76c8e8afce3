use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use reqwest::blocking::Client;

/// Anything that can hand back page bodies and raw bytes for a URL.
pub trait PageSource {
    fn get_text(&self, url: &str) -> Result<String>;
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP client with the configured timeout and user agent.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(cfg: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| Error::http(cfg.base_url.clone(), e))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::http(url, e))
    }
}

impl PageSource for HttpClient {
    fn get_text(&self, url: &str) -> Result<String> {
        self.get(url)?.text().map_err(|e| Error::http(url, e))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.get(url)?.bytes().map_err(|e| Error::http(url, e))?;
        Ok(bytes.to_vec())
    }
}
