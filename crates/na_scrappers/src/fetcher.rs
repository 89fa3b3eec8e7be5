use async_trait::async_trait;
use na_core::{Error, Result, ScrapedPage};
use reqwest::Client;
use url::Url;

use crate::document::scrape_document;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Short name used in logs
    fn source(&self) -> &str;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Fetches the page behind `url` and extracts its text
    async fn scrape_page(&self, url: &str) -> Result<ScrapedPage>;
}

/// Downloads pages over HTTP and runs them through [`scrape_document`].
#[derive(Debug, Clone, Default)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn parse_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(Error::InvalidUrl(format!("{}: unsupported scheme {}", url, scheme))),
        }
    }
}

#[async_trait]
impl Scraper for PageFetcher {
    fn source(&self) -> &str {
        "web"
    }

    fn can_handle(&self, url: &str) -> bool {
        Self::parse_url(url).is_ok()
    }

    async fn scrape_page(&self, url: &str) -> Result<ScrapedPage> {
        let parsed = Self::parse_url(url)?;
        tracing::info!("🦗 Fetching {}", parsed);

        let response = self.client.get(parsed.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
                body: None,
            });
        }

        let html = response.text().await?;
        Ok(scrape_document(&html, parsed.as_str()))
    }
}
