use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_ERROR_CAPACITY: usize = 50;
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_millis(1000);

/// Per-operation paths, appended to the base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub analyses: String,
    pub analyze: String,
    pub themes: String,
    /// `{id}` is replaced by the theme id.
    pub theme_diffs: String,
    pub diffs: String,
    pub sentiment_history: String,
    pub news: String,
    pub news_analyze: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            analyses: "/analyses".to_string(),
            analyze: "/analyze".to_string(),
            themes: "/themes".to_string(),
            theme_diffs: "/themes/{id}/diffs".to_string(),
            diffs: "/diffs".to_string(),
            sentiment_history: "/sentiment/history".to_string(),
            news: "/api/news".to_string(),
            news_analyze: "/api/news/analyze".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    pub endpoints: Endpoints,
    pub error_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                parsed.scheme(),
                base_url
            )));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Diffs path for one theme, with the id percent-encoded as a single segment.
    pub fn theme_diffs_path(&self, theme_id: &str) -> Result<String> {
        let mut scratch = Url::parse("http://localhost/")?;
        scratch
            .path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("cannot encode theme id {}", theme_id)))?
            .pop_if_empty()
            .push(theme_id);
        let encoded = scratch.path().trim_start_matches('/');
        Ok(self.endpoints.theme_diffs.replace("{id}", encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.error_capacity, 50);
        assert_eq!(config.url(&config.endpoints.analyze), "http://localhost:8000/analyze");
    }

    #[test]
    fn test_base_url_keeps_prefix_path() {
        let config = ApiConfig::new("https://news.example.org/v1/").unwrap();
        assert_eq!(
            config.url(&config.endpoints.analyses),
            "https://news.example.org/v1/analyses"
        );
        assert_eq!(config.url("themes"), "https://news.example.org/v1/themes");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(ApiConfig::new("localhost"), Err(Error::InvalidUrl(_))));
        assert!(matches!(ApiConfig::new("ftp://example.com"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_theme_diffs_path() {
        let config = ApiConfig::default();
        assert_eq!(config.theme_diffs_path("t-7").unwrap(), "/themes/t-7/diffs");
        assert_eq!(
            config.theme_diffs_path("a/b?c#d").unwrap(),
            "/themes/a%2Fb%3Fc%23d/diffs"
        );
        assert_eq!(config.theme_diffs_path("50% off").unwrap(), "/themes/50%25%20off/diffs");
    }
}
