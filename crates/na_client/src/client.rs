use async_trait::async_trait;
use na_core::{
    AnalysisService, Analysis, AnalyzeRequest, AnalyzeResponse, ApiConfig, ApiError, DiffItem,
    Error, NewsAnalysis, NewsQuery, Result, SentimentPoint, Session, Theme,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error_log::ErrorLog;
use crate::wire::{normalize_analyses, WireAnalysis, WireAnalyzeResponse, WireNewsAnalysis};

/// HTTP client for the analysis service.
///
/// Every failed call is returned to the caller and also recorded in the
/// shared [`ErrorLog`]. Clones share the connection pool and the log.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    token: Option<String>,
    errors: Arc<ErrorLog>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.config.base_url())
            .field("token", &self.token.as_deref().map(|_| "<redacted>"))
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: ApiConfig) -> Self {
        let errors = Arc::new(ErrorLog::new(config.error_capacity));
        Self {
            http,
            config,
            token: None,
            errors,
        }
    }

    /// Authenticates requests with the session's token, if it has one.
    pub fn with_session(mut self, session: &Session) -> Self {
        self.token = session.token().map(str::to_string);
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    /// Recorded failures, newest first.
    pub fn errors(&self) -> Vec<ApiError> {
        self.errors.errors()
    }

    pub fn clear_errors(&self) {
        self.errors.clear()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ApiError> {
        self.errors.subscribe()
    }

    pub async fn analyze_content(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let path = &self.config.endpoints.analyze;
        self.tracked(path, async {
            validate_analyze_request(request, false)?;
            tracing::debug!(path, url = %request.url, "submitting content for analysis");
            let raw: WireAnalyzeResponse = self
                .execute(self.request(Method::POST, path).json(request))
                .await?;
            raw.normalize()
        })
        .await
    }

    /// Rates an article through the news route, which also requires `source`.
    pub async fn analyze_news(&self, request: &AnalyzeRequest) -> Result<NewsAnalysis> {
        let path = &self.config.endpoints.news_analyze;
        self.tracked(path, async {
            validate_analyze_request(request, true)?;
            tracing::debug!(path, url = %request.url, "submitting article for news analysis");
            let raw: WireNewsAnalysis = self
                .execute(self.request(Method::POST, path).json(request))
                .await?;
            raw.normalize(&request.url)
        })
        .await
    }

    pub async fn get_analyses(&self) -> Result<Vec<Analysis>> {
        let path = &self.config.endpoints.analyses;
        self.tracked(path, async {
            let raw: Vec<WireAnalysis> = self.execute(self.request(Method::GET, path)).await?;
            normalize_analyses(raw)
        })
        .await
    }

    pub async fn create_analysis(&self, analysis: &Analysis) -> Result<Analysis> {
        let path = &self.config.endpoints.analyses;
        self.tracked(path, async {
            let raw: WireAnalysis = self
                .execute(self.request(Method::POST, path).json(analysis))
                .await?;
            raw.normalize()
        })
        .await
    }

    pub async fn get_themes(&self) -> Result<Vec<Theme>> {
        let path = &self.config.endpoints.themes;
        self.tracked(path, self.execute(self.request(Method::GET, path)))
            .await
    }

    pub async fn get_theme_diffs(&self, theme_id: &str) -> Result<Vec<DiffItem>> {
        let endpoint = &self.config.endpoints.theme_diffs;
        self.tracked(endpoint, async {
            if theme_id.trim().is_empty() {
                return Err(Error::Validation("theme id is required".to_string()));
            }
            let path = self.config.theme_diffs_path(theme_id)?;
            self.execute(self.request(Method::GET, &path)).await
        })
        .await
    }

    pub async fn create_theme(&self, theme: &Theme) -> Result<Theme> {
        let path = &self.config.endpoints.themes;
        self.tracked(path, self.execute(self.request(Method::POST, path).json(theme)))
            .await
    }

    pub async fn create_diff(&self, diff: &DiffItem) -> Result<DiffItem> {
        let path = &self.config.endpoints.diffs;
        self.tracked(path, self.execute(self.request(Method::POST, path).json(diff)))
            .await
    }

    pub async fn get_sentiment_history(&self, url: &str) -> Result<Vec<SentimentPoint>> {
        let path = &self.config.endpoints.sentiment_history;
        self.tracked(path, async {
            if url.trim().is_empty() {
                return Err(Error::Validation("url is required".to_string()));
            }
            self.execute(self.request(Method::GET, path).query(&[("url", url)]))
                .await
        })
        .await
    }

    pub async fn get_news(&self, query: &NewsQuery) -> Result<Vec<Analysis>> {
        let path = &self.config.endpoints.news;
        self.tracked(path, async {
            let raw: Vec<WireAnalysis> = self
                .execute(self.request(Method::GET, path).query(&query.to_pairs()))
                .await?;
            normalize_analyses(raw)
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.config.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(http_error(status, &body));
        }

        serde_json::from_slice(&body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Runs `call`, recording any failure against `path` before handing it back.
    async fn tracked<T, F>(&self, path: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match call.await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(endpoint = path, "API request failed: {}", e);
                self.errors
                    .record(ApiError::new(e.to_string(), path).with_details(e.details()));
                Err(e)
            }
        }
    }
}

fn validate_analyze_request(request: &AnalyzeRequest, source_required: bool) -> Result<()> {
    let mut missing = Vec::new();
    if request.title.trim().is_empty() {
        missing.push("title");
    }
    if request.content.trim().is_empty() {
        missing.push("content");
    }
    if request.url.trim().is_empty() {
        missing.push("url");
    }
    match &request.source {
        Some(source) if source.trim().is_empty() => missing.push("source"),
        None if source_required => missing.push("source"),
        _ => {}
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Builds the error for a non-2xx reply, preferring a message from a JSON body.
fn http_error(status: StatusCode, body: &[u8]) -> Error {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(error_message)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    let body = parsed.or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        (!text.is_empty()).then(|| Value::String(text))
    });

    Error::Http {
        status: status.as_u16(),
        message,
        body,
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["detail", "message", "error"].iter().find_map(|key| match body.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Null => None,
        // validation errors come back as a list of objects with `msg`
        Value::Array(items) => {
            let messages: Vec<_> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Value::String(_) => None,
        other => Some(other.to_string()),
    })
}

#[async_trait]
impl AnalysisService for ApiClient {
    async fn analyze_content(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        ApiClient::analyze_content(self, request).await
    }

    async fn get_analyses(&self) -> Result<Vec<Analysis>> {
        ApiClient::get_analyses(self).await
    }

    async fn get_themes(&self) -> Result<Vec<Theme>> {
        ApiClient::get_themes(self).await
    }

    async fn get_theme_diffs(&self, theme_id: &str) -> Result<Vec<DiffItem>> {
        ApiClient::get_theme_diffs(self, theme_id).await
    }
}
