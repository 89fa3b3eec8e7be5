use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const UNKNOWN_SOURCE: &str = "Unknown Source";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    pub title: String,
    pub source: String,
    pub url: String,
    pub trust_score: u8,
    pub summary: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: String,
    pub content: String,
    pub source: String,
    #[serde(default, alias = "alternativeViews")]
    pub alternative_views: Vec<AlternativeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeView {
    pub content: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any further descriptive fields the service attaches, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Theme {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffItem {
    pub id: String,
    pub theme_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A failed request as kept in the client's error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
            endpoint: endpoint.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<serde_json::Value>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub title: String,
    pub content: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl AnalyzeRequest {
    pub fn from_page(page: &ScrapedPage, source: Option<String>) -> Self {
        Self {
            title: page.title.clone(),
            content: page.content.clone(),
            url: page.url.clone(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub id: String,
    pub rating: u8,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl AnalyzeResponse {
    /// Builds the full analysis record for the request that produced this response.
    pub fn into_analysis(self, request: &AnalyzeRequest) -> Analysis {
        let title = if self.title.trim().is_empty() {
            request.title.clone()
        } else {
            self.title
        };
        let source = self
            .source
            .filter(|s| !s.trim().is_empty())
            .or_else(|| request.source.clone())
            .unwrap_or_else(|| source_label(&request.url));

        Analysis {
            id: self.id,
            title,
            source,
            url: request.url.clone(),
            trust_score: self.rating,
            summary: self.summary,
            paragraphs: self.paragraphs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub label: String,
}

/// One scored check behind a news trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub met: bool,
    pub score: f64,
}

/// Result of the news analysis route, which rates an article without
/// breaking it into paragraphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub id: String,
    pub url: String,
    pub trust_score: u8,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

impl NewsAnalysis {
    pub fn into_analysis(self, request: &AnalyzeRequest) -> Analysis {
        let source = request
            .source
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| source_label(&request.url));
        let summary = self
            .criteria
            .iter()
            .map(|c| format!("{}: {}", c.name, if c.met { "met" } else { "not met" }))
            .collect::<Vec<_>>()
            .join("; ");

        Analysis {
            id: self.id,
            title: request.title.clone(),
            source,
            url: self.url,
            trust_score: self.trust_score,
            summary,
            paragraphs: vec![],
        }
    }
}

/// Host of `url` without a leading `www.`, used when nothing better names the source.
pub fn source_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsQuery {
    pub skip: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub source: Option<String>,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 10,
            category: None,
            source: None,
        }
    }
}

impl NewsQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(source) = &self.source {
            pairs.push(("source", source.clone()));
        }
        pairs
    }
}
