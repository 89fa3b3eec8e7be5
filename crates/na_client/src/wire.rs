//! Response shapes as the service sends them, and the checked mapping onto the
//! internal model. Anything that cannot be mapped is a decode error.

use na_core::types::{source_label, UNKNOWN_SOURCE};
use na_core::{
    AlternativeView, Analysis, AnalyzeResponse, Criterion, Error, NewsAnalysis, Paragraph, Result,
    Sentiment,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAlternativeView {
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireParagraph {
    #[serde(default)]
    id: Option<WireId>,
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "alternativeViews")]
    alternative_views: Option<Vec<WireAlternativeView>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnalysis {
    id: Option<WireId>,
    title: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "trustScore")]
    trust_score: Option<f64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    paragraphs: Option<Vec<WireParagraph>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnalyzeResponse {
    id: Option<WireId>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default, alias = "trustScore")]
    trust_score: Option<f64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    paragraphs: Option<Vec<WireParagraph>>,
}

/// Reply of the news analysis route (camelCase, id under `analysisId`).
#[derive(Debug, Deserialize)]
pub(crate) struct WireNewsAnalysis {
    #[serde(default, rename = "analysisId", alias = "id")]
    analysis_id: Option<WireId>,
    #[serde(default, rename = "trustScore", alias = "trust_score")]
    trust_score: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    sentiment: Option<Sentiment>,
    #[serde(default)]
    criteria: Option<Vec<Criterion>>,
    #[serde(default, rename = "articleUrl", alias = "url")]
    article_url: Option<String>,
}

fn score(value: Option<f64>, owner: &str) -> Result<u8> {
    let value = value.ok_or_else(|| Error::Decode(format!("{} has no trust score", owner)))?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(Error::Decode(format!(
            "{} has trust score {} outside 0..=100",
            owner, value
        )));
    }
    Ok(value.round() as u8)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn normalize_paragraphs(
    paragraphs: Option<Vec<WireParagraph>>,
    analysis_id: &str,
    default_source: &str,
) -> Result<Vec<Paragraph>> {
    paragraphs
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, paragraph)| -> Result<Paragraph> {
            let id = paragraph
                .id
                .map(WireId::into_string)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("{}-p{}", analysis_id, index));
            let content = paragraph.content.ok_or_else(|| {
                Error::Decode(format!("paragraph {} of analysis {} has no content", id, analysis_id))
            })?;
            let alternative_views = paragraph
                .alternative_views
                .unwrap_or_default()
                .into_iter()
                .map(|view| -> Result<AlternativeView> {
                    let content = view.content.ok_or_else(|| {
                        Error::Decode(format!("alternative view in paragraph {} has no content", id))
                    })?;
                    Ok(AlternativeView {
                        content,
                        source: non_blank(view.source).unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Paragraph {
                source: non_blank(paragraph.source).unwrap_or_else(|| default_source.to_string()),
                id,
                content,
                alternative_views,
            })
        })
        .collect()
}

impl WireAnalysis {
    pub(crate) fn normalize(self) -> Result<Analysis> {
        let id = self
            .id
            .map(WireId::into_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Decode("analysis has no id".to_string()))?;
        let title = self
            .title
            .ok_or_else(|| Error::Decode(format!("analysis {} has no title", id)))?;
        let trust_score = score(self.trust_score.or(self.rating), &format!("analysis {}", id))?;
        let url = self.url.unwrap_or_default();
        let source = non_blank(self.source).unwrap_or_else(|| source_label(&url));
        let paragraphs = normalize_paragraphs(self.paragraphs, &id, &source)?;

        Ok(Analysis {
            id,
            title,
            source,
            url,
            trust_score,
            summary: self.summary.unwrap_or_default(),
            paragraphs,
        })
    }
}

impl WireAnalyzeResponse {
    pub(crate) fn normalize(self) -> Result<AnalyzeResponse> {
        let id = self
            .id
            .map(WireId::into_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Decode("analysis result has no id".to_string()))?;
        let rating = score(self.rating.or(self.trust_score), &format!("analysis result {}", id))?;
        let source = non_blank(self.source);
        let paragraphs = normalize_paragraphs(
            self.paragraphs,
            &id,
            source.as_deref().unwrap_or(UNKNOWN_SOURCE),
        )?;

        Ok(AnalyzeResponse {
            id,
            rating,
            title: self.title.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            source,
            paragraphs,
        })
    }
}

impl WireNewsAnalysis {
    /// `request_url` stands in when the reply does not echo the article URL.
    pub(crate) fn normalize(self, request_url: &str) -> Result<NewsAnalysis> {
        let id = self
            .analysis_id
            .map(WireId::into_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Decode("news analysis has no analysisId".to_string()))?;
        let trust_score = score(self.trust_score, &format!("news analysis {}", id))?;
        if let Some(confidence) = self.confidence {
            if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
                return Err(Error::Decode(format!(
                    "news analysis {} has confidence {} outside 0..=1",
                    id, confidence
                )));
            }
        }

        Ok(NewsAnalysis {
            url: non_blank(self.article_url).unwrap_or_else(|| request_url.to_string()),
            id,
            trust_score,
            confidence: self.confidence,
            sentiment: self.sentiment,
            criteria: self.criteria.unwrap_or_default(),
        })
    }
}

pub(crate) fn normalize_analyses(raw: Vec<WireAnalysis>) -> Result<Vec<Analysis>> {
    raw.into_iter().map(WireAnalysis::normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<Analysis> {
        serde_json::from_value::<WireAnalysis>(value).unwrap().normalize()
    }

    #[test]
    fn test_alternative_views_are_renamed() {
        let analysis = decode(json!({
            "id": 3,
            "title": "Russia's war economy",
            "source": "Global Economic Review",
            "url": "https://example.com/economy",
            "trust_score": 82.4,
            "paragraphs": [{
                "id": 11,
                "content": "Growth surpassed expectations.",
                "source": "Economic Analysis Division",
                "alternative_views": [
                    {"content": "Growth is debt driven.", "source": "Institute A"},
                    {"content": "Figures are unreliable.", "source": "Institute B"}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(analysis.id, "3");
        assert_eq!(analysis.trust_score, 82);
        let views = &analysis.paragraphs[0].alternative_views;
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].content, "Growth is debt driven.");
        assert_eq!(views[0].source, "Institute A");
        assert_eq!(views[1].content, "Figures are unreliable.");
        assert_eq!(views[1].source, "Institute B");
    }

    #[test]
    fn test_camel_case_views_accepted() {
        let analysis = decode(json!({
            "id": "a1",
            "title": "t",
            "trust_score": 50,
            "paragraphs": [{"content": "c", "alternativeViews": [{"content": "v", "source": "s"}]}]
        }))
        .unwrap();
        assert_eq!(analysis.paragraphs[0].alternative_views[0].content, "v");
    }

    #[test]
    fn test_missing_paragraph_id_gets_fallback() {
        let analysis = decode(json!({
            "id": "a1",
            "title": "t",
            "source": "Desk",
            "trust_score": 50,
            "paragraphs": [{"content": "first"}, {"content": "second", "id": ""}]
        }))
        .unwrap();
        assert_eq!(analysis.paragraphs[0].id, "a1-p0");
        assert_eq!(analysis.paragraphs[1].id, "a1-p1");
        assert_eq!(analysis.paragraphs[0].source, "Desk");
        assert!(analysis.paragraphs[0].alternative_views.is_empty());
    }

    #[test]
    fn test_fails_closed() {
        assert!(matches!(decode(json!({"title": "t", "trust_score": 5})), Err(Error::Decode(_))));
        assert!(matches!(decode(json!({"id": 1, "trust_score": 5})), Err(Error::Decode(_))));
        assert!(matches!(decode(json!({"id": 1, "title": "t"})), Err(Error::Decode(_))));
        assert!(matches!(
            decode(json!({"id": 1, "title": "t", "trust_score": 140})),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            decode(json!({"id": 1, "title": "t", "trust_score": 40, "paragraphs": [{"id": 1}]})),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_source_falls_back_to_host() {
        let analysis = decode(json!({
            "id": 1,
            "title": "t",
            "url": "https://www.example.org/x",
            "trust_score": 10
        }))
        .unwrap();
        assert_eq!(analysis.source, "example.org");
        assert_eq!(analysis.summary, "");
    }

    #[test]
    fn test_news_reply_decodes() {
        let reply: WireNewsAnalysis = serde_json::from_value(json!({
            "trustScore": 85,
            "confidence": 0.9,
            "sentiment": {"score": 0.75, "label": "positive"},
            "criteria": [{"name": "Source Credibility", "met": true, "score": 0.8}],
            "analysisId": "test-analysis-1",
            "articleUrl": "https://example.com/story"
        }))
        .unwrap();
        let news = reply.normalize("https://fallback.example/").unwrap();

        assert_eq!(news.id, "test-analysis-1");
        assert_eq!(news.trust_score, 85);
        assert_eq!(news.url, "https://example.com/story");
        assert_eq!(news.confidence, Some(0.9));
        assert_eq!(news.sentiment.unwrap().label, "positive");
        assert_eq!(news.criteria.len(), 1);
        assert!(news.criteria[0].met);
    }

    #[test]
    fn test_news_reply_fails_closed() {
        let decode = |value: serde_json::Value| {
            serde_json::from_value::<WireNewsAnalysis>(value)
                .unwrap()
                .normalize("https://example.com/")
        };
        assert!(matches!(decode(json!({"trustScore": 50})), Err(Error::Decode(_))));
        assert!(matches!(decode(json!({"analysisId": "a"})), Err(Error::Decode(_))));
        assert!(matches!(
            decode(json!({"analysisId": "a", "trustScore": 50, "confidence": 3.0})),
            Err(Error::Decode(_))
        ));

        let news = decode(json!({"analysisId": 7, "trustScore": 40})).unwrap();
        assert_eq!(news.id, "7");
        assert_eq!(news.url, "https://example.com/");
        assert!(news.criteria.is_empty());
    }

    #[test]
    fn test_analyze_response_accepts_rating_or_trust_score() {
        let response: WireAnalyzeResponse =
            serde_json::from_value(json!({"id": 9, "rating": 71, "title": "t", "summary": "s"})).unwrap();
        let response = response.normalize().unwrap();
        assert_eq!(response.id, "9");
        assert_eq!(response.rating, 71);

        let response: WireAnalyzeResponse =
            serde_json::from_value(json!({"id": "x", "trust_score": 64.6})).unwrap();
        assert_eq!(response.normalize().unwrap().rating, 65);
    }
}
