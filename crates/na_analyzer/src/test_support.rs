use async_trait::async_trait;
use na_core::{
    Analysis, AnalysisService, AnalyzeRequest, AnalyzeResponse, DiffItem, Error, Paragraph,
    Result, Theme,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn analysis(id: &str, trust_score: u8) -> Analysis {
    Analysis {
        id: id.to_string(),
        title: format!("Story {}", id),
        source: "Desk".to_string(),
        url: format!("https://example.com/{}", id),
        trust_score,
        summary: String::new(),
        paragraphs: vec![Paragraph {
            id: format!("{}-p0", id),
            content: "Body".to_string(),
            source: "Desk".to_string(),
            alternative_views: vec![],
        }],
    }
}

/// One scripted reply to `get_analyses`.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<Vec<Analysis>>,
}

impl Reply {
    pub fn ok(analyses: Vec<Analysis>) -> Self {
        Self { delay: Duration::ZERO, result: Ok(analyses) }
    }

    pub fn slow(delay: Duration, analyses: Vec<Analysis>) -> Self {
        Self { delay, result: Ok(analyses) }
    }

    pub fn fail() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(Error::Network("connection refused".to_string())),
        }
    }
}

#[derive(Default)]
pub struct FakeService {
    replies: Mutex<VecDeque<Reply>>,
    fetch_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
    pub analyze_response: Mutex<Option<AnalyzeResponse>>,
    pub themes: Vec<Theme>,
    pub diffs: Vec<DiffItem>,
}

impl FakeService {
    pub fn with_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn with_themes(themes: Vec<Theme>, diffs: Vec<DiffItem>) -> Self {
        Self {
            themes,
            diffs,
            ..Self::default()
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for FakeService {
    async fn analyze_content(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analyze_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Network("no response scripted".to_string()))
    }

    async fn get_analyses(&self) -> Result<Vec<Analysis>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::ok(vec![]));
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }

    async fn get_themes(&self) -> Result<Vec<Theme>> {
        Ok(self.themes.clone())
    }

    async fn get_theme_diffs(&self, theme_id: &str) -> Result<Vec<DiffItem>> {
        Ok(self
            .diffs
            .iter()
            .filter(|d| d.theme_id == theme_id)
            .cloned()
            .collect())
    }
}
