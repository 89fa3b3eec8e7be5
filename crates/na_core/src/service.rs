use async_trait::async_trait;
use crate::types::{Analysis, AnalyzeRequest, AnalyzeResponse, DiffItem, Theme};
use crate::Result;

/// The remote analysis service as seen by the view-model and the pipeline.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submit scraped text for scoring
    async fn analyze_content(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse>;

    /// All analyses known to the service
    async fn get_analyses(&self) -> Result<Vec<Analysis>>;

    async fn get_themes(&self) -> Result<Vec<Theme>>;

    async fn get_theme_diffs(&self, theme_id: &str) -> Result<Vec<DiffItem>>;
}
