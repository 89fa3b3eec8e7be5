use na_core::{
    Analysis, AnalysisService, AnalyzeRequest, Error, Paragraph, Result, ScrapedPage, Storage,
};
use na_scrappers::{split_into_paragraphs, Scraper};
use std::sync::Arc;

use crate::view_model::AnalysisViewModel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub themes: usize,
    pub diffs: usize,
}

/// Scrape -> analyze -> merge -> persist.
pub struct AnalysisPipeline {
    service: Arc<dyn AnalysisService>,
    view_model: Arc<AnalysisViewModel>,
    storage: Option<Arc<dyn Storage>>,
}

impl AnalysisPipeline {
    pub fn new(service: Arc<dyn AnalysisService>, view_model: Arc<AnalysisViewModel>) -> Self {
        Self {
            service,
            view_model,
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn view_model(&self) -> &Arc<AnalysisViewModel> {
        &self.view_model
    }

    /// Submits a scraped page and returns the resulting analysis.
    ///
    /// On success the analysis is merged into the view-model and, when a store
    /// is attached, persisted. A storage failure is returned even though the
    /// view-model has already been updated.
    pub async fn analyze_page(&self, page: &ScrapedPage, source: Option<String>) -> Result<Analysis> {
        let request = AnalyzeRequest::from_page(page, source);
        let response = self.service.analyze_content(&request).await?;
        let mut analysis = response.into_analysis(&request);

        if analysis.paragraphs.is_empty() {
            analysis.paragraphs = seed_paragraphs(&analysis, &page.content);
        }
        tracing::info!(
            "🧠 {} scored {} ({})",
            analysis.url,
            analysis.trust_score,
            analysis.source
        );

        self.view_model.merge_analysis(analysis.clone());
        if let Some(storage) = &self.storage {
            storage.save_analysis(&analysis).await?;
        }
        Ok(analysis)
    }

    pub async fn analyze_url(
        &self,
        scraper: &dyn Scraper,
        url: &str,
        source: Option<String>,
    ) -> Result<(ScrapedPage, Analysis)> {
        if !scraper.can_handle(url) {
            return Err(Error::Scraping(format!(
                "{} scraper cannot handle URL: {}",
                scraper.source(),
                url
            )));
        }
        let page = scraper.scrape_page(url).await?;
        let analysis = self.analyze_page(&page, source).await?;
        Ok((page, analysis))
    }

    /// Loads previously persisted analyses into the view-model.
    pub async fn restore(&self) -> Result<usize> {
        let storage = self.require_storage()?;
        let analyses = storage.get_analyses().await?;
        let count = analyses.len();
        self.view_model.restore(analyses);
        Ok(count)
    }

    /// Copies the service's themes, and each theme's diffs, into the store.
    pub async fn sync_themes(&self) -> Result<SyncReport> {
        let storage = self.require_storage()?;
        let themes = self.service.get_themes().await?;
        storage.save_themes(&themes).await?;

        let mut report = SyncReport {
            themes: themes.len(),
            diffs: 0,
        };
        for theme in &themes {
            let diffs = self.service.get_theme_diffs(&theme.id).await?;
            storage.save_diffs(&diffs).await?;
            report.diffs += diffs.len();
        }
        tracing::info!("💾 Synced {} themes and {} diffs", report.themes, report.diffs);
        Ok(report)
    }

    fn require_storage(&self) -> Result<&Arc<dyn Storage>> {
        self.storage
            .as_ref()
            .ok_or_else(|| Error::Storage("no store attached".to_string()))
    }
}

fn seed_paragraphs(analysis: &Analysis, content: &str) -> Vec<Paragraph> {
    split_into_paragraphs(content)
        .into_iter()
        .enumerate()
        .map(|(index, content)| Paragraph {
            id: format!("{}-p{}", analysis.id, index),
            content,
            source: analysis.source.clone(),
            alternative_views: vec![],
        })
        .collect()
}
