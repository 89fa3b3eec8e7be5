use async_trait::async_trait;
use na_core::{Analysis, DiffItem, Result, Storage, Theme};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::check_diff_themes;

/// Plain record collections. Also the on-disk shape of the JSON blob backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    themes: Vec<Theme>,
    #[serde(default)]
    diffs: Vec<DiffItem>,
    #[serde(default)]
    analyses: Vec<Analysis>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_theme(&mut self, theme: &Theme) {
        if let Some(existing) = self.themes.iter_mut().find(|t| t.id == theme.id) {
            *existing = theme.clone();
        } else {
            self.themes.push(theme.clone());
        }
    }

    pub fn save_themes(&mut self, themes: &[Theme]) {
        for theme in themes {
            self.save_theme(theme);
        }
    }

    pub fn has_theme(&self, theme_id: &str) -> bool {
        self.themes.iter().any(|t| t.id == theme_id)
    }

    pub fn save_diffs(&mut self, diffs: &[DiffItem]) -> Result<()> {
        check_diff_themes(diffs, |id| self.has_theme(id))?;
        for diff in diffs {
            if let Some(existing) = self.diffs.iter_mut().find(|d| d.id == diff.id) {
                *existing = diff.clone();
            } else {
                self.diffs.push(diff.clone());
            }
        }
        Ok(())
    }

    pub fn themes(&self) -> Vec<Theme> {
        self.themes.clone()
    }

    pub fn diffs(&self) -> Vec<DiffItem> {
        self.diffs.clone()
    }

    pub fn diffs_by_theme(&self, theme_id: &str) -> Vec<DiffItem> {
        self.diffs
            .iter()
            .filter(|d| d.theme_id == theme_id)
            .cloned()
            .collect()
    }

    pub fn save_analysis(&mut self, analysis: &Analysis) {
        if let Some(existing) = self.analyses.iter_mut().find(|a| a.id == analysis.id) {
            *existing = analysis.clone();
        } else {
            self.analyses.push(analysis.clone());
        }
    }

    pub fn analyses(&self) -> Vec<Analysis> {
        self.analyses.clone()
    }

    pub fn clear(&mut self) {
        self.themes.clear();
        self.diffs.clear();
        self.analyses.clear();
    }
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_theme(&self, theme: &Theme) -> Result<()> {
        self.store.write().await.save_theme(theme);
        Ok(())
    }

    async fn save_themes(&self, themes: &[Theme]) -> Result<()> {
        self.store.write().await.save_themes(themes);
        Ok(())
    }

    async fn save_diff(&self, diff: &DiffItem) -> Result<()> {
        self.store.write().await.save_diffs(std::slice::from_ref(diff))
    }

    async fn save_diffs(&self, diffs: &[DiffItem]) -> Result<()> {
        self.store.write().await.save_diffs(diffs)
    }

    async fn get_themes(&self) -> Result<Vec<Theme>> {
        Ok(self.store.read().await.themes())
    }

    async fn get_diffs(&self) -> Result<Vec<DiffItem>> {
        Ok(self.store.read().await.diffs())
    }

    async fn get_diffs_by_theme(&self, theme_id: &str) -> Result<Vec<DiffItem>> {
        Ok(self.store.read().await.diffs_by_theme(theme_id))
    }

    async fn save_analysis(&self, analysis: &Analysis) -> Result<()> {
        self.store.write().await.save_analysis(analysis);
        Ok(())
    }

    async fn get_analyses(&self) -> Result<Vec<Analysis>> {
        Ok(self.store.read().await.analyses())
    }

    async fn clear(&self) -> Result<()> {
        self.store.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na_core::Error;

    fn diff(id: &str, theme_id: &str) -> DiffItem {
        DiffItem {
            id: id.to_string(),
            theme_id: theme_id.to_string(),
            content: format!("diff {}", id),
            source: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn test_theme_round_trip() {
        let storage = MemoryStorage::new();
        let mut theme = Theme::new("t1", "Energy prices");
        theme.description = Some("Coverage of the winter gas market".to_string());

        storage.save_theme(&theme).await.unwrap();
        let themes = storage.get_themes().await.unwrap();
        assert_eq!(themes, vec![theme]);
    }

    #[tokio::test]
    async fn test_save_theme_is_upsert() {
        let storage = MemoryStorage::new();
        storage.save_theme(&Theme::new("t1", "Draft")).await.unwrap();
        storage
            .save_themes(&[Theme::new("t1", "Final"), Theme::new("t2", "Other")])
            .await
            .unwrap();

        let themes = storage.get_themes().await.unwrap();
        assert_eq!(themes.len(), 2);
        assert!(themes.iter().any(|t| t.id == "t1" && t.name == "Final"));
    }

    #[tokio::test]
    async fn test_diffs_by_theme() {
        let storage = MemoryStorage::new();
        storage
            .save_themes(&[Theme::new("t1", "A"), Theme::new("t2", "B")])
            .await
            .unwrap();
        storage
            .save_diffs(&[diff("d1", "t1"), diff("d2", "t2"), diff("d3", "t1")])
            .await
            .unwrap();

        let diffs = storage.get_diffs_by_theme("t1").await.unwrap();
        let ids: Vec<_> = diffs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d3"]);
        assert!(storage.get_diffs_by_theme("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orphan_diff_batch_writes_nothing() {
        let storage = MemoryStorage::new();
        storage.save_theme(&Theme::new("t1", "A")).await.unwrap();

        let result = storage.save_diffs(&[diff("d1", "t1"), diff("d2", "nope")]).await;
        assert!(matches!(result, Err(Error::MissingTheme(_))));
        assert!(storage.get_diffs().await.unwrap().is_empty());

        let result = storage.save_diff(&diff("d3", "nope")).await;
        assert!(matches!(result, Err(Error::MissingTheme(_))));
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = MemoryStorage::new();
        storage.save_theme(&Theme::new("t1", "A")).await.unwrap();
        storage.save_diff(&diff("d1", "t1")).await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.get_themes().await.unwrap().is_empty());
        assert!(storage.get_diffs().await.unwrap().is_empty());
    }
}
