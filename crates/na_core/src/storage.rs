use async_trait::async_trait;
use crate::types::{Analysis, DiffItem, Theme};
use crate::Result;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or replace a theme by id
    async fn save_theme(&self, theme: &Theme) -> Result<()>;

    /// Insert or replace several themes at once
    async fn save_themes(&self, themes: &[Theme]) -> Result<()>;

    /// Insert or replace a diff; its theme must already be stored
    async fn save_diff(&self, diff: &DiffItem) -> Result<()>;

    /// Insert or replace several diffs; nothing is written if any theme is missing
    async fn save_diffs(&self, diffs: &[DiffItem]) -> Result<()>;

    /// All stored themes, in no particular order
    async fn get_themes(&self) -> Result<Vec<Theme>>;

    /// All stored diffs, in no particular order
    async fn get_diffs(&self) -> Result<Vec<DiffItem>>;

    /// Diffs belonging to one theme
    async fn get_diffs_by_theme(&self, theme_id: &str) -> Result<Vec<DiffItem>>;

    /// Insert or replace an analysis by id
    async fn save_analysis(&self, analysis: &Analysis) -> Result<()>;

    /// All stored analyses
    async fn get_analyses(&self) -> Result<Vec<Analysis>>;

    /// Remove everything
    async fn clear(&self) -> Result<()>;
}
