use async_trait::async_trait;
use na_core::{Analysis, DiffItem, Result, Storage, Theme};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use crate::backends::memory::MemoryStore;
use crate::StorageBackend;

/// Keeps every record in one JSON document that is rewritten on each change.
///
/// Writes from this process are serialized; two processes sharing the file can
/// still lose each other's updates.
pub struct JsonFileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub async fn new_with_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<MemoryStore> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(MemoryStore::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MemoryStore::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, store: &MemoryStore) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(store)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Load, mutate and rewrite the whole blob.
    async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut MemoryStore) -> Result<()> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut store = self.load().await?;
        mutate(&mut store)?;
        self.write(&store).await
    }

    async fn read(&self) -> Result<MemoryStore> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}

#[async_trait]
impl StorageBackend for JsonFileStorage {
    fn get_error_message() -> &'static str {
        "JSON store file should be readable and writable"
    }

    async fn open(path: &Path) -> Result<Self> where Self: Sized {
        let storage = Self::new_with_path(path).await?;
        // surface a corrupt file at startup instead of on first use
        storage.read().await?;
        Ok(storage)
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn save_theme(&self, theme: &Theme) -> Result<()> {
        self.update(|store| {
            store.save_theme(theme);
            Ok(())
        })
        .await
    }

    async fn save_themes(&self, themes: &[Theme]) -> Result<()> {
        self.update(|store| {
            store.save_themes(themes);
            Ok(())
        })
        .await
    }

    async fn save_diff(&self, diff: &DiffItem) -> Result<()> {
        self.update(|store| store.save_diffs(std::slice::from_ref(diff))).await
    }

    async fn save_diffs(&self, diffs: &[DiffItem]) -> Result<()> {
        self.update(|store| store.save_diffs(diffs)).await
    }

    async fn get_themes(&self) -> Result<Vec<Theme>> {
        Ok(self.read().await?.themes())
    }

    async fn get_diffs(&self) -> Result<Vec<DiffItem>> {
        Ok(self.read().await?.diffs())
    }

    async fn get_diffs_by_theme(&self, theme_id: &str) -> Result<Vec<DiffItem>> {
        Ok(self.read().await?.diffs_by_theme(theme_id))
    }

    async fn save_analysis(&self, analysis: &Analysis) -> Result<()> {
        self.update(|store| {
            store.save_analysis(analysis);
            Ok(())
        })
        .await
    }

    async fn get_analyses(&self) -> Result<Vec<Analysis>> {
        Ok(self.read().await?.analyses())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na_core::{AlternativeView, Error, Paragraph};
    use tempfile::tempdir;

    fn sample_analysis() -> Analysis {
        Analysis {
            id: "a1".to_string(),
            title: "Budget surplus announced".to_string(),
            source: "Economic Desk".to_string(),
            url: "https://example.com/budget".to_string(),
            trust_score: 82,
            summary: "Claims match official figures".to_string(),
            paragraphs: vec![Paragraph {
                id: "p1".to_string(),
                content: "The treasury reported a surplus.".to_string(),
                source: "Treasury".to_string(),
                alternative_views: vec![AlternativeView {
                    content: "Analysts call it one-off.".to_string(),
                    source: "Opposition".to_string(),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_theme_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut theme = Theme::new("t1", "Elections");
        theme.extra.insert("region".to_string(), serde_json::json!("south"));

        {
            let storage = JsonFileStorage::open(&path).await.unwrap();
            storage.save_theme(&theme).await.unwrap();
        }

        let reopened = JsonFileStorage::open(&path).await.unwrap();
        assert_eq!(reopened.get_themes().await.unwrap(), vec![theme]);
    }

    #[tokio::test]
    async fn test_blob_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let storage = JsonFileStorage::open(&path).await.unwrap();

        storage.save_theme(&Theme::new("t1", "A")).await.unwrap();
        storage
            .save_diff(&DiffItem {
                id: "d1".to_string(),
                theme_id: "t1".to_string(),
                content: "headline changed".to_string(),
                source: Some("wire".to_string()),
                url: None,
            })
            .await
            .unwrap();

        let blob: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(blob["themes"][0]["id"], "t1");
        assert_eq!(blob["diffs"][0]["themeId"], "t1");
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_orphan_diff_rejected() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::open(&dir.path().join("store.json")).await.unwrap();
        let orphan = DiffItem {
            id: "d1".to_string(),
            theme_id: "ghost".to_string(),
            content: String::new(),
            source: None,
            url: None,
        };
        assert!(matches!(storage.save_diff(&orphan).await, Err(Error::MissingTheme(_))));
        assert!(storage.get_diffs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_mirror_and_clear() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::open(&dir.path().join("store.json")).await.unwrap();
        let analysis = sample_analysis();

        storage.save_analysis(&analysis).await.unwrap();
        storage.save_analysis(&analysis).await.unwrap();
        assert_eq!(storage.get_analyses().await.unwrap(), vec![analysis]);

        storage.clear().await.unwrap();
        assert!(storage.get_analyses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStorage::open(&path).await,
            Err(Error::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_legacy_blob_without_analyses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"themes":[{"id":"t1","name":"Old"}],"diffs":[]}"#).unwrap();

        let storage = JsonFileStorage::open(&path).await.unwrap();
        assert_eq!(storage.get_themes().await.unwrap().len(), 1);
        assert!(storage.get_analyses().await.unwrap().is_empty());
    }
}
