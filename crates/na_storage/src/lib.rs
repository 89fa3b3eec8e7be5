use async_trait::async_trait;
use na_core::{DiffItem, Error, Result, Storage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

pub const DEFAULT_JSON_PATH: &str = "news-analyzer.json";
pub const DEFAULT_SQLITE_PATH: &str = "news-analyzer.db";

#[async_trait]
pub trait StorageBackend: Storage {
    fn get_error_message() -> &'static str;
    async fn open(path: &Path) -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Json,
    Sqlite,
}

impl Default for StorageKind {
    fn default() -> Self {
        Self::Memory
    }
}

impl StorageKind {
    pub fn default_path(&self) -> Option<PathBuf> {
        match self {
            StorageKind::Memory => None,
            StorageKind::Json => Some(PathBuf::from(DEFAULT_JSON_PATH)),
            StorageKind::Sqlite => Some(PathBuf::from(DEFAULT_SQLITE_PATH)),
        }
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" | "file" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::Json => "json",
            StorageKind::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

async fn open_backend<T: StorageBackend + 'static>(path: &Path) -> Result<Arc<dyn Storage>> {
    match T::open(path).await {
        Ok(storage) => Ok(Arc::new(storage)),
        Err(e) => {
            tracing::error!("{} ({})", T::get_error_message(), e);
            Err(e)
        }
    }
}

/// Opens the backend named by `kind`, at `path` or the backend's default location.
pub async fn create_storage(kind: StorageKind, path: Option<&Path>) -> Result<Arc<dyn Storage>> {
    let path = path.map(Path::to_path_buf).or_else(|| kind.default_path());
    tracing::debug!(backend = %kind, path = ?path, "opening storage");

    match (kind, path) {
        (StorageKind::Memory, _) | (_, None) => Ok(Arc::new(MemoryStorage::new())),
        (StorageKind::Json, Some(path)) => open_backend::<JsonFileStorage>(&path).await,
        #[cfg(feature = "sqlite")]
        (StorageKind::Sqlite, Some(path)) => open_backend::<SQLiteStorage>(&path).await,
        #[cfg(not(feature = "sqlite"))]
        (StorageKind::Sqlite, Some(_)) => Err(Error::Storage(
            "SQLite support was not compiled in (enable the `sqlite` feature)".to_string(),
        )),
    }
}

/// Fails with the first diff whose theme is not known.
pub(crate) fn check_diff_themes<F>(diffs: &[DiffItem], theme_exists: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    match diffs.iter().find(|d| !theme_exists(&d.theme_id)) {
        Some(orphan) => Err(Error::MissingTheme(format!(
            "{} (referenced by diff {})",
            orphan.theme_id, orphan.id
        ))),
        None => Ok(()),
    }
}

pub mod prelude {
    pub use super::{create_storage, StorageBackend, StorageKind};
    pub use super::backends::*;
}
