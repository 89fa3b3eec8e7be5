use async_trait::async_trait;
use na_core::{Analysis, DiffItem, Error, Result, Storage, Theme};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::StorageBackend;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS themes (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS diffs (
        id TEXT PRIMARY KEY,
        theme_id TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS diffs_by_theme ON diffs (theme_id)",
    r#"
    CREATE TABLE IF NOT EXISTS analyses (
        id TEXT PRIMARY KEY,
        url TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<T>> {
    rows.iter()
        .map(|row| {
            let data: String = row.get("data");
            serde_json::from_str(&data).map_err(Error::Serialization)
        })
        .collect()
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at the configured path"
    }

    async fn open(path: &Path) -> Result<Self> where Self: Sized {
        Self::new_with_path(path).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn write_themes(&self, themes: &[Theme]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;
        for theme in themes {
            sqlx::query("INSERT OR REPLACE INTO themes (id, name, data) VALUES (?, ?, ?)")
                .bind(&theme.id)
                .bind(&theme.name)
                .bind(serde_json::to_string(theme)?)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to store theme"))?;
        }
        tx.commit().await.map_err(db_error("Failed to commit themes"))
    }

    async fn write_diffs(&self, diffs: &[DiffItem]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;
        for diff in diffs {
            let theme = sqlx::query("SELECT 1 FROM themes WHERE id = ?")
                .bind(&diff.theme_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to look up theme"))?;
            if theme.is_none() {
                // dropping the transaction rolls back earlier rows of this batch
                return Err(Error::MissingTheme(format!(
                    "{} (referenced by diff {})",
                    diff.theme_id, diff.id
                )));
            }

            sqlx::query("INSERT OR REPLACE INTO diffs (id, theme_id, data) VALUES (?, ?, ?)")
                .bind(&diff.id)
                .bind(&diff.theme_id)
                .bind(serde_json::to_string(diff)?)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to store diff"))?;
        }
        tx.commit().await.map_err(db_error("Failed to commit diffs"))
    }
}

#[async_trait]
impl Storage for SQLiteStorage {
    async fn save_theme(&self, theme: &Theme) -> Result<()> {
        self.write_themes(std::slice::from_ref(theme)).await
    }

    async fn save_themes(&self, themes: &[Theme]) -> Result<()> {
        self.write_themes(themes).await
    }

    async fn save_diff(&self, diff: &DiffItem) -> Result<()> {
        self.write_diffs(std::slice::from_ref(diff)).await
    }

    async fn save_diffs(&self, diffs: &[DiffItem]) -> Result<()> {
        self.write_diffs(diffs).await
    }

    async fn get_themes(&self) -> Result<Vec<Theme>> {
        let rows = sqlx::query("SELECT data FROM themes")
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to get themes"))?;
        decode_rows(rows)
    }

    async fn get_diffs(&self) -> Result<Vec<DiffItem>> {
        let rows = sqlx::query("SELECT data FROM diffs")
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to get diffs"))?;
        decode_rows(rows)
    }

    async fn get_diffs_by_theme(&self, theme_id: &str) -> Result<Vec<DiffItem>> {
        let rows = sqlx::query("SELECT data FROM diffs WHERE theme_id = ?")
            .bind(theme_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to get diffs by theme"))?;
        decode_rows(rows)
    }

    async fn save_analysis(&self, analysis: &Analysis) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO analyses (id, url, data) VALUES (?, ?, ?)")
            .bind(&analysis.id)
            .bind(&analysis.url)
            .bind(serde_json::to_string(analysis)?)
            .execute(&*self.pool)
            .await
            .map_err(db_error("Failed to store analysis"))?;
        Ok(())
    }

    async fn get_analyses(&self) -> Result<Vec<Analysis>> {
        let rows = sqlx::query("SELECT data FROM analyses")
            .fetch_all(&*self.pool)
            .await
            .map_err(db_error("Failed to get analyses"))?;
        decode_rows(rows)
    }

    async fn clear(&self) -> Result<()> {
        for table in ["diffs", "themes", "analyses"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&*self.pool)
                .await
                .map_err(db_error("Failed to clear table"))?;
        }
        Ok(())
    }
}
