use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::Mutex;

/// Scoped key-value scratch storage for transient workflow bookkeeping.
/// Holds in-progress creation state, never authoritative data.
#[async_trait]
pub trait ScratchStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store used by tests and bridge-less sessions.
#[derive(Default)]
pub struct MemoryScratchStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ScratchStore for MemoryScratchStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Durable scratch store backed by sqlite. Entries are partitioned by scope
/// so independent sessions on the same database do not collide.
#[derive(Clone)]
pub struct SqliteScratchStore {
    pool: Pool<Sqlite>,
    scope: String,
}

impl SqliteScratchStore {
    pub async fn new(database_url: &str, scope: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        let store = Self {
            pool,
            scope: scope.to_string(),
        };
        store.ensure_scratch_table().await?;
        Ok(store)
    }

    /// Another view on the same database under a different scope.
    pub fn with_scope(&self, scope: &str) -> Self {
        Self {
            pool: self.pool.clone(),
            scope: scope.to_string(),
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_scratch_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scratch_entries (
                scope      TEXT NOT NULL,
                key        TEXT NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (scope, key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure scratch_entries table exists")?;
        Ok(())
    }
}

#[async_trait]
impl ScratchStore for SqliteScratchStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM scratch_entries WHERE scope = ? AND key = ?")
            .bind(&self.scope)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read scratch entry '{key}'"))?;
        row.map(|row| row.try_get::<String, _>("value").map_err(Into::into))
            .transpose()
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scratch_entries (scope, key, value, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (scope, key)
            DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&self.scope)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write scratch entry '{key}'"))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM scratch_entries WHERE scope = ? AND key = ?")
            .bind(&self.scope)
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove scratch entry '{key}'"))?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
