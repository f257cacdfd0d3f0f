use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{KeyValueStore, StorageError};

/// Relational store: one row per key in the `store` table of a SQLite
/// database. Handy when operators want to inspect state with plain SQL.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::unavailable(format!("sql: {}", e))
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StorageError::unavailable(format!("sql migration: {}", e))
    }
}

impl SqlStore {
    /// Open or create a database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::unavailable)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    /// Create a private in-memory database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new().filename(":memory:");

        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqlStore {
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO store (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let row = sqlx::query("SELECT value FROM store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<Vec<u8>, _>("value")))
    }

    async fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
