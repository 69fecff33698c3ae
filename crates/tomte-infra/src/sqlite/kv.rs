//! SQLite storage backend.
//!
//! Implements `StorageBackend` from `tomte-core` using sqlx with split
//! read/write pools. Values are stored as opaque text; classification and
//! version handling happen a layer up in the versioned store.

use chrono::Utc;
use sqlx::Row;

use tomte_core::storage::StorageBackend;
use tomte_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `StorageBackend`.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: DatabasePool,
}

impl SqliteBackend {
    /// Create a backend over the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl StorageBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get("value")
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO kv_store (key, value, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}
