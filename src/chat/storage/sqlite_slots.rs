//! `SQLite`-backed key-value slots.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::chat::core::config::StorageConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::storage::persistence::{PersistenceAdapter, StoreFuture};

/// `SQLite` implementation of the persistence slot store.
pub struct SqliteSlotStore {
    conn: Connection,
    table: String,
}

impl SqliteSlotStore {
    /// Open the database from config and create the slot table if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the table created.
    pub async fn new(config: &StorageConfig) -> ChatResult<Self> {
        Self::open(&config.sqlite_path, &config.table).await
    }

    /// Open a database at `path` using `table` for the slots.
    ///
    /// # Errors
    /// Returns an error if the table name is invalid or database operations fail.
    pub async fn open(path: &Path, table: &str) -> ChatResult<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ChatError::InvalidConfig(format!(
                "invalid slot table name: {table}"
            )));
        }

        let conn = Connection::open(path).await?;
        let table = table.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl PersistenceAdapter for SqliteSlotStore {
    fn get(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let value = self
                .conn
                .call(move |conn| {
                    let value = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            rusqlite::params![key],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, blob: String) -> StoreFuture<'_, ChatResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let now_ms = Utc::now().timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (key, value, updated_at)
                             VALUES (?1, ?2, ?3)
                             ON CONFLICT(key) DO UPDATE SET
                                value = excluded.value,
                                updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![key, blob, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}
