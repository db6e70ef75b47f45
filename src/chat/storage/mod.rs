//! Persistence adapters for the session list.

pub mod persistence;
pub mod sqlite_slots;

use std::sync::Arc;

pub use persistence::{MemoryPersistence, PersistenceAdapter, StoreFuture};
pub use sqlite_slots::SqliteSlotStore;

use crate::chat::core::config::{StorageBackend, StorageConfig};
use crate::chat::core::errors::ChatResult;

/// Build the adapter selected by configuration.
///
/// # Errors
/// Returns an error if the `SQLite` database cannot be opened.
pub async fn open_adapter(config: &StorageConfig) -> ChatResult<Arc<dyn PersistenceAdapter>> {
    let adapter: Arc<dyn PersistenceAdapter> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryPersistence::new()),
        StorageBackend::Sqlite => Arc::new(SqliteSlotStore::new(config).await?),
    };
    tracing::debug!(backend = ?config.backend, "persistence adapter ready");
    Ok(adapter)
}
