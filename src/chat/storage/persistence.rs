//! Key-value persistence slots.

use std::future::Future;
use std::pin::Pin;

use dashmap::DashMap;

use crate::chat::core::errors::ChatResult;

/// Boxed future type for persistence operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque key-value store holding whole serialized blobs.
pub trait PersistenceAdapter: Send + Sync {
    /// Read the blob stored under `key`, if any.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>>;

    /// Replace the blob stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn set(&self, key: &str, blob: String) -> StoreFuture<'_, ChatResult<()>>;
}

/// Process-local persistence, used in tests and for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slots: DashMap<String, String>,
}

impl MemoryPersistence {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one slot pre-filled.
    #[must_use]
    pub fn with_slot(key: impl Into<String>, blob: impl Into<String>) -> Self {
        let store = Self::new();
        store.slots.insert(key.into(), blob.into());
        store
    }

    /// Synchronous read, handy for assertions.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|entry| entry.value().clone())
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn get(&self, key: &str) -> StoreFuture<'_, ChatResult<Option<String>>> {
        let value = self.snapshot(key);
        Box::pin(async move { Ok(value) })
    }

    fn set(&self, key: &str, blob: String) -> StoreFuture<'_, ChatResult<()>> {
        self.slots.insert(key.to_string(), blob);
        Box::pin(async move { Ok(()) })
    }
}
