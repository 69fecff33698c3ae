//! In-memory storage backend.
//!
//! The injectable default when no durable storage is configured, and the
//! backend used throughout the test suite. Clones share the same map, so a
//! cloned backend observes writes made through any other clone.

use std::sync::Arc;

use dashmap::DashMap;

use tomte_types::error::StoreError;

use super::backend::StorageBackend;

/// DashMap-backed [`StorageBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
