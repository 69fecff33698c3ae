//! Storage backend trait.
//!
//! Defines the interface for durable string-keyed storage. Values are JSON
//! text; the [`super::VersionedStore`] layers record wrapping and migration
//! on top. The SQLite implementation lives in tomte-infra; the in-memory
//! implementation in this crate is the default and the test fixture.

use tomte_types::error::StoreError;

/// Trait for durable key-value storage of JSON text.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// `Clone` is required so that every component holding a store shares the
/// same injected instance instead of a process-wide singleton.
pub trait StorageBackend: Clone + Send + Sync {
    /// Get the stored text for a key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Set the text for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Remove a key. No-op if the key does not exist.
    fn remove(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
