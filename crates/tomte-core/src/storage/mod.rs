//! Storage ports and the versioned store built on them.

pub mod backend;
pub mod memory;
pub mod versioned;

pub use backend::StorageBackend;
pub use memory::MemoryBackend;
pub use versioned::VersionedStore;
