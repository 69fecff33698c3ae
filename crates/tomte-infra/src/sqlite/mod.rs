//! SQLite persistence.

pub mod kv;
pub mod pool;

pub use kv::SqliteBackend;
pub use pool::{DatabasePool, default_database_url};
