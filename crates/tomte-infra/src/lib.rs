//! Infrastructure adapters for tomte.
//!
//! Implements the ports defined in `tomte-core`: SQLite-backed storage and
//! the HTTP reply transport with its streaming frame parser.

pub mod http;
pub mod sqlite;
