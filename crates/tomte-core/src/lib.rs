//! Business logic and port definitions for the Tomte narrative chat subsystem.
//!
//! This crate defines the "ports" (storage backend, reply transport,
//! reference data, collaborator interfaces) and the logic built on them:
//! the self-migrating versioned store, session identity, bounded
//! conversation history, narrative sequencing, TTL caches, and the turn
//! engine. It depends only on `tomte-types` -- never on HTTP or database
//! crates. Adapters live in `tomte-infra`; the in-memory storage backend
//! here is the injectable default and the test fixture.

pub mod audio;
pub mod cache;
pub mod engine;
pub mod events;
pub mod history;
pub mod reference;
pub mod sequencer;
pub mod session;
pub mod storage;
pub mod transport;
