//! Shared domain types for the Tomte narrative chat subsystem.
//!
//! This crate contains the types used across the narrative streaming and
//! versioned-persistence layer: chat messages, narrative chunks, versioned
//! storage records, stream events, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, semver, thiserror.

pub mod error;
pub mod message;
pub mod narrative;
pub mod record;
pub mod turn;
