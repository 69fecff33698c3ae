//! Narrative chunk types.
//!
//! A chunk is one ordered unit of a larger pre-authored narrative, revealed
//! one per conversational turn. Chunks are read-only reference data supplied
//! externally; this subsystem never mutates them.

use serde::{Deserialize, Serialize};

/// One ordered unit of the pre-authored narrative.
///
/// `index` is the 1-based ordering key. Within a session, chunks are
/// delivered strictly in ascending index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub index: u32,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub last_used: bool,
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub reuse_day: u32,
    #[serde(default)]
    pub interaction_hint: String,
    #[serde(default)]
    pub system_guidance: String,
    pub content: String,
}

/// Per-session delivery progress through a chunk set.
///
/// Transient: held in memory by the owning flow, not durably persisted.
/// A session reload falls back to first-unused chunk selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProgress {
    pub last_delivered_index: u32,
    pub total_chunks: u32,
}

impl ChunkProgress {
    /// The index the next turn must deliver. Starts at 1.
    pub fn expected_index(&self) -> u32 {
        self.last_delivered_index + 1
    }
}
