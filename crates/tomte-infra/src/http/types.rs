//! Wire types for the reply service's streaming protocol.
//!
//! The streaming body is newline-delimited: each non-blank line is
//! `data: <json>` where the JSON is a [`StreamFrame`], except the final
//! terminator line `data: [DONE]`.

use serde::Deserialize;

use tomte_types::narrative::ChunkProgress;

/// One decoded frame from the streaming body.
///
/// `reply` is the cumulative text so far, not a delta; `chunk` is the delta
/// fragment when the service supplies one. A frame with `done` set carries
/// the authoritative final reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFrame {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub chunk_progress: Option<ChunkProgress>,
}
