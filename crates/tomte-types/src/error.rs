use thiserror::Error;

/// Errors surfaced to the caller of a narrative turn.
///
/// Malformed stream frames and persistence failures never appear here: the
/// former are absorbed by the stream parser, the latter by the store.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The transport could not reach the reply service at all.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The service answered with a non-success status.
    #[error("service unavailable (HTTP {status}): {body}")]
    ServiceUnavailable { status: u16, body: String },

    /// The chunk at the expected index is missing from the supplied set.
    /// Conversation state is never silently advanced past this.
    #[error("narrative chunk {expected} missing from chunk set")]
    SequenceIntegrity { expected: u32 },

    /// A structured payload failed to decode.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors from the storage backend.
///
/// These never cross the versioned-store boundary: reads degrade to the
/// caller's default and writes are best-effort.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}
