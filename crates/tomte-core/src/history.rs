//! Bounded conversation history persistence.
//!
//! The transcript is truncated to the last five messages on every persist
//! and mirrored best-effort as plain text under a secondary key. Storage
//! failures never propagate; a failed load yields an empty history.

use tomte_types::message::ChatMessage;

use crate::session::SessionIdentity;
use crate::storage::{StorageBackend, VersionedStore};

const HISTORY_KEY: &str = "chat:history";
const HISTORY_MIRROR_KEY: &str = "chat:history_text";

/// Maximum number of messages retained after any persist.
pub const HISTORY_LIMIT: usize = 5;

/// Durable, bounded conversation transcript.
#[derive(Debug, Clone)]
pub struct HistoryManager<B> {
    store: VersionedStore<B>,
    session: SessionIdentity<B>,
}

impl<B: StorageBackend> HistoryManager<B> {
    pub fn new(store: VersionedStore<B>) -> Self {
        let session = SessionIdentity::new(store.clone());
        Self { store, session }
    }

    /// The session identity tied to this transcript.
    pub fn session(&self) -> &SessionIdentity<B> {
        &self.session
    }

    /// Persist the transcript, truncated to the last [`HISTORY_LIMIT`]
    /// entries in original order.
    pub async fn persist(&self, messages: &[ChatMessage]) {
        let start = messages.len().saturating_sub(HISTORY_LIMIT);
        let trimmed = messages[start..].to_vec();

        if let Err(error) = self.store.write(HISTORY_KEY, &trimmed).await {
            tracing::warn!(%error, "failed to persist conversation history");
        }

        // Best-effort plain-text mirror; its failure never propagates.
        let rendered = trimmed
            .iter()
            .map(|message| format!("{}: {}", message.role, message.content))
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(error) = self.store.write(HISTORY_MIRROR_KEY, &rendered).await {
            tracing::debug!(%error, "history mirror write failed");
        }
    }

    /// Load the transcript; empty when absent or malformed.
    pub async fn load(&self) -> Vec<ChatMessage> {
        self.store.read(HISTORY_KEY, Vec::new(), None).await
    }

    /// Clear the transcript and invalidate the session identity so the next
    /// read manufactures a new one.
    pub async fn reset(&self) {
        for key in [HISTORY_KEY, HISTORY_MIRROR_KEY] {
            if let Err(error) = self.store.remove(key).await {
                tracing::warn!(key, %error, "history reset failed to clear key");
            }
        }
        self.session.reset().await;
    }
}
