//! Session identity management.
//!
//! The session identity is an opaque string created lazily on first access.
//! Every read refreshes the last-active timestamp; an identity idle for more
//! than thirty days is replaced by a fresh one. Explicit reset clears it so
//! the next read manufactures a new identity.

use chrono::Utc;
use uuid::Uuid;

use crate::storage::{StorageBackend, VersionedStore};

const SESSION_ID_KEY: &str = "chat:session_id";
const LAST_ACTIVE_KEY: &str = "chat:session_last_active";

/// Idle lifetime of a session identity, in milliseconds (~30 days).
const SESSION_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Lazily-created, expiring session identity.
#[derive(Debug, Clone)]
pub struct SessionIdentity<B> {
    store: VersionedStore<B>,
}

impl<B: StorageBackend> SessionIdentity<B> {
    pub fn new(store: VersionedStore<B>) -> Self {
        Self { store }
    }

    /// Current session identity, creating one if absent or stale.
    ///
    /// Refreshes the last-active timestamp on every call.
    pub async fn get(&self) -> String {
        self.get_at(Utc::now().timestamp_millis()).await
    }

    async fn get_at(&self, now_ms: i64) -> String {
        let id: String = self.store.read(SESSION_ID_KEY, String::new(), None).await;
        let last_active: i64 = self.store.read(LAST_ACTIVE_KEY, 0, None).await;

        if id.is_empty() || now_ms - last_active > SESSION_TTL_MS {
            let fresh = Uuid::now_v7().to_string();
            self.persist(&fresh, now_ms).await;
            return fresh;
        }

        self.persist(&id, now_ms).await;
        id
    }

    /// Clear the identity; the next read manufactures a new one.
    pub async fn reset(&self) {
        for key in [SESSION_ID_KEY, LAST_ACTIVE_KEY] {
            if let Err(error) = self.store.remove(key).await {
                tracing::warn!(key, %error, "session reset failed to clear key");
            }
        }
    }

    async fn persist(&self, id: &str, now_ms: i64) {
        if let Err(error) = self.store.write(SESSION_ID_KEY, &id).await {
            tracing::warn!(%error, "failed to persist session identity");
        }
        if let Err(error) = self.store.write(LAST_ACTIVE_KEY, &now_ms).await {
            tracing::warn!(%error, "failed to refresh session last-active");
        }
    }
}
