//! Reference data port.
//!
//! The two quote documents are static, unauthenticated resources consulted
//! before each narrative request. Implementations fetch both concurrently
//! and join the results; the HTTP implementation lives in tomte-infra.

use tomte_types::error::ChatError;
use tomte_types::turn::QuoteSets;

/// Trait for fetching the static quote reference documents.
pub trait ReferenceData: Send + Sync {
    /// Fetch both quote sets, issued concurrently and joined.
    fn quote_sets(
        &self,
    ) -> impl std::future::Future<Output = Result<QuoteSets, ChatError>> + Send;
}

/// Reference data served from memory. Useful for tests and for hosts that
/// bundle the documents.
#[derive(Debug, Clone, Default)]
pub struct StaticReference {
    sets: QuoteSets,
}

impl StaticReference {
    pub fn new(sets: QuoteSets) -> Self {
        Self { sets }
    }
}

impl ReferenceData for StaticReference {
    async fn quote_sets(&self) -> Result<QuoteSets, ChatError> {
        Ok(self.sets.clone())
    }
}
