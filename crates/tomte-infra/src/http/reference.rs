//! HTTP reference-data fetcher.
//!
//! The quote documents and narrative chunk sets are static JSON resources
//! served alongside the reply service. Both quote documents are fetched
//! concurrently and joined; a failure of either fails the pair, which the
//! caller degrades to "no reference data" rather than failing the turn.

use std::time::Duration;

use serde::de::DeserializeOwned;

use tomte_core::reference::ReferenceData;
use tomte_types::error::ChatError;
use tomte_types::narrative::Chunk;
use tomte_types::turn::QuoteSets;

const QUOTES_PATH: &str = "/data/quotes.json";
const CHILDREN_QUOTES_PATH: &str = "/data/children-quotes.json";

/// HTTP implementation of [`ReferenceData`].
pub struct HttpReference {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReference {
    /// Create a fetcher against the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch a narrative chunk set document.
    pub async fn chunk_set(&self, path: &str) -> Result<Vec<Chunk>, ChatError> {
        self.fetch(path).await
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChatError> {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::ServiceUnavailable {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))
    }
}

impl ReferenceData for HttpReference {
    async fn quote_sets(&self) -> Result<QuoteSets, ChatError> {
        let (quotes, children_quotes) = tokio::try_join!(
            self.fetch::<Vec<String>>(QUOTES_PATH),
            self.fetch::<Vec<String>>(CHILDREN_QUOTES_PATH),
        )?;

        Ok(QuoteSets {
            quotes,
            children_quotes,
        })
    }
}
