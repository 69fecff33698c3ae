//! HttpReplyTransport -- concrete [`ReplyTransport`] over the reply service.
//!
//! Sends turn requests to the service's chat endpoint. Supports both the
//! non-streaming (`complete`) path, which decodes a single structured
//! payload, and the streaming (`stream`) path, which consumes the
//! newline-delimited frame body.

use std::time::Duration;

use tomte_core::transport::{ReplyStream, ReplyTransport};
use tomte_types::error::ChatError;
use tomte_types::turn::{TurnReply, TurnRequest};

use super::streaming::create_reply_stream;

const REPLY_PATH: &str = "/api/chat";

/// HTTP implementation of [`ReplyTransport`].
pub struct HttpReplyTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReplyTransport {
    /// Create a transport against the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn reply_url(&self) -> String {
        format!("{}{REPLY_PATH}", self.base_url.trim_end_matches('/'))
    }
}

impl ReplyTransport for HttpReplyTransport {
    async fn complete(&self, request: &TurnRequest) -> Result<TurnReply, ChatError> {
        let response = self
            .client
            .post(self.reply_url())
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "reply service error response");
            return Err(ChatError::ServiceUnavailable {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<TurnReply>()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))
    }

    fn stream(&self, request: TurnRequest) -> ReplyStream {
        create_reply_stream(&self.client, &self.reply_url(), request)
    }
}
