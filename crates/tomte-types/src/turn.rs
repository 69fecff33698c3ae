//! Request, reply, and stream event types for one narrative turn.
//!
//! These model the data shapes exchanged with the reply service: the
//! outgoing turn request, the single-payload reply, and the events emitted
//! while a streaming response is consumed.

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;
use crate::narrative::{Chunk, ChunkProgress};

/// Quote reference data fetched from the static document endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSets {
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub children_quotes: Vec<String>,
}

/// One request to the reply service.
///
/// `stream` is set exactly when the caller supplied a partial-text callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub messages: Vec<ChatMessage>,
    pub session_id: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_set: Option<Vec<Chunk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_sets: Option<QuoteSets>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom_prompt: bool,
}

/// The single structured payload returned on the non-streaming path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_progress: Option<ChunkProgress>,
}

/// Events emitted while consuming a streaming reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// A decoded frame carrying the updated cumulative reply and an
    /// optional delta fragment. Emitted once per frame, in receipt order.
    Partial {
        delta: Option<String>,
        reply: String,
    },
    /// Progress metadata carried by a frame. Last value wins.
    Progress(ChunkProgress),
    /// The stream finished. When the final frame carried a reply it is
    /// authoritative, even if it diverges from locally accumulated text.
    Done { reply: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;

    #[test]
    fn test_turn_request_wire_shape() {
        let request = TurnRequest {
            messages: vec![ChatMessage {
                role: MessageRole::User,
                content: "hello".to_string(),
                image_url: None,
            }],
            session_id: "abc".to_string(),
            stream: true,
            chunk_set: None,
            quote_sets: None,
            custom_prompt: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"sessionId\":\"abc\""));
        assert!(json.contains("\"stream\":true"));
        // Absent optionals and a false flag stay off the wire.
        assert!(!json.contains("chunkSet"));
        assert!(!json.contains("customPrompt"));
    }

    #[test]
    fn test_turn_reply_with_progress() {
        let json = r#"{"reply":"Ho ho","chunkProgress":{"lastDeliveredIndex":2,"totalChunks":24}}"#;
        let reply: TurnReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.reply, "Ho ho");
        assert_eq!(reply.chunk_progress.unwrap().last_delivered_index, 2);
    }

    #[test]
    fn test_quote_sets_defaults() {
        let sets: QuoteSets = serde_json::from_str("{}").unwrap();
        assert!(sets.quotes.is_empty());
        assert!(sets.children_quotes.is_empty());
    }
}
