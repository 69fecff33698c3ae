//! Streaming body parser and async stream adapter for the reply service.
//!
//! The body arrives as arbitrary byte chunks; frame boundaries are
//! newlines. The assembler holds back a trailing partial line until the
//! bytes completing it arrive, so a frame split mid-line (or mid-UTF-8
//! sequence) decodes identically to one delivered whole. Each complete
//! line is classified and turned into zero or more [`ReplyEvent`]s; a
//! malformed frame is logged and skipped without ending the stream.

use futures_util::StreamExt;

use tomte_core::transport::ReplyStream;
use tomte_types::error::ChatError;
use tomte_types::turn::{ReplyEvent, TurnRequest};

use super::types::StreamFrame;

const DATA_PREFIX: &str = "data:";
const TERMINATOR: &str = "[DONE]";

/// Maximum error-body length carried into [`ChatError::ServiceUnavailable`].
const BODY_SNIPPET_LEN: usize = 200;

/// Classification of one complete line from the streaming body.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameLine {
    /// Keepalive or separator line.
    Blank,
    /// The `[DONE]` terminator: no more frames follow.
    Terminator,
    /// A decoded frame.
    Frame(StreamFrame),
    /// Unparseable payload; skipped, never fatal.
    Malformed,
}

/// Classify one complete line.
pub fn parse_frame_line(line: &str) -> FrameLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return FrameLine::Blank;
    }

    let payload = trimmed.strip_prefix(DATA_PREFIX).unwrap_or(trimmed).trim();
    if payload == TERMINATOR {
        return FrameLine::Terminator;
    }

    match serde_json::from_str::<StreamFrame>(payload) {
        Ok(frame) => FrameLine::Frame(frame),
        Err(_) => FrameLine::Malformed,
    }
}

/// Reassembles complete lines from arbitrary byte-chunk boundaries.
///
/// Bytes after the last newline are held until a later push completes the
/// line. A final unterminated line stays buffered; the terminator frame
/// always precedes body end, so nothing meaningful is lost.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a byte chunk, returning every line it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline_at) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_at).collect();
            let line = &line[..line.len() - 1];
            lines.push(String::from_utf8_lossy(line).into_owned());
        }
        lines
    }
}

/// Expand one frame into the events it carries, in emission order:
/// progress first, then the reply payload.
pub fn frame_events(frame: StreamFrame) -> Vec<ReplyEvent> {
    let mut events = Vec::new();

    if let Some(progress) = frame.chunk_progress {
        events.push(ReplyEvent::Progress(progress));
    }

    if frame.done {
        events.push(ReplyEvent::Done { reply: frame.reply });
    } else if let Some(reply) = frame.reply {
        events.push(ReplyEvent::Partial {
            delta: frame.chunk,
            reply,
        });
    }

    events
}

fn snippet(body: &str) -> String {
    let mut end = BODY_SNIPPET_LEN.min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

/// Create a streaming connection to the reply service.
///
/// Sends the HTTP request, checks the response status, then reads the
/// newline-delimited body incrementally, yielding [`ReplyEvent`]s as each
/// frame decodes. The stream ends at the `[DONE]` terminator or when the
/// body closes.
pub fn create_reply_stream(
    client: &reqwest::Client,
    url: &str,
    request: TurnRequest,
) -> ReplyStream {
    let client = client.clone();
    let url = url.to_string();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::NetworkUnreachable(e.to_string()))?;

        let status = response.status();
        let response = if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "reply service stream error response");
            Err(ChatError::ServiceUnavailable {
                status: status.as_u16(),
                body: snippet(&error_body),
            })?;
            unreachable!()
        } else {
            response
        };

        let mut byte_stream = response.bytes_stream();
        let mut assembler = LineAssembler::new();

        'read: while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result
                .map_err(|e| ChatError::NetworkUnreachable(format!("response body read: {e}")))?;

            for line in assembler.push(&chunk) {
                match parse_frame_line(&line) {
                    FrameLine::Blank => {}
                    FrameLine::Terminator => break 'read,
                    FrameLine::Malformed => {
                        tracing::warn!(line = %line, "malformed stream frame, skipping");
                    }
                    FrameLine::Frame(frame) => {
                        for event in frame_events(frame) {
                            yield event;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use tomte_types::narrative::ChunkProgress;

    use super::*;

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_frame_line(""), FrameLine::Blank);
        assert_eq!(parse_frame_line("   "), FrameLine::Blank);
    }

    #[test]
    fn test_parse_terminator() {
        assert_eq!(parse_frame_line("data: [DONE]"), FrameLine::Terminator);
        assert_eq!(parse_frame_line("data:[DONE]"), FrameLine::Terminator);
        assert_eq!(parse_frame_line("[DONE]"), FrameLine::Terminator);
    }

    #[test]
    fn test_parse_data_frame() {
        let line = r#"data: {"reply":"Hi","chunk":"Hi"}"#;
        match parse_frame_line(line) {
            FrameLine::Frame(frame) => {
                assert_eq!(frame.reply.as_deref(), Some("Hi"));
                assert_eq!(frame.chunk.as_deref(), Some("Hi"));
            }
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_frame_without_prefix() {
        let line = r#"{"reply":"Hi"}"#;
        assert!(matches!(parse_frame_line(line), FrameLine::Frame(_)));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_frame_line("data: {not json"), FrameLine::Malformed);
        assert_eq!(parse_frame_line("garbage"), FrameLine::Malformed);
    }

    #[test]
    fn test_assembler_holds_back_partial_line() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push(b"data: {\"re").is_empty());
        assert!(assembler.push(b"ply\":\"Hi\"}").is_empty());

        let lines = assembler.push(b"\n");
        assert_eq!(lines, [r#"data: {"reply":"Hi"}"#]);
    }

    #[test]
    fn test_assembler_multiple_lines_in_one_chunk() {
        let mut assembler = LineAssembler::new();
        let lines = assembler.push(b"first\nsecond\nthird");
        assert_eq!(lines, ["first", "second"]);
        assert_eq!(assembler.push(b"\n"), ["third"]);
    }

    #[test]
    fn test_assembler_multibyte_split() {
        let mut assembler = LineAssembler::new();
        let text = "god jul \u{1F384}\n".as_bytes();
        // Split inside the 4-byte emoji.
        assert!(assembler.push(&text[..10]).is_empty());
        let lines = assembler.push(&text[10..]);
        assert_eq!(lines, ["god jul \u{1F384}"]);
    }

    #[test]
    fn test_frame_events_progress_then_partial() {
        let frame = StreamFrame {
            reply: Some("Hi".to_string()),
            chunk: Some("Hi".to_string()),
            done: false,
            chunk_progress: Some(ChunkProgress {
                last_delivered_index: 1,
                total_chunks: 24,
            }),
        };

        let events = frame_events(frame);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ReplyEvent::Progress(_)));
        assert!(matches!(events[1], ReplyEvent::Partial { .. }));
    }

    #[test]
    fn test_frame_events_done_carries_reply() {
        let frame = StreamFrame {
            reply: Some("final".to_string()),
            chunk: None,
            done: true,
            chunk_progress: None,
        };

        let events = frame_events(frame);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            ReplyEvent::Done {
                reply: Some("final".to_string())
            }
        );
    }

    #[test]
    fn test_frame_events_progress_only_frame() {
        let frame = StreamFrame {
            reply: None,
            chunk: None,
            done: false,
            chunk_progress: Some(ChunkProgress::default()),
        };
        let events = frame_events(frame);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ReplyEvent::Progress(_)));
    }

    /// Run a full body through the parse pipeline, returning the cumulative
    /// replies observed and the final authoritative reply.
    fn consume(body: &[u8], split_at: usize) -> (Vec<String>, Option<String>) {
        let mut assembler = LineAssembler::new();
        let mut lines = Vec::new();
        let (head, tail) = body.split_at(split_at);
        lines.extend(assembler.push(head));
        lines.extend(assembler.push(tail));

        let mut cumulatives = Vec::new();
        let mut final_reply = None;
        for line in lines {
            match parse_frame_line(&line) {
                FrameLine::Frame(frame) => {
                    for event in frame_events(frame) {
                        match event {
                            ReplyEvent::Partial { reply, .. } => cumulatives.push(reply),
                            ReplyEvent::Done { reply } => final_reply = reply,
                            ReplyEvent::Progress(_) => {}
                        }
                    }
                }
                FrameLine::Terminator => break,
                FrameLine::Blank | FrameLine::Malformed => {}
            }
        }
        (cumulatives, final_reply)
    }

    #[test]
    fn test_every_split_point_decodes_identically() {
        let body = b"data: {\"reply\":\"Hi\",\"chunk\":\"Hi\"}\n\ndata: {\"reply\":\"Hi there\",\"chunk\":\" there\"}\n\ndata: {\"reply\":\"Hi there\",\"done\":true}\n\ndata: [DONE]\n";

        for split_at in 0..=body.len() {
            let (cumulatives, final_reply) = consume(body, split_at);
            assert_eq!(cumulatives, ["Hi", "Hi there"], "split at {split_at}");
            assert_eq!(final_reply.as_deref(), Some("Hi there"), "split at {split_at}");
        }
    }

    #[test]
    fn test_malformed_frame_between_valid_frames_is_skipped() {
        let body = b"data: {\"reply\":\"Hi\"}\ndata: {oops\ndata: {\"reply\":\"Hi there\",\"done\":true}\n";
        let (cumulatives, final_reply) = consume(body, 0);
        assert_eq!(cumulatives, ["Hi"]);
        assert_eq!(final_reply.as_deref(), Some("Hi there"));
    }
}
