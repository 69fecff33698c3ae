//! Narrative turn engine.
//!
//! Orchestrates one conversational turn: sequential chunk selection,
//! reference-data loading, the transport call (streaming or not), progress
//! advancement, usage bookkeeping, and history persistence. Collaborators
//! (event sink, ambient audio) are optional and fire-and-forget.
//!
//! Single-threaded, event-driven consumer model: within one stream, partial
//! callbacks fire strictly in frame-receipt order and the final progress
//! value observed is last-write-wins. There is no built-in cancellation; an
//! abandoned caller simply stops awaiting.

use std::sync::Arc;

use futures_util::StreamExt;

use tomte_types::error::ChatError;
use tomte_types::message::ChatMessage;
use tomte_types::narrative::{Chunk, ChunkProgress};
use tomte_types::turn::{QuoteSets, TurnRequest};

use crate::audio::AudioPlayer;
use crate::events::EventSink;
use crate::history::HistoryManager;
use crate::reference::ReferenceData;
use crate::sequencer;
use crate::storage::{StorageBackend, VersionedStore};
use crate::transport::ReplyTransport;

/// Callback invoked once per partial frame with the delta fragment and the
/// cumulative reply so far.
pub type OnPartial<'a> = &'a mut (dyn FnMut(&str, &str) + Send);

/// Callback invoked for each frame carrying progress metadata.
pub type OnProgress<'a> = &'a mut (dyn FnMut(ChunkProgress) + Send);

/// Context accompanying one reply request.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub session_id: String,
    pub chunk_set: Option<Vec<Chunk>>,
    pub quote_sets: Option<QuoteSets>,
    pub custom_prompt: bool,
}

/// Inputs for one narrative-mode turn.
pub struct NarrativeTurn<'a> {
    /// The user's literal input: displayed and logged, never transmitted.
    pub user_input: &'a str,
    /// The chunk set for the running narrative.
    pub chunks: &'a [Chunk],
    /// Identifier of the chunk set, used for usage bookkeeping.
    pub chunk_set_key: &'a str,
    /// Session progress; advanced only on a successful turn.
    pub progress: &'a mut ChunkProgress,
    pub custom_prompt: bool,
}

/// Turn engine wiring transport, sequencing, history, and collaborators.
pub struct NarrativeEngine<T, R, B> {
    transport: T,
    reference: R,
    store: VersionedStore<B>,
    history: HistoryManager<B>,
    events: Option<Arc<dyn EventSink>>,
    audio: Option<Arc<dyn AudioPlayer>>,
    ambient_track: Option<String>,
}

impl<T, R, B> NarrativeEngine<T, R, B>
where
    T: ReplyTransport,
    R: ReferenceData,
    B: StorageBackend,
{
    pub fn new(transport: T, reference: R, store: VersionedStore<B>) -> Self {
        let history = HistoryManager::new(store.clone());
        Self {
            transport,
            reference,
            store,
            history,
            events: None,
            audio: None,
            ambient_track: None,
        }
    }

    /// Attach a fire-and-forget event sink.
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Attach the host's audio player and the ambient track to start when a
    /// turn begins.
    pub fn with_audio(mut self, player: Arc<dyn AudioPlayer>, ambient_track: impl Into<String>) -> Self {
        self.audio = Some(player);
        self.ambient_track = Some(ambient_track.into());
        self
    }

    /// The bounded conversation history owned by this engine.
    pub fn history(&self) -> &HistoryManager<B> {
        &self.history
    }

    /// Issue one reply request.
    ///
    /// The request is streamed exactly when `on_partial` is supplied. On the
    /// streaming path, `on_partial(delta, cumulative)` fires once per
    /// partial frame in receipt order and `on_progress` receives every
    /// progress payload (last value wins). A final frame's reply is
    /// authoritative even when it diverges from the accumulated text.
    ///
    /// No side effects beyond the callbacks; nothing is persisted here.
    pub async fn request_reply(
        &self,
        messages: &[ChatMessage],
        ctx: &TurnContext,
        mut on_partial: Option<OnPartial<'_>>,
        mut on_progress: Option<OnProgress<'_>>,
    ) -> Result<String, ChatError> {
        let request = TurnRequest {
            messages: messages.to_vec(),
            session_id: ctx.session_id.clone(),
            stream: on_partial.is_some(),
            chunk_set: ctx.chunk_set.clone(),
            quote_sets: ctx.quote_sets.clone(),
            custom_prompt: ctx.custom_prompt,
        };

        if !request.stream {
            let reply = self.transport.complete(&request).await?;
            if let Some(progress) = reply.chunk_progress {
                if let Some(callback) = on_progress.as_mut() {
                    callback(progress);
                }
            }
            return Ok(reply.reply);
        }

        let mut stream = self.transport.stream(request);
        let mut accumulated = String::new();

        while let Some(event) = stream.next().await {
            match event? {
                tomte_types::turn::ReplyEvent::Progress(progress) => {
                    if let Some(callback) = on_progress.as_mut() {
                        callback(progress);
                    }
                }
                tomte_types::turn::ReplyEvent::Partial { delta, reply } => {
                    accumulated = reply;
                    if let Some(callback) = on_partial.as_mut() {
                        callback(delta.as_deref().unwrap_or(""), &accumulated);
                    }
                }
                tomte_types::turn::ReplyEvent::Done { reply } => {
                    // The server's final value is the source of truth.
                    if let Some(reply) = reply {
                        accumulated = reply;
                    }
                    break;
                }
            }
        }

        Ok(accumulated)
    }

    /// Run one narrative-mode turn.
    ///
    /// Selects the chunk at the expected index (last delivered + 1); a
    /// missing chunk yields [`ChatError::SequenceIntegrity`] before any
    /// network request is attempted. On success, progress advances, the
    /// delivered index is recorded, and the transcript (user's literal
    /// input + assistant reply) is persisted, truncated to its bound.
    pub async fn narrative_turn(
        &self,
        turn: NarrativeTurn<'_>,
        on_partial: Option<OnPartial<'_>>,
        on_progress: Option<OnProgress<'_>>,
    ) -> Result<String, ChatError> {
        let expected = turn.progress.expected_index();
        let used = self.used_indices(turn.chunk_set_key).await;
        let chunk = sequencer::select_next(turn.chunks, &used, Some(expected))
            .ok_or(ChatError::SequenceIntegrity { expected })?;

        if let Some(sink) = &self.events {
            sink.notify(
                "narrative_turn_started",
                &serde_json::json!({ "chunkIndex": chunk.index, "userInput": turn.user_input }),
            );
        }
        if let (Some(player), Some(track)) = (&self.audio, &self.ambient_track) {
            if !player.is_playing() {
                player.play(track, 0.0);
            }
        }

        let quote_sets = match self.reference.quote_sets().await {
            Ok(sets) => Some(sets),
            Err(error) => {
                tracing::warn!(%error, "quote fetch failed, continuing without reference data");
                None
            }
        };

        let outgoing = sequencer::format_for_transmission(chunk);
        let mut messages = self.history.load().await;
        messages.push(ChatMessage::user(outgoing));

        let ctx = TurnContext {
            session_id: self.history.session().get().await,
            chunk_set: Some(turn.chunks.to_vec()),
            quote_sets,
            custom_prompt: turn.custom_prompt,
        };
        let reply = self.request_reply(&messages, &ctx, on_partial, on_progress).await?;

        turn.progress.last_delivered_index = chunk.index;
        self.record_usage(turn.chunk_set_key, chunk.index).await;

        // The transcript keeps the literal input for display; the formatted
        // chunk text existed only on the wire.
        let mut transcript = self.history.load().await;
        transcript.push(ChatMessage::user(turn.user_input));
        transcript.push(ChatMessage::assistant(reply.clone()));
        self.history.persist(&transcript).await;

        Ok(reply)
    }

    async fn used_indices(&self, set_key: &str) -> Vec<u32> {
        self.store.read(&usage_key(set_key), Vec::new(), None).await
    }

    async fn record_usage(&self, set_key: &str, index: u32) {
        let mut used = self.used_indices(set_key).await;
        sequencer::record_usage(&mut used, index);
        if let Err(error) = self.store.write(&usage_key(set_key), &used).await {
            tracing::warn!(set_key, %error, "failed to persist chunk usage");
        }
    }
}

fn usage_key(set_key: &str) -> String {
    format!("chat:used_chunks:{set_key}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use semver::Version;

    use tomte_types::narrative::ChunkProgress;
    use tomte_types::turn::{ReplyEvent, TurnReply};

    use super::*;
    use crate::reference::StaticReference;
    use crate::storage::MemoryBackend;
    use crate::transport::ReplyStream;

    /// Transport fake replaying a canned event sequence.
    struct FakeTransport {
        events: Vec<ReplyEvent>,
        reply: TurnReply,
        complete_calls: Arc<AtomicUsize>,
        stream_calls: Arc<AtomicUsize>,
    }

    impl FakeTransport {
        fn new(events: Vec<ReplyEvent>) -> Self {
            Self {
                events,
                reply: TurnReply {
                    reply: "non-streaming reply".to_string(),
                    chunk_progress: None,
                },
                complete_calls: Arc::new(AtomicUsize::new(0)),
                stream_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn total_calls(&self) -> usize {
            self.complete_calls.load(Ordering::SeqCst) + self.stream_calls.load(Ordering::SeqCst)
        }
    }

    impl ReplyTransport for FakeTransport {
        async fn complete(&self, request: &TurnRequest) -> Result<TurnReply, ChatError> {
            assert!(!request.stream, "complete must only see non-streaming requests");
            self.complete_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn stream(&self, request: TurnRequest) -> ReplyStream {
            assert!(request.stream, "stream must only see streaming requests");
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(futures_util::stream::iter(
                self.events.clone().into_iter().map(Ok),
            ))
        }
    }

    fn store() -> VersionedStore<MemoryBackend> {
        VersionedStore::new(MemoryBackend::new(), Version::parse("1.0.0").unwrap())
    }

    fn engine(transport: FakeTransport) -> NarrativeEngine<FakeTransport, StaticReference, MemoryBackend> {
        NarrativeEngine::new(transport, StaticReference::default(), store())
    }

    fn chunk(index: u32) -> Chunk {
        Chunk {
            index,
            topics: vec![],
            last_used: false,
            times_used: 0,
            reuse_day: 0,
            interaction_hint: String::new(),
            system_guidance: String::new(),
            content: format!("chunk {index}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_partials_in_order_and_done_authoritative() {
        let engine = engine(FakeTransport::new(vec![
            ReplyEvent::Partial { delta: Some("Hi".to_string()), reply: "Hi".to_string() },
            ReplyEvent::Progress(ChunkProgress { last_delivered_index: 1, total_chunks: 5 }),
            ReplyEvent::Partial { delta: Some(" there".to_string()), reply: "Hi there".to_string() },
            ReplyEvent::Progress(ChunkProgress { last_delivered_index: 2, total_chunks: 5 }),
            // Diverges from the accumulated text; server wins.
            ReplyEvent::Done { reply: Some("Hi there, friend".to_string()) },
        ]));

        let mut cumulatives = Vec::new();
        let mut on_partial = |_delta: &str, cumulative: &str| cumulatives.push(cumulative.to_string());
        let mut last_progress = None;
        let mut on_progress = |progress: ChunkProgress| last_progress = Some(progress);

        let reply = engine
            .request_reply(&[], &TurnContext::default(), Some(&mut on_partial), Some(&mut on_progress))
            .await
            .unwrap();

        assert_eq!(cumulatives, ["Hi", "Hi there"]);
        assert_eq!(reply, "Hi there, friend");
        assert_eq!(last_progress.unwrap().last_delivered_index, 2);
    }

    #[tokio::test]
    async fn test_done_without_reply_keeps_accumulated_text() {
        let engine = engine(FakeTransport::new(vec![
            ReplyEvent::Partial { delta: None, reply: "Hello".to_string() },
            ReplyEvent::Done { reply: None },
        ]));

        let mut on_partial = |_: &str, _: &str| {};
        let reply = engine
            .request_reply(&[], &TurnContext::default(), Some(&mut on_partial), None)
            .await
            .unwrap();
        assert_eq!(reply, "Hello");
    }

    #[tokio::test]
    async fn test_no_partial_callback_takes_non_streaming_path() {
        let transport = FakeTransport::new(vec![]);
        let complete_calls = transport.complete_calls.clone();
        let stream_calls = transport.stream_calls.clone();
        let engine = engine(transport);

        let reply = engine
            .request_reply(&[], &TurnContext::default(), None, None)
            .await
            .unwrap();

        assert_eq!(reply, "non-streaming reply");
        assert_eq!(complete_calls.load(Ordering::SeqCst), 1);
        assert_eq!(stream_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_chunk_yields_sequence_error_without_network() {
        let transport = FakeTransport::new(vec![]);
        let complete_calls = transport.complete_calls.clone();
        let stream_calls = transport.stream_calls.clone();
        let engine = engine(transport);

        // Five-chunk narrative with index 3 absent; turn 3 is next.
        let chunks = vec![chunk(1), chunk(2), chunk(4), chunk(5)];
        let mut progress = ChunkProgress { last_delivered_index: 2, total_chunks: 5 };

        let result = engine
            .narrative_turn(
                NarrativeTurn {
                    user_input: "what happened next?",
                    chunks: &chunks,
                    chunk_set_key: "advent-2026",
                    progress: &mut progress,
                    custom_prompt: false,
                },
                None,
                None,
            )
            .await;

        match result {
            Err(ChatError::SequenceIntegrity { expected }) => assert_eq!(expected, 3),
            other => panic!("expected SequenceIntegrity, got {other:?}"),
        }
        assert_eq!(complete_calls.load(Ordering::SeqCst) + stream_calls.load(Ordering::SeqCst), 0);
        // Conversation state is not silently advanced.
        assert_eq!(progress.last_delivered_index, 2);
    }

    #[tokio::test]
    async fn test_successful_turn_advances_progress_and_persists_history() {
        let engine = engine(FakeTransport::new(vec![]));
        let chunks = vec![chunk(1), chunk(2), chunk(3)];
        let mut progress = ChunkProgress { last_delivered_index: 0, total_chunks: 3 };

        let reply = engine
            .narrative_turn(
                NarrativeTurn {
                    user_input: "tell me a story",
                    chunks: &chunks,
                    chunk_set_key: "advent-2026",
                    progress: &mut progress,
                    custom_prompt: false,
                },
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(reply, "non-streaming reply");
        assert_eq!(progress.last_delivered_index, 1);

        // The transcript keeps the literal input, not the formatted chunk.
        let history = engine.history().load().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "tell me a story");
        assert_eq!(history[1].content, "non-streaming reply");
    }

    #[tokio::test]
    async fn test_turns_deliver_strictly_ascending() {
        let engine = engine(FakeTransport::new(vec![]));
        let chunks = vec![chunk(1), chunk(2), chunk(3)];
        let mut progress = ChunkProgress { last_delivered_index: 0, total_chunks: 3 };

        for expected in 1..=3u32 {
            engine
                .narrative_turn(
                    NarrativeTurn {
                        user_input: "go on",
                        chunks: &chunks,
                        chunk_set_key: "advent-2026",
                        progress: &mut progress,
                        custom_prompt: false,
                    },
                    None,
                    None,
                )
                .await
                .unwrap();
            assert_eq!(progress.last_delivered_index, expected);
        }

        // Past the end of the narrative: integrity error, no substitution.
        let result = engine
            .narrative_turn(
                NarrativeTurn {
                    user_input: "more!",
                    chunks: &chunks,
                    chunk_set_key: "advent-2026",
                    progress: &mut progress,
                    custom_prompt: false,
                },
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(ChatError::SequenceIntegrity { expected: 4 })));
    }

    #[tokio::test]
    async fn test_turn_notifies_event_sink() {
        struct CountingSink(AtomicUsize);
        impl EventSink for CountingSink {
            fn notify(&self, _event: &str, _detail: &serde_json::Value) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        let engine = NarrativeEngine::new(
            FakeTransport::new(vec![]),
            StaticReference::default(),
            store(),
        )
        .with_events(sink.clone());

        let chunks = vec![chunk(1)];
        let mut progress = ChunkProgress { last_delivered_index: 0, total_chunks: 1 };
        engine
            .narrative_turn(
                NarrativeTurn {
                    user_input: "hello",
                    chunks: &chunks,
                    chunk_set_key: "advent-2026",
                    progress: &mut progress,
                    custom_prompt: false,
                },
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }
}
