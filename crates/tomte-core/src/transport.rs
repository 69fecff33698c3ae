//! Reply transport port.
//!
//! Defines the interface the turn engine drives for one request to the
//! reply service. The HTTP implementation lives in tomte-infra; tests use
//! in-memory fakes.

use std::pin::Pin;

use futures_util::Stream;

use tomte_types::error::ChatError;
use tomte_types::turn::{ReplyEvent, TurnReply, TurnRequest};

/// A boxed stream of reply events, as produced by the streaming path.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<ReplyEvent, ChatError>> + Send + 'static>>;

/// Trait for issuing one turn request to the reply service.
///
/// `complete` is the non-streaming path: one structured payload. `stream`
/// consumes an event-stream body, emitting [`ReplyEvent`]s in frame-receipt
/// order. Implementations never persist anything.
pub trait ReplyTransport: Send + Sync {
    /// Issue the request and return the single structured payload.
    fn complete(
        &self,
        request: &TurnRequest,
    ) -> impl std::future::Future<Output = Result<TurnReply, ChatError>> + Send;

    /// Issue the request and stream reply events as frames arrive.
    fn stream(&self, request: TurnRequest) -> ReplyStream;
}
