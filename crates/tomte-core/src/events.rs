//! Event logging collaborator port.
//!
//! Fire-and-forget: callers never observe delivery failures. The shipping
//! pipeline itself is out of scope; hosts plug in their own sink.

/// Fire-and-forget event notification.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: &str, detail: &serde_json::Value);
}

/// Sink that records events to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn notify(&self, event: &str, detail: &serde_json::Value) {
        tracing::info!(event, detail = %detail, "chat event");
    }
}
