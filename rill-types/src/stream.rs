//! Streaming event types for incremental endpoint responses.

use std::pin::Pin;

use futures::Stream;

use crate::error::TransportError;

/// One decoded unit from the transport stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental fragment of the assistant's reply text.
    ///
    /// May be empty — an empty delta is a valid no-op event, not an
    /// error, and still counts as progress for observers.
    Delta(String),
    /// The terminal sentinel: no further deltas will arrive.
    Done,
    /// A payload that could not be decoded. Skipped, never fatal.
    Malformed,
}

/// Handle to a streaming endpoint response.
///
/// The stream is lazy, finite, and non-restartable. It owns the
/// underlying connection: dropping the handle — on completion, early
/// `break`, or error — releases it.
pub struct StreamHandle {
    /// The event sequence. Consume with `StreamExt::next()`.
    pub events: Pin<Box<dyn Stream<Item = Result<StreamEvent, TransportError>> + Send>>,
}

impl StreamHandle {
    /// Wrap an already-pinned event stream.
    pub fn new(
        events: impl Stream<Item = Result<StreamEvent, TransportError>> + Send + 'static,
    ) -> Self {
        Self {
            events: Box::pin(events),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}
