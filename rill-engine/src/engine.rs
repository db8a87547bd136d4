//! Core ConversationEngine struct and the exchange drive loop.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rill_conversation::Conversation;
use rill_types::{
    ChatRequest, Endpoint, EngineError, EngineState, StateError, StreamEvent, TransportError,
};

use crate::config::EngineConfig;

/// The event sequence an exchange is driven from.
type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, TransportError>> + Send>>;

/// Outcome of racing a cancellable, deadlined wait. Resolved to a
/// value before the engine mutates itself, since the pending futures
/// may borrow from it.
enum Wait<T> {
    Cancelled,
    TimedOut,
    Failed(TransportError),
    Ready(T),
}

impl<T> Wait<T> {
    fn from_timeout(
        res: Result<Result<T, TransportError>, tokio::time::error::Elapsed>,
    ) -> Self {
        match res {
            Err(_elapsed) => Wait::TimedOut,
            Ok(Err(e)) => Wait::Failed(e),
            Ok(Ok(value)) => Wait::Ready(value),
        }
    }
}

/// A snapshot pushed to observers after every observable change:
/// state transitions and every applied delta, empty ones included.
#[derive(Debug, Clone)]
pub struct ConversationUpdate {
    /// Engine state at the time of the snapshot.
    pub state: EngineState,
    /// The conversation, including the in-flight assistant turn.
    pub conversation: Conversation,
}

/// Drives one conversation against an inference endpoint.
///
/// Generic over `E: Endpoint` — the endpoint handle is injected at
/// construction, so there is no process-wide client state. The engine
/// exclusively owns and mutates its [`Conversation`]; observers only
/// ever see cloned snapshots.
///
/// `submit` takes `&mut self`, so a second exchange cannot start while
/// one is in flight.
pub struct ConversationEngine<E: Endpoint> {
    endpoint: E,
    conversation: Conversation,
    state: EngineState,
    config: EngineConfig,
    cancel: CancellationToken,
    observers: Vec<mpsc::UnboundedSender<ConversationUpdate>>,
}

impl<E: Endpoint> ConversationEngine<E> {
    /// Create an engine over the given endpoint.
    #[must_use]
    pub fn new(endpoint: E, config: EngineConfig) -> Self {
        Self {
            endpoint,
            conversation: Conversation::new(),
            state: EngineState::Idle,
            config,
            cancel: CancellationToken::new(),
            observers: Vec::new(),
        }
    }

    /// Current engine state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The conversation as it stands, in-flight assistant turn included.
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Register an observer. Every state transition and every applied
    /// delta produces one [`ConversationUpdate`] on the channel.
    /// Dropped receivers are pruned on the next send.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConversationUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Token that cancels the exchange in flight.
    ///
    /// A token covers one exchange: once cancelled it is replaced on
    /// the next `submit`, so acquire a fresh handle per exchange.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the exchange in flight, if any.
    ///
    /// Cancellation is cooperative: the drive loop observes the token
    /// at its next suspension point, releases the connection, keeps
    /// whatever partial content was already streamed, and settles in
    /// `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run one exchange to a terminal state.
    ///
    /// Appends the user turn plus an empty assistant placeholder,
    /// opens the stream with the history of *completed* exchanges, and
    /// drives events until `Done`, failure, or cancellation. The
    /// returned state is `Completed`, `Failed`, or `Cancelled` —
    /// transport failures are absorbed into a visible error turn and
    /// never surface as `Err` here.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyInput`] if `user_text` is blank, and
    /// [`EngineError::InvalidState`] if an exchange is already open.
    /// Neither mutates the conversation.
    pub async fn submit(&mut self, user_text: &str) -> Result<EngineState, EngineError> {
        if user_text.trim().is_empty() {
            return Err(EngineError::EmptyInput);
        }
        if self.state.is_in_flight() {
            return Err(EngineError::InvalidState(StateError::ExchangeInFlight));
        }
        // A token is consumed by one cancellation.
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        // History must not include the pair we are about to open.
        let history = self.conversation.to_exchange_pairs();
        self.conversation.begin_exchange(user_text)?;
        self.set_state(EngineState::AwaitingFirstByte);

        let request = ChatRequest {
            history,
            next_user_text: user_text.to_string(),
        };
        tracing::debug!(
            history_len = request.history.len(),
            streaming = self.config.streaming,
            "submitting exchange"
        );

        let final_state = if self.config.streaming {
            self.drive_streaming(request).await
        } else {
            self.drive_single_shot(request).await
        };
        Ok(final_state)
    }

    /// Open the event stream and drive it.
    async fn drive_streaming(&mut self, request: ChatRequest) -> EngineState {
        let cancel = self.cancel.clone();
        let idle = self.config.idle_timeout;

        // Bind the outcome first: the select arms must not touch
        // `self`, which the open future borrows.
        let opened = tokio::select! {
            () = cancel.cancelled() => Wait::Cancelled,
            res = tokio::time::timeout(idle, self.endpoint.complete_stream(request)) => {
                Wait::from_timeout(res)
            }
        };
        let handle = match opened {
            Wait::Cancelled => return self.finish_cancelled(),
            Wait::TimedOut => return self.fail(&TransportError::Timeout(idle)),
            Wait::Failed(e) => return self.fail(&e),
            Wait::Ready(handle) => handle,
        };
        self.drive_events(handle.events).await
    }

    /// The degenerate case: fetch the whole reply, then drive it
    /// through the same loop as one delta followed by done.
    async fn drive_single_shot(&mut self, request: ChatRequest) -> EngineState {
        let cancel = self.cancel.clone();
        let idle = self.config.idle_timeout;

        let replied = tokio::select! {
            () = cancel.cancelled() => Wait::Cancelled,
            res = tokio::time::timeout(idle, self.endpoint.complete(request)) => {
                Wait::from_timeout(res)
            }
        };
        let reply = match replied {
            Wait::Cancelled => return self.finish_cancelled(),
            Wait::TimedOut => return self.fail(&TransportError::Timeout(idle)),
            Wait::Failed(e) => return self.fail(&e),
            Wait::Ready(reply) => reply,
        };

        let events = futures::stream::iter([
            Ok(StreamEvent::Delta(reply.text)),
            Ok(StreamEvent::Done),
        ]);
        self.drive_events(Box::pin(events)).await
    }

    /// Apply events in arrival order until a terminal state.
    async fn drive_events(&mut self, mut events: EventStream) -> EngineState {
        let cancel = self.cancel.clone();
        let idle = self.config.idle_timeout;
        let mut saw_delta = false;

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => Wait::Cancelled,
                item = tokio::time::timeout(idle, events.next()) => match item {
                    Err(_elapsed) => Wait::TimedOut,
                    Ok(item) => Wait::Ready(item),
                },
            };
            let item = match next {
                Wait::Cancelled => {
                    // Release the connection before observers learn of the cancel.
                    drop(events);
                    return self.finish_cancelled();
                }
                Wait::TimedOut => return self.fail(&TransportError::Timeout(idle)),
                Wait::Failed(e) => return self.fail(&e),
                Wait::Ready(item) => item,
            };

            match item {
                None => {
                    // Connection closed without the sentinel: equivalent
                    // to done only if some content was streamed.
                    return if saw_delta {
                        self.finish_completed()
                    } else {
                        self.fail(&TransportError::Interrupted(
                            "connection closed before any content".into(),
                        ))
                    };
                }
                Some(Ok(event)) => {
                    if self.state == EngineState::AwaitingFirstByte {
                        self.set_state(EngineState::Streaming);
                    }
                    match event {
                        StreamEvent::Delta(text) => {
                            saw_delta = true;
                            if let Err(err) = self.conversation.extend_last_assistant(&text) {
                                return self.fail(&err);
                            }
                            self.notify();
                        }
                        StreamEvent::Malformed => {
                            tracing::trace!("skipping malformed stream event");
                        }
                        StreamEvent::Done => return self.finish_completed(),
                    }
                }
                Some(Err(e)) => return self.fail(&e),
            }
        }
    }

    fn finish_completed(&mut self) -> EngineState {
        let reply_len = self.conversation.last().map_or(0, |t| t.content.len());
        tracing::info!(reply_len, "exchange completed");
        self.set_state(EngineState::Completed);
        EngineState::Completed
    }

    fn finish_cancelled(&mut self) -> EngineState {
        tracing::debug!("exchange cancelled, partial content kept");
        self.set_state(EngineState::Cancelled);
        EngineState::Cancelled
    }

    /// Record a failure: the in-flight assistant turn becomes a
    /// readable error message carrying the cause, never a backtrace.
    fn fail(&mut self, cause: &dyn std::fmt::Display) -> EngineState {
        let message = format!("system error: {cause}");
        tracing::warn!(%message, "exchange failed");
        if let Err(err) = self.conversation.overwrite_last_assistant(message) {
            tracing::error!(%err, "could not record the error turn");
        }
        self.set_state(EngineState::Failed);
        EngineState::Failed
    }

    fn set_state(&mut self, state: EngineState) {
        self.state = state;
        self.notify();
    }

    fn notify(&mut self) {
        let update = ConversationUpdate {
            state: self.state,
            conversation: self.conversation.clone(),
        };
        self.observers.retain(|tx| tx.send(update.clone()).is_ok());
    }
}
