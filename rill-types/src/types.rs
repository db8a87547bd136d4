//! Conversation turn types and the endpoint request/reply shapes.

use serde::{Deserialize, Serialize};

/// Role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human user.
    User,
    /// The model.
    Assistant,
}

/// One role-tagged message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Author of this turn.
    pub role: Role,
    /// Text content. The in-flight assistant turn grows incrementally;
    /// every other turn is immutable once its exchange completed.
    pub content: String,
}

impl Turn {
    /// A user turn with the given content.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant turn with the given content.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One completed user/assistant exchange, in history order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePair {
    /// What the user said.
    pub user: String,
    /// What the assistant replied.
    pub assistant: String,
}

/// Request handed to an [`Endpoint`](crate::Endpoint).
///
/// The endpoint owns model selection and sampling knobs; the engine
/// only supplies the conversation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Completed exchanges, oldest first. Excludes the exchange in flight.
    pub history: Vec<ExchangePair>,
    /// The user text opening the new exchange.
    pub next_user_text: String,
}

/// A complete (non-streaming) reply from an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The assistant's full reply text.
    pub text: String,
}

/// Observable state of a [`ConversationEngine`] exchange.
///
/// `Completed`, `Failed`, and `Cancelled` are terminal for an exchange;
/// a new `submit` starts again from there.
///
/// [`ConversationEngine`]: https://docs.rs/rill-engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No exchange has started yet.
    Idle,
    /// Request sent; no event received yet.
    AwaitingFirstByte,
    /// At least one stream event has arrived.
    Streaming,
    /// The stream finished normally.
    Completed,
    /// The exchange failed; the assistant turn holds the error message.
    Failed,
    /// The exchange was cancelled; partial content is kept.
    Cancelled,
}

impl EngineState {
    /// Whether an exchange is currently in flight.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::AwaitingFirstByte | Self::Streaming)
    }
}
