#![deny(missing_docs)]
//! Conversation state for the rill engine.
//!
//! A [`Conversation`] is an append-only sequence of [`Turn`]s that
//! strictly alternates user/assistant. The engine is the only caller
//! of the mutation operations; everything else observes snapshots.

use serde::{Deserialize, Serialize};

use rill_types::{ExchangePair, Role, StateError, Turn};

/// An ordered sequence of turns, insertion order = chronological order.
///
/// Invariant: turns strictly alternate `user, assistant, user,
/// assistant, …`. After an exchange completes the sequence always ends
/// on an assistant turn. The in-flight assistant turn is the one
/// mutable element — appended to only, never replaced wholesale except
/// to inject an error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// An empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The final turn, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Open a new exchange: append the user turn and an empty assistant
    /// placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::ExchangeInFlight`] if the last existing
    /// turn is not an assistant turn. The conversation is unchanged on
    /// error.
    pub fn begin_exchange(&mut self, user_text: impl Into<String>) -> Result<(), StateError> {
        if let Some(turn) = self.turns.last()
            && turn.role != Role::Assistant
        {
            return Err(StateError::ExchangeInFlight);
        }
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(""));
        Ok(())
    }

    /// Append `delta_text` to the in-flight assistant turn.
    ///
    /// An empty delta is a valid no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoAssistantTurn`] if the final turn's role
    /// is not assistant.
    pub fn extend_last_assistant(&mut self, delta_text: &str) -> Result<(), StateError> {
        let turn = self.last_assistant_mut()?;
        turn.content.push_str(delta_text);
        Ok(())
    }

    /// Replace the final assistant turn's content wholesale.
    ///
    /// Used only for error-message injection, never for normal deltas.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoAssistantTurn`] if the final turn's role
    /// is not assistant.
    pub fn overwrite_last_assistant(
        &mut self,
        full_text: impl Into<String>,
    ) -> Result<(), StateError> {
        let turn = self.last_assistant_mut()?;
        turn.content = full_text.into();
        Ok(())
    }

    /// The exchanges as `(user, assistant)` pairs, oldest first — the
    /// history format endpoints consume.
    ///
    /// Pairs are formed from the turn sequence as it stands: while an
    /// exchange is open, the trailing pair holds the partial assistant
    /// text streamed so far. The engine snapshots history *before*
    /// opening a new exchange, which is why the in-flight pair never
    /// reaches a request.
    #[must_use]
    pub fn to_exchange_pairs(&self) -> Vec<ExchangePair> {
        self.turns
            .chunks_exact(2)
            .filter_map(|pair| match (&pair[0], &pair[1]) {
                (user, assistant)
                    if user.role == Role::User && assistant.role == Role::Assistant =>
                {
                    Some(ExchangePair {
                        user: user.content.clone(),
                        assistant: assistant.content.clone(),
                    })
                }
                _ => None,
            })
            .collect()
    }

    fn last_assistant_mut(&mut self) -> Result<&mut Turn, StateError> {
        match self.turns.last_mut() {
            Some(turn) if turn.role == Role::Assistant => Ok(turn),
            _ => Err(StateError::NoAssistantTurn),
        }
    }
}
