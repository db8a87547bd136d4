#![deny(missing_docs)]
//! The conversation engine state machine.
//!
//! [`ConversationEngine`] owns a [`Conversation`](rill_conversation::Conversation)
//! and drives one exchange at a time against an
//! [`Endpoint`](rill_types::Endpoint): append the user turn, open the
//! stream, apply deltas in arrival order, notify observers, and settle
//! in `Completed`, `Failed`, or `Cancelled`.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{ConversationEngine, ConversationUpdate};
