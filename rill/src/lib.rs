#![deny(missing_docs)]
//! # rill — umbrella crate
//!
//! Provides a single import surface for the rill workspace. Re-exports the
//! protocol types and key implementations behind feature flags, plus a
//! `prelude` for the happy path.

#[cfg(feature = "core")]
pub use rill_conversation;
#[cfg(feature = "endpoint-siliconflow")]
pub use rill_endpoint_siliconflow;
#[cfg(feature = "engine")]
pub use rill_engine;
#[cfg(feature = "core")]
pub use rill_types;

/// Happy-path imports for driving a streamed conversation.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use rill_types::{
        ChatReply, ChatRequest, Endpoint, EngineError, EngineState, ExchangePair, Role,
        StateError, StreamEvent, StreamHandle, TransportError, Turn,
    };

    #[cfg(feature = "core")]
    pub use rill_conversation::Conversation;

    #[cfg(feature = "engine")]
    pub use rill_engine::{ConversationEngine, ConversationUpdate, EngineConfig};

    #[cfg(feature = "endpoint-siliconflow")]
    pub use rill_endpoint_siliconflow::SiliconFlow;
}
