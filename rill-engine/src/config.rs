//! Configuration for the conversation engine.

use std::time::Duration;

/// Configuration for a [`ConversationEngine`](crate::ConversationEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether to stream replies. When `false`, the endpoint's
    /// single-shot path is used and the full reply is driven through
    /// the engine as one delta followed by done.
    pub streaming: bool,
    /// Maximum time to wait for the stream to open and between
    /// consecutive events. Exceeding it fails the exchange.
    pub idle_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            idle_timeout: Duration::from_secs(60),
        }
    }
}
