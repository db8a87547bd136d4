//! Error types for all rill crates.

use std::time::Duration;

/// Errors from the transport layer (connection, HTTP, stream decode).
///
/// Malformed stream events are *not* errors — they are downgraded to
/// [`StreamEvent::Malformed`](crate::StreamEvent::Malformed) and
/// skipped, because partial chunks are expected on a healthy stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No bytes arrived within the configured window.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Network-level failure (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The credential was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by the endpoint (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The endpoint is temporarily unavailable (HTTP 5xx).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other non-success HTTP status.
    #[error("HTTP {code}: {body}")]
    Status {
        /// The HTTP status code.
        code: u16,
        /// The response body, verbatim.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The stream ended abnormally (closed before any content, or the
    /// endpoint reported an error mid-stream).
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

impl TransportError {
    /// Whether this failure is likely transient.
    ///
    /// rill itself never retries (the caller decides whether to
    /// resubmit); this is classification only.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Network(_)
                | Self::RateLimited(_)
                | Self::ServiceUnavailable(_)
        )
    }

    /// A user-facing remediation hint for this error kind, if one exists.
    ///
    /// Presentation of hints is a pure function of the variant — never
    /// of the error text.
    #[must_use]
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Authentication(_) => {
                Some("check that the API credential is set and has access to this model")
            }
            Self::RateLimited(_) => Some("wait before resubmitting"),
            _ => None,
        }
    }
}

/// Misuse of the conversation's turn ordering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// `begin_exchange` was called while an exchange is already open.
    #[error("cannot begin an exchange: the previous exchange is still open")]
    ExchangeInFlight,

    /// The final turn is not an assistant turn, so there is nothing to
    /// extend or overwrite.
    #[error("no assistant turn at the end of the conversation")]
    NoAssistantTurn,
}

/// Errors surfaced synchronously by the conversation engine.
///
/// Transport failures never appear here — the engine converts them
/// into a visible error turn and a `Failed` state instead, so the UI
/// always has something to display for the exchange that was in flight.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// `submit` was called with blank input. No request was made and
    /// the conversation is unchanged.
    #[error("empty input")]
    EmptyInput,

    /// The conversation or engine state does not permit the operation.
    #[error("invalid state: {0}")]
    InvalidState(#[from] StateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_mentions_timeout() {
        let err = TransportError::Timeout(Duration::from_secs(60));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn retryable_classification() {
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(TransportError::RateLimited("slow down".into()).is_retryable());
        assert!(TransportError::ServiceUnavailable("overloaded".into()).is_retryable());
        assert!(!TransportError::Authentication("bad key".into()).is_retryable());
        assert!(!TransportError::InvalidResponse("bad json".into()).is_retryable());
        assert!(!TransportError::Status { code: 404, body: String::new() }.is_retryable());
    }

    #[test]
    fn remediation_is_per_kind() {
        assert!(
            TransportError::Authentication("403".into())
                .remediation()
                .is_some()
        );
        assert!(
            TransportError::InvalidResponse("whatever 403".into())
                .remediation()
                .is_none()
        );
    }

    #[test]
    fn engine_error_from_state_error() {
        let err: EngineError = StateError::NoAssistantTurn.into();
        assert_eq!(err, EngineError::InvalidState(StateError::NoAssistantTurn));
        assert!(err.to_string().contains("no assistant turn"));
    }
}
