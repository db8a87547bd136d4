//! The inference-endpoint trait.
//!
//! The [`Endpoint`] trait uses RPITIT (return-position `impl Trait` in
//! traits) and is intentionally NOT object-safe: the engine is generic
//! (`ConversationEngine<E: Endpoint>`), so there is no dyn boundary to
//! cross.

use std::future::Future;

use crate::error::TransportError;
use crate::stream::StreamHandle;
use crate::types::{ChatReply, ChatRequest};

/// An inference endpoint: accepts a request and returns either a
/// complete reply or a stream of incremental text fragments.
///
/// Implementations hold their own credentials, model selection, and
/// sampling configuration; engines receive an endpoint handle at
/// construction and never touch process-wide state.
pub trait Endpoint: Send + Sync {
    /// Send a request and wait for the complete reply.
    fn complete(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, TransportError>> + Send;

    /// Send a request and open an event stream over the reply.
    ///
    /// The returned handle holds the connection open for the duration
    /// of iteration and releases it on drop.
    fn complete_stream(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<StreamHandle, TransportError>> + Send;
}
