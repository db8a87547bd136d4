#![doc = include_str!("../README.md")]

pub mod client;
pub(crate) mod error;
pub(crate) mod mapping;
pub(crate) mod streaming;

pub use client::SiliconFlow;

// Re-export rill-types for convenience
pub use rill_types::{Endpoint, StreamEvent, StreamHandle, TransportError};
