#![doc = include_str!("../README.md")]

pub mod endpoint;
pub mod error;
pub mod stream;
pub mod types;

pub use endpoint::*;
pub use error::*;
pub use stream::*;
pub use types::*;
