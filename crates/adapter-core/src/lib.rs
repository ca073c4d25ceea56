//! Core types for the serverless SSR adapter.
//!
//! This crate provides the shared vocabulary of the adapter:
//! - `InternalEvent` - Canonical request produced from any inbound event
//! - `Headers` - Lowercase-keyed header mapping
//! - `BufferedResult` - Result object returned in buffered mode
//! - `ResponsePhase` - Response lifecycle tracking
//! - `ResponseMode` - Buffered vs streaming selection

mod context;
mod event;
mod headers;
mod lifecycle;
mod mode;
mod result;

pub use context::*;
pub use event::*;
pub use headers::*;
pub use lifecycle::*;
pub use mode::*;
pub use result::*;
