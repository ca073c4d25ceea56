//! Observability for the serverless SSR adapter.
//!
//! This crate provides:
//! - `LogConfig` / `init_logging` - `tracing-subscriber` setup with env filtering
//! - `LogFormat` - JSON for log aggregation, human-readable for development
//! - `invocation_span` - Span carrying request id, method and path

mod logging;
mod span;

pub use logging::*;
pub use span::*;
