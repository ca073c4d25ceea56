//! Response sinks for buffered and streaming delivery.
//!
//! Framework code writes through the `ResponseSink` trait and never learns
//! which delivery mode is active:
//! - `BufferedSink` - Accumulates the whole response into a `BufferedResult`
//! - `StreamingSink` - Commits headers on first write and forwards chunks
//! - `StreamFrame` - Wire unit of the streaming channel
//!
//! Both sinks run the header rewrite pipeline exactly once before commit.

mod binary;
mod buffered;
mod error;
mod frame;
mod sink;
mod state;
mod streaming;

pub use binary::*;
pub use buffered::*;
pub use error::*;
pub use frame::*;
pub use sink::*;
pub use state::*;
pub use streaming::*;
