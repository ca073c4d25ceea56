//! Inbound event normalization.
//!
//! This crate turns any supported platform event into one `InternalEvent`:
//! - `InboundEvent` - Closed set of recognised event shapes
//! - `normalize` - Shape detection plus normalization in one call
//! - `Normalized` - Either a request or a warmer short-circuit
//!
//! # Example
//!
//! ```ignore
//! use adapter_event::{normalize, Normalized};
//!
//! match normalize(raw_event)? {
//!     Normalized::Warmer => return Ok(BufferedResult::warmer()),
//!     Normalized::Request(event) => handle(event).await,
//! }
//! ```

mod normalize;
mod shapes;

pub use normalize::*;
pub use shapes::*;
