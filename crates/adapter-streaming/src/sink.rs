//! The response sink contract.

use adapter_core::{Headers, ResponsePhase};
use async_trait::async_trait;

use crate::error::SinkError;

/// Where framework response code writes its output.
///
/// A sink has a single writer; `&mut self` on every mutator enforces that.
/// `write` before a status is assigned fails with `StatusNotSet`; header
/// changes after commit fail with `HeadersCommitted`; anything after `end`
/// fails with `Closed`.
#[async_trait]
pub trait ResponseSink: Send {
    /// Assign the status code (100..=999).
    fn set_status(&mut self, code: u16) -> Result<(), SinkError>;

    /// Set a header, replacing any earlier value.
    fn set_header(&mut self, name: &str, value: &str) -> Result<(), SinkError>;

    /// Append a header value, used for repeated headers such as `set-cookie`.
    fn append_header(&mut self, name: &str, value: &str) -> Result<(), SinkError>;

    /// Write a body chunk.
    async fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError>;

    /// Finish the response.
    async fn end(&mut self) -> Result<(), SinkError>;

    /// Replace whatever was staged with a plain-text 500, or terminate the
    /// output if headers are already committed. Never fails.
    async fn abort(&mut self, message: &str);

    fn phase(&self) -> ResponsePhase;

    /// Current headers: staged before commit, rewritten after.
    fn headers(&self) -> &Headers;
}
