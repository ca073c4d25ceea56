//! The rendering framework behind the adapter.

use adapter_core::InternalEvent;
use adapter_streaming::{ResponseSink, SinkError};
use async_trait::async_trait;

/// Errors a framework reports back to the adapter.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("render failed: {0}")]
    Render(String),
}

/// A server-side rendering framework.
///
/// The framework writes its response into the sink. It may call `end()`
/// itself; if it returns without doing so the adapter ends the sink.
#[async_trait]
pub trait Framework: Send + Sync {
    async fn handle(
        &self,
        event: &InternalEvent,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), FrameworkError>;
}
