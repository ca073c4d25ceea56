//! Sink errors.

use adapter_core::InvalidStatus;
use thiserror::Error;

/// Errors raised by response sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A body write was attempted before a status was assigned.
    #[error("status must be set before writing the body")]
    StatusNotSet,

    /// The response has already ended.
    #[error("response already ended")]
    Closed,

    /// Headers were mutated after they were committed.
    #[error("headers already committed")]
    HeadersCommitted,

    /// The result was requested before the response ended.
    #[error("response not ended")]
    NotEnded,

    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),

    /// The output channel rejected a frame.
    #[error("output channel error: {0}")]
    Channel(String),
}
