//! Invocation spans.

use adapter_core::RequestId;
use tracing::{info_span, Span};

/// Span wrapping one invocation. Events logged inside inherit its fields.
pub fn invocation_span(request_id: &RequestId, method: &str, path: &str) -> Span {
    info_span!(
        "invocation",
        request_id = %request_id,
        method = %method,
        path = %path,
    )
}
