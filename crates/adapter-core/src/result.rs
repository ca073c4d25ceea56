//! Buffered-mode result object.

use serde::{Deserialize, Serialize};

use crate::headers::Headers;

/// The single result object returned to the platform in buffered mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: Headers,
    /// `set-cookie` values, one per cookie.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    /// Response body, base64 when `is_base64_encoded` is set.
    #[serde(default)]
    pub body: String,
    /// Whether `body` is base64.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl BufferedResult {
    /// Create a text result.
    pub fn text(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: Headers::new(),
            cookies: Vec::new(),
            body: body.into(),
            is_base64_encoded: false,
        }
    }

    /// Fixed answer for warmer pings.
    pub fn warmer() -> Self {
        Self::text(200, "OK")
    }

    /// Generic failure result for errors that happen before a response exists.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::text(500, message).with_header("content-type", "text/plain")
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Check if the result is successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
