//! Canonical request produced by event normalization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::headers::Headers;

/// Query string parameters. Keys are unique; order is irrelevant.
pub type QueryParams = HashMap<String, String>;

/// Header carrying the client-facing host.
pub const FORWARDED_HOST: &str = "x-forwarded-host";

/// Shape of the inbound event an `InternalEvent` was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    /// REST-style gateway payload (`httpMethod`, `path`).
    GatewayV1,
    /// HTTP-style gateway payload (`rawPath`, `requestContext.http`).
    GatewayV2,
    /// CDN edge request record (`Records[0].cf.request`).
    EdgeRequest,
}

impl EventSource {
    /// Get the name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GatewayV1 => "gateway-v1",
            Self::GatewayV2 => "gateway-v2",
            Self::EdgeRequest => "edge-request",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Canonical request consumed by the framework and the image service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalEvent {
    /// Originating event shape.
    pub source: EventSource,
    /// HTTP method, uppercase.
    pub method: String,
    /// Request path without query string.
    pub raw_path: String,
    /// Query parameters. Empty when the event carried none.
    pub query: QueryParams,
    /// Headers with lowercase keys.
    pub headers: Headers,
    /// Cookies as `name=value` pairs.
    pub cookies: Vec<String>,
    /// Decoded request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
    /// Client address reported by the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    /// Host the platform routed to, kept when `x-forwarded-host` replaced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_host: Option<String>,
}

impl InternalEvent {
    /// Create a bodiless event with no headers or query parameters.
    pub fn new(source: EventSource, method: impl Into<String>, raw_path: impl Into<String>) -> Self {
        Self {
            source,
            method: method.into().to_ascii_uppercase(),
            raw_path: raw_path.into(),
            query: QueryParams::new(),
            headers: Headers::new(),
            cookies: Vec::new(),
            body: None,
            remote_address: None,
            internal_host: None,
        }
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Canonical host the framework should see.
    pub fn host(&self) -> Option<&str> {
        self.headers.get("host")
    }

    /// Replace `host` with `x-forwarded-host` when the latter is present.
    ///
    /// This is the only mutation permitted after normalization. The replaced
    /// host is kept in `internal_host`.
    pub fn apply_forwarded_host(&mut self) -> bool {
        match self.headers.get(FORWARDED_HOST).map(str::to_string) {
            Some(forwarded) => {
                self.internal_host = self.headers.insert("host", forwarded);
                true
            }
            None => false,
        }
    }

    /// Client-facing host when it differs from the routed host.
    pub fn external_host(&self) -> Option<&str> {
        self.internal_host.as_ref().and_then(|_| self.host())
    }

    /// Path plus query string, with keys in sorted order.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.raw_path.clone();
        }
        let mut pairs: Vec<(&String, &String)> = self.query.iter().collect();
        pairs.sort();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        format!("{}?{}", self.raw_path, query)
    }

    /// Body as UTF-8 text, if present and valid.
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}
