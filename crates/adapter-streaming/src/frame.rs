//! Frames carried by the streaming output channel.

use adapter_core::Headers;
use serde::{Deserialize, Serialize};

/// Committed status line and headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHead {
    pub status_code: u16,
    pub headers: Headers,
    /// `set-cookie` values, one per cookie.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
}

/// One unit on the streaming channel.
///
/// A well-formed stream is one `Head` followed by zero or more `Chunk`s,
/// then the channel is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Head(ResponseHead),
    Chunk(Vec<u8>),
}

impl StreamFrame {
    pub fn is_head(&self) -> bool {
        matches!(self, Self::Head(_))
    }

    /// Body bytes, if this is a chunk.
    pub fn as_chunk(&self) -> Option<&[u8]> {
        match self {
            Self::Chunk(bytes) => Some(bytes),
            Self::Head(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_wire_shape() {
        let head = ResponseHead {
            status_code: 200,
            headers: Headers::new().with("content-type", "text/html"),
            cookies: Vec::new(),
        };
        let value = serde_json::to_value(&head).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["headers"]["content-type"], "text/html");
        assert!(value.get("cookies").is_none());
    }

    #[test]
    fn test_chunk_accessors() {
        let chunk = StreamFrame::Chunk(b"abc".to_vec());
        assert!(!chunk.is_head());
        assert_eq!(chunk.as_chunk(), Some(&b"abc"[..]));
    }
}
