//! Image response shaping.

use adapter_cache::header_names;
use adapter_core::{BufferedResult, Headers};
use adapter_streaming::{requires_base64, ResponseSink, SinkError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ImageError;
use crate::service::OptimizedImage;

/// Cache lifetime of failed image responses, so clients retry after a minute.
pub const FAILURE_MAX_AGE_SECS: u64 = 60;

/// A shaped image response, deliverable in either mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ImageResponse {
    /// 200 with the optimized bytes.
    pub fn success(image: OptimizedImage) -> Self {
        Self {
            status_code: 200,
            headers: Self::base_headers(image.max_age, &image.content_type),
            body: image.bytes,
        }
    }

    /// 500 carrying the error message as plain text.
    pub fn failure(error: &ImageError) -> Self {
        Self {
            status_code: 500,
            headers: Self::base_headers(FAILURE_MAX_AGE_SECS, "text/plain"),
            body: error.to_string().into_bytes(),
        }
    }

    pub fn from_result(result: Result<OptimizedImage, ImageError>) -> Self {
        match result {
            Ok(image) => Self::success(image),
            Err(e) => Self::failure(&e),
        }
    }

    fn base_headers(max_age: u64, content_type: &str) -> Headers {
        Headers::new()
            .with(header_names::VARY, "Accept")
            .with(
                header_names::CACHE_CONTROL,
                format!("public,max-age={},immutable", max_age),
            )
            .with(header_names::CONTENT_TYPE, content_type)
    }

    /// Buffered-mode result. Image bodies are base64-encoded.
    pub fn into_buffered(self) -> BufferedResult {
        let binary = requires_base64(self.headers.get(header_names::CONTENT_TYPE), &self.body);
        let body = if binary {
            STANDARD.encode(&self.body)
        } else {
            String::from_utf8_lossy(&self.body).into_owned()
        };
        BufferedResult {
            status_code: self.status_code,
            headers: self.headers,
            cookies: Vec::new(),
            body,
            is_base64_encoded: binary,
        }
    }

    /// Write the response through a sink and end it.
    pub async fn send(self, sink: &mut dyn ResponseSink) -> Result<(), SinkError> {
        sink.set_status(self.status_code)?;
        for (name, value) in self.headers.iter() {
            sink.set_header(name, value)?;
        }
        if !self.body.is_empty() {
            sink.write(&self.body).await?;
        }
        sink.end().await
    }
}

#[cfg(test)]
mod tests {
    use adapter_streaming::{BufferedSink, StreamFrame, StreamingSink};
    use futures::channel::mpsc;
    use futures::StreamExt;

    use super::*;
    use crate::params::ImageRejection;

    fn image() -> OptimizedImage {
        OptimizedImage {
            bytes: vec![0x52, 0x49, 0x46, 0x46],
            content_type: "image/webp".to_string(),
            max_age: 3600,
        }
    }

    #[test]
    fn test_success_shape() {
        let response = ImageResponse::success(image());
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers.get("vary"), Some("Accept"));
        assert_eq!(
            response.headers.get("cache-control"),
            Some("public,max-age=3600,immutable")
        );
        assert_eq!(response.headers.get("content-type"), Some("image/webp"));
    }

    #[test]
    fn test_failure_shape() {
        let error = ImageError::from(ImageRejection::MissingUrl);
        let result = ImageResponse::failure(&error).into_buffered();
        assert_eq!(result.status_code, 500);
        assert_eq!(result.headers.get("cache-control"), Some("public,max-age=60,immutable"));
        assert_eq!(result.headers.get("content-type"), Some("text/plain"));
        assert_eq!(result.body, "\"url\" parameter is required");
        assert!(!result.is_base64_encoded);
    }

    #[test]
    fn test_buffered_success_is_base64() {
        let result = ImageResponse::success(image()).into_buffered();
        assert!(result.is_base64_encoded);
        assert_eq!(STANDARD.decode(result.body).unwrap(), vec![0x52, 0x49, 0x46, 0x46]);
    }

    #[tokio::test]
    async fn test_send_matches_buffered() {
        let mut sink = BufferedSink::new();
        ImageResponse::success(image()).send(&mut sink).await.unwrap();
        let sent = sink.into_result().unwrap();
        assert_eq!(sent, ImageResponse::success(image()).into_buffered());
    }

    #[tokio::test]
    async fn test_send_streaming() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        ImageResponse::success(image()).send(&mut sink).await.unwrap();

        let frames: Vec<StreamFrame> = rx.collect().await;
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            StreamFrame::Head(head) => {
                assert_eq!(head.status_code, 200);
                assert_eq!(head.headers.get("vary"), Some("Accept"));
            }
            other => panic!("expected head, got {:?}", other),
        }
        assert_eq!(frames[1].as_chunk(), Some(&[0x52, 0x49, 0x46, 0x46][..]));
    }
}
