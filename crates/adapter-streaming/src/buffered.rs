//! Buffered response sink.

use adapter_cache::{header_names, HeaderPipeline};
use adapter_core::{BufferedResult, Headers, ResponsePhase};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::binary::requires_base64;
use crate::error::SinkError;
use crate::sink::ResponseSink;
use crate::state::ResponseState;

/// Sink that accumulates the whole response and yields one `BufferedResult`.
///
/// Nothing leaves the sink before `end()`. The first write still freezes the
/// headers so both delivery modes reject the same late mutations.
#[derive(Debug, Default)]
pub struct BufferedSink {
    state: ResponseState,
    pipeline: Option<HeaderPipeline>,
    body: Vec<u8>,
    result: Option<BufferedResult>,
}

impl BufferedSink {
    /// Create a sink without header rewriting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that rewrites headers with `pipeline` at `end()`.
    pub fn with_pipeline(pipeline: HeaderPipeline) -> Self {
        Self {
            pipeline: Some(pipeline),
            ..Self::default()
        }
    }

    /// Bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Take the assembled result. Fails until the response has ended.
    pub fn into_result(self) -> Result<BufferedResult, SinkError> {
        self.result.ok_or(SinkError::NotEnded)
    }

    fn assemble(&self, status_code: u16, headers: Headers) -> BufferedResult {
        let binary = requires_base64(headers.get(header_names::CONTENT_TYPE), &self.body);
        let body = if binary {
            STANDARD.encode(&self.body)
        } else {
            String::from_utf8_lossy(&self.body).into_owned()
        };

        BufferedResult {
            status_code,
            headers,
            cookies: self.state.cookies().to_vec(),
            body,
            is_base64_encoded: binary,
        }
    }
}

#[async_trait]
impl ResponseSink for BufferedSink {
    fn set_status(&mut self, code: u16) -> Result<(), SinkError> {
        self.state.set_status(code)
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.state.set_header(name, value)
    }

    fn append_header(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.state.append_header(name, value)
    }

    async fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.state.begin_write()?;
        self.state.commit();
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    async fn end(&mut self) -> Result<(), SinkError> {
        let status = self.state.begin_write()?;

        let staged = self.state.headers().clone();
        let headers = match self.pipeline.take() {
            Some(pipeline) => pipeline.apply(staged),
            None => staged,
        };
        self.state.replace_headers(headers.clone());
        self.state.commit();
        self.state.close();

        let result = self.assemble(status.as_u16(), headers);
        debug!(
            status = result.status_code,
            bytes = self.body.len(),
            base64 = result.is_base64_encoded,
            "buffered response assembled"
        );
        self.result = Some(result);
        Ok(())
    }

    async fn abort(&mut self, message: &str) {
        self.pipeline = None;
        self.body.clear();
        self.state.close();
        self.result = Some(BufferedResult::internal_error(message));
    }

    fn phase(&self) -> ResponsePhase {
        self.state.phase()
    }

    fn headers(&self) -> &Headers {
        self.state.headers()
    }
}
