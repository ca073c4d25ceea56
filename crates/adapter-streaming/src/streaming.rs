//! Streaming response sink.

use std::fmt::Display;

use adapter_cache::{header_names, HeaderPipeline};
use adapter_core::{Headers, ResponsePhase, TimingContext};
use async_trait::async_trait;
use futures::{Sink, SinkExt};
use tracing::{debug, error, warn};

use crate::error::SinkError;
use crate::frame::{ResponseHead, StreamFrame};
use crate::sink::ResponseSink;
use crate::state::ResponseState;

/// Sink that forwards the response incrementally over a frame channel.
///
/// Headers are rewritten and committed as a `Head` frame on the first write,
/// or at `end()` when there is no body. Every chunk is awaited on the
/// channel, so backpressure reaches the writer. Once the channel fails the
/// sink is `Errored` and further writes are dropped.
pub struct StreamingSink<C>
where
    C: Sink<StreamFrame> + Unpin + Send,
    C::Error: Display,
{
    inner: C,
    state: ResponseState,
    pipeline: Option<HeaderPipeline>,
    timing: TimingContext,
    chunks_sent: usize,
}

impl<C> StreamingSink<C>
where
    C: Sink<StreamFrame> + Unpin + Send,
    C::Error: Display,
{
    /// Create a streaming sink without header rewriting.
    pub fn new(channel: C) -> Self {
        Self {
            inner: channel,
            state: ResponseState::new(),
            pipeline: None,
            timing: TimingContext::new(),
            chunks_sent: 0,
        }
    }

    /// Create a streaming sink that rewrites headers once before commit.
    pub fn with_pipeline(channel: C, pipeline: HeaderPipeline) -> Self {
        Self {
            pipeline: Some(pipeline),
            ..Self::new(channel)
        }
    }

    /// Number of body chunks forwarded.
    pub fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }

    /// Get timing context reference.
    pub fn timing(&self) -> &TimingContext {
        &self.timing
    }

    /// Consume the sink and return the channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        let status = self.state.begin_write()?;

        let staged = self.state.headers().clone();
        let headers = match self.pipeline.take() {
            Some(pipeline) => pipeline.apply(staged),
            None => staged,
        };
        self.state.replace_headers(headers.clone());
        self.state.commit();

        let head = ResponseHead {
            status_code: status.as_u16(),
            headers,
            cookies: self.state.cookies().to_vec(),
        };
        self.timing.mark("commit");
        self.send(StreamFrame::Head(head)).await?;
        debug!(status = status.as_u16(), "response headers committed");
        Ok(())
    }

    async fn send(&mut self, frame: StreamFrame) -> Result<(), SinkError> {
        match self.inner.send(frame).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.fail();
                error!(error = %e, chunks_sent = self.chunks_sent, "output channel failed");
                Err(SinkError::Channel(e.to_string()))
            }
        }
    }

    async fn close_channel(&mut self) {
        if let Err(e) = self.inner.close().await {
            self.state.fail();
            warn!(error = %e, "output channel failed to close");
        }
    }
}

#[async_trait]
impl<C> ResponseSink for StreamingSink<C>
where
    C: Sink<StreamFrame> + Unpin + Send,
    C::Error: Display,
{
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
        if self.state.phase() == ResponsePhase::Errored {
            return Ok(());
        }
        if !self.state.phase().is_committed() {
            self.commit().await?;
        } else {
            self.state.begin_write()?;
        }
        if chunk.is_empty() {
            return Ok(());
        }

        self.send(StreamFrame::Chunk(chunk.to_vec())).await?;
        self.chunks_sent += 1;
        Ok(())
    }

    async fn end(&mut self) -> Result<(), SinkError> {
        match self.state.phase() {
            ResponsePhase::Errored => return Ok(()),
            ResponsePhase::Closed => return Err(SinkError::Closed),
            phase if !phase.is_committed() => self.commit().await?,
            _ => {}
        }

        self.close_channel().await;
        self.state.close();
        self.timing.mark("end");
        debug!(
            chunks_sent = self.chunks_sent,
            elapsed_ms = self.timing.elapsed().as_millis() as u64,
            "response stream closed"
        );
        Ok(())
    }

    async fn abort(&mut self, message: &str) {
        let phase = self.state.phase();
        if phase.is_terminal() {
            return;
        }

        if !phase.is_committed() {
            self.pipeline = None;
            let head = ResponseHead {
                status_code: 500,
                headers: Headers::new().with(header_names::CONTENT_TYPE, "text/plain"),
                cookies: Vec::new(),
            };
            self.state.commit();
            if self.send(StreamFrame::Head(head)).await.is_ok() {
                let _ = self.send(StreamFrame::Chunk(message.as_bytes().to_vec())).await;
            }
        } else {
            warn!(error = message, "aborting response after commit");
        }

        self.close_channel().await;
        self.state.close();
    }

    fn phase(&self) -> ResponsePhase {
        self.state.phase()
    }

    fn headers(&self) -> &Headers {
        self.state.headers()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use adapter_cache::{CachePolicies, RewriteContext};
    use futures::channel::mpsc;
    use futures::StreamExt;

    use super::*;

    fn pipeline(path: &str) -> HeaderPipeline {
        HeaderPipeline::standard(RewriteContext::new(path, Arc::new(CachePolicies::default())))
    }

    async fn drain(rx: mpsc::UnboundedReceiver<StreamFrame>) -> Vec<StreamFrame> {
        rx.collect().await
    }

    // === Commit Tests ===

    #[tokio::test]
    async fn test_head_then_chunks_in_order() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        sink.set_status(200).unwrap();
        sink.set_header("content-type", "text/html").unwrap();
        sink.write(b"<p>").await.unwrap();
        sink.write(b"hi").await.unwrap();
        sink.write(b"</p>").await.unwrap();
        sink.end().await.unwrap();

        let frames = drain(rx).await;
        assert_eq!(frames.len(), 4);
        assert!(frames[0].is_head());
        let body: Vec<u8> = frames[1..]
            .iter()
            .filter_map(|f| f.as_chunk())
            .flatten()
            .copied()
            .collect();
        assert_eq!(body, b"<p>hi</p>");
        assert_eq!(sink.chunks_sent(), 3);
    }

    #[tokio::test]
    async fn test_end_without_body_sends_head() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        sink.set_status(304).unwrap();
        sink.end().await.unwrap();

        let frames = drain(rx).await;
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            StreamFrame::Head(head) => assert_eq!(head.status_code, 304),
            other => panic!("expected head, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pipeline_applied_once_before_commit() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::with_pipeline(tx, pipeline("/blog"));
        sink.set_status(200).unwrap();
        sink.set_header("cache-control", "s-maxage=5, stale-while-revalidate").unwrap();
        sink.append_header("set-cookie", "session=1").unwrap();
        sink.write(b"a").await.unwrap();
        sink.write(b"b").await.unwrap();
        sink.end().await.unwrap();

        let frames = drain(rx).await;
        let heads: Vec<&ResponseHead> = frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::Head(head) => Some(head),
                StreamFrame::Chunk(_) => None,
            })
            .collect();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].headers.get("x-ssr-adapter"), Some("1"));
        assert_eq!(
            heads[0].headers.get("cache-control"),
            Some("s-maxage=5, stale-while-revalidate=2592000")
        );
        assert_eq!(heads[0].cookies, vec!["session=1".to_string()]);
        assert_eq!(sink.headers().get("x-ssr-adapter"), Some("1"));
    }

    // === Contract Tests ===

    #[tokio::test]
    async fn test_write_before_status() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        assert!(matches!(sink.write(b"x").await, Err(SinkError::StatusNotSet)));
        drop(sink);
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_header_after_commit_rejected() {
        let (tx, _rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        sink.set_status(200).unwrap();
        sink.write(b"x").await.unwrap();
        assert!(matches!(
            sink.set_header("x-late", "1"),
            Err(SinkError::HeadersCommitted)
        ));
        assert_eq!(sink.phase(), ResponsePhase::Streaming);
    }

    #[tokio::test]
    async fn test_write_after_end() {
        let (tx, _rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        sink.set_status(200).unwrap();
        sink.end().await.unwrap();
        assert!(matches!(sink.write(b"x").await, Err(SinkError::Closed)));
        assert!(matches!(sink.end().await, Err(SinkError::Closed)));
    }

    // === Channel Failure Tests ===

    #[tokio::test]
    async fn test_channel_failure_is_terminal() {
        let (tx, rx) = mpsc::unbounded();
        drop(rx);
        let mut sink = StreamingSink::new(tx);
        sink.set_status(200).unwrap();

        assert!(matches!(sink.write(b"x").await, Err(SinkError::Channel(_))));
        assert_eq!(sink.phase(), ResponsePhase::Errored);

        // Later writes and end are silently dropped.
        assert!(sink.write(b"y").await.is_ok());
        assert!(sink.end().await.is_ok());
        assert_eq!(sink.chunks_sent(), 0);
    }

    #[tokio::test]
    async fn test_bounded_channel_backpressure() {
        let (tx, mut rx) = mpsc::channel(1);
        let writer = tokio::spawn(async move {
            let mut sink = StreamingSink::new(tx);
            sink.set_status(200).unwrap();
            for i in 0..5u8 {
                sink.write(&[i]).await.unwrap();
            }
            sink.end().await.unwrap();
            sink.chunks_sent()
        });

        let mut chunks = Vec::new();
        while let Some(frame) = rx.next().await {
            if let StreamFrame::Chunk(bytes) = frame {
                chunks.extend(bytes);
            }
        }
        assert_eq!(writer.await.unwrap(), 5);
        assert_eq!(chunks, vec![0, 1, 2, 3, 4]);
    }

    // === Abort Tests ===

    #[tokio::test]
    async fn test_abort_before_commit_sends_error_frame() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::with_pipeline(tx, pipeline("/"));
        sink.set_status(200).unwrap();
        sink.abort("framework failed").await;

        let frames = drain(rx).await;
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            StreamFrame::Head(head) => {
                assert_eq!(head.status_code, 500);
                assert_eq!(head.headers.get("content-type"), Some("text/plain"));
            }
            other => panic!("expected head, got {:?}", other),
        }
        assert_eq!(frames[1].as_chunk(), Some(&b"framework failed"[..]));
        assert_eq!(sink.phase(), ResponsePhase::Closed);
    }

    #[tokio::test]
    async fn test_abort_after_commit_closes() {
        let (tx, rx) = mpsc::unbounded();
        let mut sink = StreamingSink::new(tx);
        sink.set_status(200).unwrap();
        sink.write(b"partial").await.unwrap();
        sink.abort("late failure").await;

        let frames = drain(rx).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_chunk(), Some(&b"partial"[..]));
    }
}
