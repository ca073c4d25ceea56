//! Buffered and streaming entry points.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use adapter_cache::{header_names, CachePolicies, HeaderPipeline, RewriteContext};
use adapter_core::{BufferedResult, InternalEvent, RequestId, ResponseMode, ResponsePhase};
use adapter_event::{normalize, Normalized};
use adapter_image::{ContentStore, HttpRemoteFetcher, ImageOptimizer, ImageResponse};
use adapter_observability::invocation_span;
use adapter_revalidate::{HttpRevalidationDispatcher, RevalidationContext, RevalidationTrigger};
use adapter_streaming::{BufferedSink, ResponseSink, StreamFrame, StreamingSink};
use futures::Sink;
use serde_json::Value;
use tracing::{debug, error, info, Instrument};

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::framework::Framework;

/// Body sent to clients when an invocation fails before or during rendering.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// The adapter: one per process, shared read-only across invocations.
#[derive(Clone)]
pub struct Adapter {
    config: Arc<AdapterConfig>,
    policies: Arc<CachePolicies>,
    framework: Arc<dyn Framework>,
    images: ImageOptimizer,
    revalidation: Option<RevalidationTrigger>,
    mode: ResponseMode,
}

impl Adapter {
    /// Build an adapter with HTTP collaborators for remote images and
    /// regeneration. Regeneration is enabled only when a preview id is set.
    pub fn new(
        config: AdapterConfig,
        framework: Arc<dyn Framework>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let mut images = ImageOptimizer::new(
            Arc::new(config.images.clone()),
            store,
            Arc::new(HttpRemoteFetcher::new()),
        );
        if let Some(bucket) = &config.bucket_name {
            images = images.with_bucket(bucket.clone(), config.bucket_key_prefix.clone());
        }

        let revalidation = config.revalidation_preview_id.as_ref().map(|id| {
            RevalidationTrigger::new(Arc::new(HttpRevalidationDispatcher::new(id.clone())))
                .exclude_prefix(config.image_path.clone())
        });

        Self {
            policies: Arc::new(config.cache.clone()),
            config: Arc::new(config),
            framework,
            images,
            revalidation,
            mode: ResponseMode::from_env(),
        }
    }

    /// Replace the image optimizer.
    pub fn with_image_optimizer(mut self, images: ImageOptimizer) -> Self {
        self.images = images;
        self
    }

    /// Replace the revalidation trigger.
    pub fn with_revalidation(mut self, trigger: RevalidationTrigger) -> Self {
        self.revalidation = Some(trigger);
        self
    }

    pub fn without_revalidation(mut self) -> Self {
        self.revalidation = None;
        self
    }

    /// Override the mode read from the environment.
    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Mode selected at construction.
    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Whether the event targets the image optimizer.
    pub fn is_image_request(&self, event: &InternalEvent) -> bool {
        let path = event.raw_path.trim_end_matches('/');
        path == self.config.image_path.trim_end_matches('/')
    }

    /// Handle one invocation in buffered mode. Always yields a well-formed
    /// result.
    pub async fn handle_buffered(&self, raw: Value) -> BufferedResult {
        let event = match normalize(raw) {
            Ok(Normalized::Request(event)) => event,
            Ok(Normalized::Warmer) => {
                debug!("warmer event");
                return BufferedResult::warmer();
            }
            Err(e) => {
                error!(error = %e, "event normalization failed");
                return BufferedResult::internal_error(INTERNAL_ERROR_BODY);
            }
        };

        let request_id = RequestId::generate();
        let span = invocation_span(&request_id, &event.method, &event.raw_path);

        async {
            let started = Instant::now();

            let result = if self.is_image_request(&event) {
                let outcome = self.images.optimize(&event.headers, &event.query).await;
                ImageResponse::from_result(outcome).into_buffered()
            } else {
                let mut sink = BufferedSink::with_pipeline(self.pipeline_for(&event));
                // Failures already replaced the staged response with a 500.
                let _ = self.render(&event, &mut sink).await;
                sink.into_result().unwrap_or_else(|e| {
                    error!(error = %e, "buffered response incomplete");
                    BufferedResult::internal_error(INTERNAL_ERROR_BODY)
                })
            };

            info!(
                status = result.status_code,
                base64 = result.is_base64_encoded,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "invocation complete"
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Handle one invocation in streaming mode, writing frames to `channel`.
    pub async fn handle_streaming<C>(&self, raw: Value, channel: C) -> Result<(), AdapterError>
    where
        C: Sink<StreamFrame> + Unpin + Send,
        C::Error: Display,
    {
        let event = match normalize(raw) {
            Ok(Normalized::Request(event)) => event,
            Ok(Normalized::Warmer) => {
                debug!("warmer event");
                let mut sink = StreamingSink::new(channel);
                sink.set_status(200)?;
                sink.set_header(header_names::CONTENT_TYPE, "text/plain")?;
                sink.write(b"OK").await?;
                sink.end().await?;
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "event normalization failed");
                StreamingSink::new(channel).abort(INTERNAL_ERROR_BODY).await;
                return Err(e.into());
            }
        };

        let request_id = RequestId::generate();
        let span = invocation_span(&request_id, &event.method, &event.raw_path);

        async {
            let started = Instant::now();

            let (outcome, chunks) = if self.is_image_request(&event) {
                let mut sink = StreamingSink::new(channel);
                let image = self.images.optimize(&event.headers, &event.query).await;
                let outcome = ImageResponse::from_result(image)
                    .send(&mut sink)
                    .await
                    .map_err(AdapterError::from);
                (outcome, sink.chunks_sent())
            } else {
                let mut sink = StreamingSink::with_pipeline(channel, self.pipeline_for(&event));
                let outcome = self.render(&event, &mut sink).await;
                (outcome, sink.chunks_sent())
            };

            info!(
                chunks,
                ok = outcome.is_ok(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "invocation complete"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    fn pipeline_for(&self, event: &InternalEvent) -> HeaderPipeline {
        HeaderPipeline::standard(RewriteContext::for_event(event, Arc::clone(&self.policies)))
    }

    /// Run the framework, close the sink and schedule regeneration.
    async fn render(
        &self,
        event: &InternalEvent,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), AdapterError> {
        if let Err(e) = self.framework.handle(event, sink).await {
            error!(error = %e, phase = %sink.phase(), "framework failed");
            sink.abort(INTERNAL_ERROR_BODY).await;
            return Err(e.into());
        }

        if !sink.phase().is_terminal() {
            if let Err(e) = sink.end().await {
                error!(error = %e, "failed to end response");
                sink.abort(INTERNAL_ERROR_BODY).await;
                return Err(e.into());
            }
        }

        if sink.phase() == ResponsePhase::Closed {
            if let Some(trigger) = &self.revalidation {
                trigger.after_response(&RevalidationContext::for_event(event), sink.headers());
            }
        }
        Ok(())
    }
}
