//! Detached regeneration trigger.

use std::sync::Arc;

use adapter_core::Headers;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::decision::{RevalidationContext, RevalidationDecision};
use crate::dispatcher::{RevalidationDispatcher, RevalidationRequest};

/// Default path prefixes that are never regenerated.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &["/_next/static/", "/_next/image"];

/// Schedules regeneration after a response has been committed.
#[derive(Clone)]
pub struct RevalidationTrigger {
    dispatcher: Arc<dyn RevalidationDispatcher>,
    excluded_prefixes: Vec<String>,
}

impl RevalidationTrigger {
    pub fn new(dispatcher: Arc<dyn RevalidationDispatcher>) -> Self {
        Self {
            dispatcher,
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// Exclude another path prefix from regeneration.
    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }

    /// Check whether a path is a regenerable document.
    pub fn is_document_path(&self, path: &str) -> bool {
        !self
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Inspect the committed headers and, if warranted, spawn one detached
    /// dispatch. The handle is returned for callers that want to observe the
    /// task; dropping it does not cancel the dispatch.
    pub fn after_response(
        &self,
        ctx: &RevalidationContext,
        committed: &Headers,
    ) -> (RevalidationDecision, Option<JoinHandle<()>>) {
        let decision =
            RevalidationDecision::evaluate(ctx, committed, self.is_document_path(&ctx.path));

        let (true, Some(host)) = (decision.should_regenerate, decision.host.clone()) else {
            if let Some(reason) = decision.skipped {
                debug!(path = %decision.path, reason = %reason, "regeneration skipped");
            }
            return (decision, None);
        };

        let request = RevalidationRequest {
            host,
            path: decision.path.clone(),
        };
        info!(host = %request.host, path = %request.path, "scheduling regeneration");

        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = tokio::spawn(async move {
            let path = request.path.clone();
            if let Err(e) = dispatcher.dispatch(request).await {
                warn!(path = %path, error = %e, "regeneration dispatch failed");
            }
        });

        (decision, Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::dispatcher::DispatchError;

    #[derive(Default)]
    struct RecordingDispatcher {
        requests: Mutex<Vec<RevalidationRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl RevalidationDispatcher for RecordingDispatcher {
        async fn dispatch(&self, request: RevalidationRequest) -> Result<(), DispatchError> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(DispatchError::Request("connection refused".to_string()));
            }
            Ok(())
        }
    }

    fn swr() -> Headers {
        Headers::new().with("cache-control", "s-maxage=1, stale-while-revalidate=2592000")
    }

    fn ctx(path: &str) -> RevalidationContext {
        RevalidationContext::new(Some("shop.example.com".to_string()), path)
    }

    #[tokio::test]
    async fn test_exactly_one_dispatch() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let trigger = RevalidationTrigger::new(dispatcher.clone());

        let (decision, handle) = trigger.after_response(&ctx("/blog"), &swr());
        assert!(decision.should_regenerate);
        handle.unwrap().await.unwrap();

        let requests = dispatcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url(), "https://shop.example.com/blog");
    }

    #[tokio::test]
    async fn test_revalidation_pass_never_dispatches() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let trigger = RevalidationTrigger::new(dispatcher.clone());

        let (decision, handle) =
            trigger.after_response(&ctx("/blog").as_revalidation_pass(), &swr());
        assert!(!decision.should_regenerate);
        assert!(handle.is_none());
        assert!(dispatcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_and_image_paths_excluded() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let trigger = RevalidationTrigger::new(dispatcher.clone());

        for path in ["/_next/static/chunks/a.js", "/_next/image"] {
            let (_, handle) = trigger.after_response(&ctx(path), &swr());
            assert!(handle.is_none(), "path={}", path);
        }
        assert!(trigger.is_document_path("/products/1"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_swallowed() {
        let dispatcher = Arc::new(RecordingDispatcher {
            fail: true,
            ..Default::default()
        });
        let trigger = RevalidationTrigger::new(dispatcher.clone());

        let (_, handle) = trigger.after_response(&ctx("/blog"), &swr());
        assert!(handle.unwrap().await.is_ok());
        assert_eq!(dispatcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_exclusion() {
        let trigger = RevalidationTrigger::new(Arc::new(RecordingDispatcher::default()))
            .exclude_prefix("/api/");
        assert!(!trigger.is_document_path("/api/cart"));
    }
}
