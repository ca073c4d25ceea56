//! Response header rewrite pipeline.
//!
//! Stages are pure functions over the staged headers. The pipeline runs once,
//! immediately before the response is committed, in this order:
//!
//! 1. forwarded-host fixup
//! 2. HTML cache-control fix
//! 3. stale-while-revalidate normalization
//! 4. origin marker
//!
//! Running the pipeline over its own output yields the same headers.

use std::sync::Arc;

use adapter_core::{Headers, InternalEvent};
use tracing::debug;

use crate::control::{CacheControl, STALE_WHILE_REVALIDATE};
use crate::headers::{header_names, is_html};
use crate::policy::CachePolicies;

/// Per-invocation inputs shared by all stages.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Request path, without query.
    pub path: String,
    /// Host the platform routed the request to, when it was overridden by
    /// `x-forwarded-host`.
    pub internal_host: Option<String>,
    /// Host the client used.
    pub external_host: Option<String>,
    pub policies: Arc<CachePolicies>,
}

impl RewriteContext {
    pub fn new(path: impl Into<String>, policies: Arc<CachePolicies>) -> Self {
        Self {
            path: path.into(),
            internal_host: None,
            external_host: None,
            policies,
        }
    }

    /// Build the context for a normalized request.
    pub fn for_event(event: &InternalEvent, policies: Arc<CachePolicies>) -> Self {
        Self {
            path: event.raw_path.clone(),
            internal_host: event.internal_host.clone(),
            external_host: event.external_host().map(str::to_string),
            policies,
        }
    }

    /// Set the internal/external host pair.
    pub fn with_hosts(mut self, internal: impl Into<String>, external: impl Into<String>) -> Self {
        self.internal_host = Some(internal.into());
        self.external_host = Some(external.into());
        self
    }
}

/// A single header rewrite stage.
pub type StageFn = fn(Headers, &RewriteContext) -> Headers;

/// Ordered header rewrite stages bound to one invocation.
#[derive(Debug, Clone)]
pub struct HeaderPipeline {
    context: RewriteContext,
    stages: Vec<(&'static str, StageFn)>,
}

impl HeaderPipeline {
    /// Create a pipeline with no stages.
    pub fn empty(context: RewriteContext) -> Self {
        Self {
            context,
            stages: Vec::new(),
        }
    }

    /// The standard four-stage pipeline.
    pub fn standard(context: RewriteContext) -> Self {
        Self::empty(context)
            .with_stage("forwarded-host", forwarded_host_fixup)
            .with_stage("html-cache-control", fix_html_cache_control)
            .with_stage("stale-while-revalidate", normalize_swr)
            .with_stage("origin-marker", add_origin_marker)
    }

    /// Append a stage.
    pub fn with_stage(mut self, name: &'static str, stage: StageFn) -> Self {
        self.stages.push((name, stage));
        self
    }

    pub fn context(&self) -> &RewriteContext {
        &self.context
    }

    /// Names of the stages, in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(name, _)| *name).collect()
    }

    /// Run every stage in order.
    pub fn apply(&self, headers: Headers) -> Headers {
        self.stages.iter().fold(headers, |headers, (name, stage)| {
            debug!(stage = *name, path = %self.context.path, "applying header stage");
            stage(headers, &self.context)
        })
    }
}

/// Rewrite absolute `location`/`content-location` values that point at the
/// internal host so they point at the external host.
pub fn forwarded_host_fixup(mut headers: Headers, ctx: &RewriteContext) -> Headers {
    let (Some(internal), Some(external)) = (&ctx.internal_host, &ctx.external_host) else {
        return headers;
    };
    if internal.eq_ignore_ascii_case(external) {
        return headers;
    }

    for name in [header_names::LOCATION, header_names::CONTENT_LOCATION] {
        let rewritten = headers
            .get(name)
            .and_then(|value| replace_authority(value, internal, external));
        if let Some(value) = rewritten {
            headers.insert(name, value);
        }
    }
    headers
}

fn replace_authority(value: &str, from: &str, to: &str) -> Option<String> {
    let (scheme, rest) = value.split_once("://")?;
    let end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);
    if !authority.eq_ignore_ascii_case(from) {
        return None;
    }
    Some(format!("{}://{}{}", scheme, to, tail))
}

/// Replace cache-control on HTML documents and static assets with the
/// configured policies.
pub fn fix_html_cache_control(mut headers: Headers, ctx: &RewriteContext) -> Headers {
    let policies = &ctx.policies;

    if policies.is_static_asset(&ctx.path) {
        headers.insert(
            header_names::CACHE_CONTROL,
            policies.static_asset.cache_control_header(),
        );
        return headers;
    }

    let Some(current) = headers.get(header_names::CACHE_CONTROL) else {
        return headers;
    };

    let html_response = headers
        .get(header_names::CONTENT_TYPE)
        .map(is_html)
        .unwrap_or(false);
    let is_document = policies.is_html_page(&ctx.path)
        || (html_response && !CacheControl::parse(current).allows_stale());

    if is_document {
        headers.insert(
            header_names::CACHE_CONTROL,
            policies.document.cache_control_header(),
        );
    }
    headers
}

/// Give a bare `stale-while-revalidate` directive an explicit window.
pub fn normalize_swr(mut headers: Headers, ctx: &RewriteContext) -> Headers {
    let Some(current) = headers.get(header_names::CACHE_CONTROL) else {
        return headers;
    };

    let mut control = CacheControl::parse(current);
    if control.get(STALE_WHILE_REVALIDATE) != Some(None) {
        return headers;
    }

    control.set(
        STALE_WHILE_REVALIDATE,
        Some(ctx.policies.swr_window_secs.to_string()),
    );
    headers.insert(header_names::CACHE_CONTROL, control.to_string());
    headers
}

/// Mark the response as served through the adapter.
pub fn add_origin_marker(mut headers: Headers, _ctx: &RewriteContext) -> Headers {
    headers.insert(header_names::ORIGIN_MARKER, "1");
    headers
}
