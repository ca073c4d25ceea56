//! Regeneration decision.

use std::fmt;

use adapter_cache::{header_names, CacheControl};
use adapter_core::{Headers, InternalEvent};

/// Request facts the decision depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationContext {
    /// Host the client used.
    pub host: Option<String>,
    pub path: String,
    /// This invocation is itself a regeneration pass.
    pub is_revalidation_pass: bool,
}

impl RevalidationContext {
    pub fn new(host: Option<String>, path: impl Into<String>) -> Self {
        Self {
            host,
            path: path.into(),
            is_revalidation_pass: false,
        }
    }

    pub fn for_event(event: &InternalEvent) -> Self {
        Self {
            host: event.host().map(str::to_string),
            path: event.raw_path.clone(),
            is_revalidation_pass: event.header(header_names::PRERENDER_REVALIDATE).is_some(),
        }
    }

    pub fn as_revalidation_pass(mut self) -> Self {
        self.is_revalidation_pass = true;
        self
    }
}

/// Why no regeneration was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The response does not tolerate staleness.
    NotStale,
    /// The request was already a regeneration pass.
    RevalidationPass,
    /// The path is a static asset or the image endpoint.
    NotDocument,
    /// No host to address the regeneration request to.
    MissingHost,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotStale => "not-stale",
            Self::RevalidationPass => "revalidation-pass",
            Self::NotDocument => "not-document",
            Self::MissingHost => "missing-host",
        };
        f.write_str(reason)
    }
}

/// Outcome of inspecting a committed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationDecision {
    pub should_regenerate: bool,
    pub host: Option<String>,
    pub path: String,
    pub skipped: Option<SkipReason>,
}

impl RevalidationDecision {
    /// Decide from the committed headers. `is_document` tells whether the
    /// path is a regenerable document.
    pub fn evaluate(ctx: &RevalidationContext, committed: &Headers, is_document: bool) -> Self {
        let stale = committed
            .get(header_names::CACHE_CONTROL)
            .map(|value| CacheControl::parse(value).allows_stale())
            .unwrap_or(false);

        let skipped = if !stale {
            Some(SkipReason::NotStale)
        } else if ctx.is_revalidation_pass {
            Some(SkipReason::RevalidationPass)
        } else if !is_document {
            Some(SkipReason::NotDocument)
        } else if ctx.host.as_deref().map_or(true, str::is_empty) {
            Some(SkipReason::MissingHost)
        } else {
            None
        };

        Self {
            should_regenerate: skipped.is_none(),
            host: ctx.host.clone(),
            path: ctx.path.clone(),
            skipped,
        }
    }
}
