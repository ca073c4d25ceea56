//! Document and static-asset cache policies.

use serde::{Deserialize, Serialize};

/// Default stale-while-revalidate window applied to bare directives (30 days).
pub const DEFAULT_SWR_WINDOW_SECS: u64 = 2_592_000;

/// Default path prefix of immutable build assets.
pub const DEFAULT_STATIC_PREFIX: &str = "/_next/static/";

/// Cache scope determining who can cache the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Cacheable by CDN and browser (shared cache).
    #[default]
    Public,
    /// Cacheable by browser only.
    Private,
    /// No caching.
    None,
}

impl CacheScope {
    /// Get the Cache-Control directive for this scope.
    pub fn cache_control_directive(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::None => "no-store",
        }
    }
}

/// Policy used to replace a response's Cache-Control header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCachePolicy {
    pub scope: CacheScope,
    /// Browser lifetime in seconds.
    pub max_age_secs: u64,
    /// Shared-cache lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_maxage_secs: Option<u64>,
    pub must_revalidate: bool,
    pub immutable: bool,
}

impl Default for ResponseCachePolicy {
    fn default() -> Self {
        Self::document()
    }
}

impl ResponseCachePolicy {
    /// Prerendered HTML: always revalidated by the browser, held by the CDN.
    pub fn document() -> Self {
        Self {
            scope: CacheScope::Public,
            max_age_secs: 0,
            s_maxage_secs: Some(31_536_000),
            must_revalidate: true,
            immutable: false,
        }
    }

    /// Content-hashed build assets.
    pub fn static_asset() -> Self {
        Self {
            scope: CacheScope::Public,
            max_age_secs: 31_536_000,
            s_maxage_secs: None,
            must_revalidate: false,
            immutable: true,
        }
    }

    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    pub fn with_s_maxage(mut self, secs: u64) -> Self {
        self.s_maxage_secs = Some(secs);
        self
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        if self.scope == CacheScope::None {
            return "no-store".to_string();
        }

        let mut parts = vec![self.scope.cache_control_directive().to_string()];
        parts.push(format!("max-age={}", self.max_age_secs));

        if let Some(s_maxage) = self.s_maxage_secs {
            parts.push(format!("s-maxage={}", s_maxage));
        }
        if self.must_revalidate {
            parts.push("must-revalidate".to_string());
        }
        if self.immutable {
            parts.push("immutable".to_string());
        }

        parts.join(", ")
    }
}

/// Cache settings consumed by the header rewrite pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicies {
    /// Policy for HTML documents.
    pub document: ResponseCachePolicy,
    /// Policy for paths under `static_prefix`.
    pub static_asset: ResponseCachePolicy,
    pub static_prefix: String,
    /// Window written into bare `stale-while-revalidate` directives.
    pub swr_window_secs: u64,
    /// Paths known to be prerendered HTML pages.
    pub html_pages: Vec<String>,
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self {
            document: ResponseCachePolicy::document(),
            static_asset: ResponseCachePolicy::static_asset(),
            static_prefix: DEFAULT_STATIC_PREFIX.to_string(),
            swr_window_secs: DEFAULT_SWR_WINDOW_SECS,
            html_pages: Vec::new(),
        }
    }
}

impl CachePolicies {
    /// Add a prerendered HTML page path.
    pub fn with_html_page(mut self, path: impl Into<String>) -> Self {
        self.html_pages.push(path.into());
        self
    }

    pub fn with_swr_window(mut self, secs: u64) -> Self {
        self.swr_window_secs = secs;
        self
    }

    /// Check whether a path is a known prerendered HTML page.
    ///
    /// Trailing slashes are ignored, so `/about/` matches `/about`.
    pub fn is_html_page(&self, path: &str) -> bool {
        let path = trim_trailing_slash(path);
        self.html_pages
            .iter()
            .any(|page| trim_trailing_slash(page) == path)
    }

    /// Check whether a path lies under the static asset prefix.
    pub fn is_static_asset(&self, path: &str) -> bool {
        !self.static_prefix.is_empty() && path.starts_with(&self.static_prefix)
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
