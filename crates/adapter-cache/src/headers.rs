//! Well-known header names.

/// Header names used by the adapter. All lowercase.
pub mod header_names {
    pub const CACHE_CONTROL: &str = "cache-control";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LOCATION: &str = "content-location";
    pub const LOCATION: &str = "location";
    pub const VARY: &str = "vary";
    pub const SET_COOKIE: &str = "set-cookie";
    /// Marker added to every response that passed through the adapter.
    pub const ORIGIN_MARKER: &str = "x-ssr-adapter";
    /// Flags an invocation as a regeneration pass.
    pub const PRERENDER_REVALIDATE: &str = "x-prerender-revalidate";
}

/// Check whether a content-type denotes an HTML document.
pub fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}
