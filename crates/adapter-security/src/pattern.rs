//! Remote source patterns.

use serde::{Deserialize, Serialize};
use url::Url;

/// A remote image source pattern.
///
/// `hostname` and `pathname` are globs. In hostnames `*` matches one label
/// and a leading `**` matches one or more labels. In pathnames `*` matches
/// one segment and `**` matches any number of segments. A segment containing
/// `*` alongside other characters matches by prefix and suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePattern {
    /// Required scheme, without `:`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub hostname: String,
    /// Required port. An empty string means the scheme's default port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
}

impl RemotePattern {
    /// Create a pattern matching a hostname glob.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            protocol: None,
            hostname: hostname.into().to_lowercase(),
            port: None,
            pathname: None,
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into().trim_end_matches(':').to_lowercase());
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn with_pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = Some(pathname.into());
        self
    }

    /// Check whether a parsed URL matches this pattern.
    pub fn matches(&self, url: &Url) -> bool {
        if let Some(protocol) = &self.protocol {
            if !protocol.trim_end_matches(':').eq_ignore_ascii_case(url.scheme()) {
                return false;
            }
        }

        if let Some(port) = &self.port {
            let actual = url.port().map(|p| p.to_string()).unwrap_or_default();
            if *port != actual {
                return false;
            }
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        if !matches_hostname(&host.to_lowercase(), &self.hostname.to_lowercase()) {
            return false;
        }

        match &self.pathname {
            Some(pathname) => matches_pathname(url.path(), pathname),
            None => true,
        }
    }
}

/// Match a hostname against a label glob.
pub fn matches_hostname(host: &str, pattern: &str) -> bool {
    let host: Vec<&str> = host.split('.').collect();
    let pattern: Vec<&str> = pattern.split('.').collect();
    match_segments(&host, &pattern, 1)
}

/// Match a URL path against a segment glob.
pub fn matches_pathname(path: &str, pattern: &str) -> bool {
    let path: Vec<&str> = path.split('/').collect();
    let pattern: Vec<&str> = pattern.split('/').collect();
    match_segments(&path, &pattern, 0)
}

/// Segment-wise glob match. `**` consumes at least `min_deep` segments.
fn match_segments(value: &[&str], pattern: &[&str], min_deep: usize) -> bool {
    match pattern.split_first() {
        None => value.is_empty(),
        Some((&"**", rest)) => (min_deep..=value.len())
            .any(|taken| match_segments(&value[taken..], rest, min_deep)),
        Some((segment, rest)) => match value.split_first() {
            Some((first, value_rest)) => {
                matches_segment(first, segment) && match_segments(value_rest, rest, min_deep)
            }
            None => false,
        },
    }
}

fn matches_segment(value: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return !value.is_empty();
    }
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            value.len() >= prefix.len() + suffix.len()
                && value.starts_with(prefix)
                && value.ends_with(suffix)
        }
        None => value == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // === Hostname Tests ===

    #[test]
    fn test_single_star_matches_one_label() {
        assert!(matches_hostname("img.example.com", "*.example.com"));
        assert!(!matches_hostname("a.img.example.com", "*.example.com"));
        assert!(!matches_hostname("example.com", "*.example.com"));
    }

    #[test]
    fn test_double_star_matches_many_labels() {
        assert!(matches_hostname("images.unsplash.com", "**.unsplash.com"));
        assert!(matches_hostname("a.b.c.unsplash.com", "**.unsplash.com"));
        assert!(!matches_hostname("unsplash.com", "**.unsplash.com"));
        assert!(!matches_hostname("unsplash.com.evil.io", "**.unsplash.com"));
    }

    #[test]
    fn test_exact_hostname() {
        assert!(matches_hostname("cdn.example.com", "cdn.example.com"));
        assert!(!matches_hostname("cdn2.example.com", "cdn.example.com"));
    }

    #[test]
    fn test_partial_label_wildcard() {
        assert!(matches_hostname("img-eu.example.com", "img-*.example.com"));
        assert!(!matches_hostname("cdn-eu.example.com", "img-*.example.com"));
    }

    // === Pathname Tests ===

    #[test]
    fn test_pathname_globs() {
        assert!(matches_pathname("/account123/photo.png", "/account123/**"));
        assert!(matches_pathname("/account123/a/b/c.png", "/account123/**"));
        assert!(matches_pathname("/account123/", "/account123/**"));
        assert!(!matches_pathname("/other/photo.png", "/account123/**"));
        assert!(matches_pathname("/u/photo.png", "/*/photo.png"));
        assert!(!matches_pathname("/u/v/photo.png", "/*/photo.png"));
    }

    // === Pattern Tests ===

    #[test]
    fn test_protocol_and_port() {
        let pattern = RemotePattern::new("assets.example.com")
            .with_protocol("https")
            .with_port("");
        assert!(pattern.matches(&url("https://assets.example.com/a.png")));
        assert!(!pattern.matches(&url("http://assets.example.com/a.png")));
        assert!(!pattern.matches(&url("https://assets.example.com:8443/a.png")));

        let custom = RemotePattern::new("localhost").with_port("3000");
        assert!(custom.matches(&url("http://localhost:3000/a.png")));
        assert!(!custom.matches(&url("http://localhost/a.png")));
    }

    #[test]
    fn test_host_case_insensitive() {
        let pattern = RemotePattern::new("**.Unsplash.com");
        assert!(pattern.matches(&url("https://IMAGES.unsplash.com/x")));
    }

    #[test]
    fn test_deserialize() {
        let pattern: RemotePattern = serde_json::from_str(
            r#"{"protocol":"https","hostname":"**.unsplash.com"}"#,
        )
        .unwrap();
        assert_eq!(pattern.protocol.as_deref(), Some("https"));
        assert!(pattern.port.is_none());
        assert!(pattern.matches(&url("https://images.unsplash.com/photo")));
    }
}
