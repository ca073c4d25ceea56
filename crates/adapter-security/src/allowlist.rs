//! Remote source allow-list.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::pattern::RemotePattern;

/// Result type for allowlist operations.
pub type AllowlistResult<T> = Result<T, AllowlistError>;

/// Errors from allowlist operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllowlistError {
    #[error("host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Remote image sources the proxy may fetch from.
///
/// Empty means nothing remote is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteAllowlist {
    /// Structured patterns.
    pub remote_patterns: Vec<RemotePattern>,
    /// Exact hostnames (legacy form).
    pub domains: Vec<String>,
}

impl RemoteAllowlist {
    /// Create an empty allowlist (deny everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow sources matching a pattern.
    pub fn with_pattern(mut self, pattern: RemotePattern) -> Self {
        self.remote_patterns.push(pattern);
        self
    }

    /// Allow an exact hostname.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into().to_lowercase());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.remote_patterns.is_empty() && self.domains.is_empty()
    }

    /// Check every pattern is usable.
    pub fn validate(&self) -> AllowlistResult<()> {
        for pattern in &self.remote_patterns {
            if pattern.hostname.trim().is_empty() {
                return Err(AllowlistError::InvalidPattern(
                    "hostname must not be empty".to_string(),
                ));
            }
            if pattern.hostname.contains("://") || pattern.hostname.contains('/') {
                return Err(AllowlistError::InvalidPattern(pattern.hostname.clone()));
            }
        }
        Ok(())
    }

    /// Check if an absolute URL is allowed.
    pub fn check_url(&self, url: &str) -> AllowlistResult<()> {
        let parsed = Url::parse(url).map_err(|e| AllowlistError::InvalidUrl(e.to_string()))?;
        self.check(&parsed)
    }

    /// Check if a parsed URL is allowed.
    pub fn check(&self, url: &Url) -> AllowlistResult<()> {
        let host = url
            .host_str()
            .ok_or_else(|| AllowlistError::InvalidUrl(url.to_string()))?
            .to_lowercase();

        if self.domains.iter().any(|d| d.eq_ignore_ascii_case(&host)) {
            return Ok(());
        }
        if self.remote_patterns.iter().any(|p| p.matches(url)) {
            return Ok(());
        }
        Err(AllowlistError::HostNotAllowed(host))
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        self.check_url(url).is_ok()
    }
}
