//! Image optimization configuration.

use adapter_security::RemoteAllowlist;
use serde::{Deserialize, Serialize};

/// Longest accepted `url` parameter.
pub const MAX_URL_LENGTH: usize = 3072;

/// Image optimization settings. Defaults follow the framework's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Widths for full-viewport images.
    pub device_sizes: Vec<u32>,
    /// Widths for fixed-size images.
    pub image_sizes: Vec<u32>,
    /// Output formats in preference order.
    pub formats: Vec<String>,
    /// Lower bound for the response max-age, in seconds.
    pub minimum_cache_ttl: u64,
    /// Serve SVG sources (passed through, never rasterized).
    pub dangerously_allow_svg: bool,
    /// Remote sources that may be proxied.
    #[serde(flatten)]
    pub remote: RemoteAllowlist,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            device_sizes: vec![640, 750, 828, 1080, 1200, 1920, 2048, 3840],
            image_sizes: vec![16, 32, 48, 64, 96, 128, 256, 384],
            formats: vec!["image/webp".to_string()],
            minimum_cache_ttl: 60,
            dangerously_allow_svg: false,
            remote: RemoteAllowlist::default(),
        }
    }
}

impl ImageConfig {
    pub fn with_remote(mut self, remote: RemoteAllowlist) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_formats(mut self, formats: &[&str]) -> Self {
        self.formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_minimum_cache_ttl(mut self, secs: u64) -> Self {
        self.minimum_cache_ttl = secs;
        self
    }

    pub fn allow_svg(mut self, allow: bool) -> Self {
        self.dangerously_allow_svg = allow;
        self
    }

    /// Check whether a width is one of the configured sizes.
    pub fn is_allowed_width(&self, width: u32) -> bool {
        self.device_sizes.contains(&width) || self.image_sizes.contains(&width)
    }

    /// First configured format the `accept` header lists, if any.
    pub fn negotiate_format(&self, accept: Option<&str>) -> Option<String> {
        let accept = accept?.to_ascii_lowercase();
        self.formats
            .iter()
            .find(|format| accept.contains(format.to_ascii_lowercase().as_str()))
            .cloned()
    }
}
