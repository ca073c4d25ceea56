//! Adapter configuration.

use std::path::{Path, PathBuf};

use adapter_cache::CachePolicies;
use adapter_image::ImageConfig;
use adapter_observability::{LogConfig, LOG_FORMAT_ENV};
use serde::{Deserialize, Serialize};

/// Environment variable naming the content bucket.
pub const BUCKET_NAME_ENV: &str = "BUCKET_NAME";
/// Environment variable naming the key prefix inside the bucket.
pub const BUCKET_KEY_PREFIX_ENV: &str = "BUCKET_KEY_PREFIX";

/// Path served by the image optimizer.
pub const DEFAULT_IMAGE_PATH: &str = "/_next/image";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Resolved adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Bucket holding static files and local image sources.
    pub bucket_name: Option<String>,
    /// Key prefix inside the bucket.
    pub bucket_key_prefix: Option<String>,
    /// Path served by the image optimizer.
    pub image_path: String,
    pub images: ImageConfig,
    pub cache: CachePolicies,
    /// Sent as `x-prerender-revalidate` on regeneration requests. Regeneration
    /// is disabled when unset.
    pub revalidation_preview_id: Option<String>,
    pub logging: LogConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            bucket_name: None,
            bucket_key_prefix: None,
            image_path: DEFAULT_IMAGE_PATH.to_string(),
            images: ImageConfig::default(),
            cache: CachePolicies::default(),
            revalidation_preview_id: None,
            logging: LogConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Overlay `BUCKET_NAME`, `BUCKET_KEY_PREFIX` and `ADAPTER_LOG_FORMAT`
    /// from the environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Overlay bucket and log format settings from an arbitrary lookup.
    /// Empty values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(bucket) = non_empty(BUCKET_NAME_ENV) {
            self.bucket_name = Some(bucket);
        }
        if let Some(prefix) = non_empty(BUCKET_KEY_PREFIX_ENV) {
            self.bucket_key_prefix = Some(prefix);
        }
        self.logging = self
            .logging
            .with_format_override(non_empty(LOG_FORMAT_ENV).as_deref());
        self
    }

    pub fn with_bucket(mut self, name: impl Into<String>, key_prefix: Option<String>) -> Self {
        self.bucket_name = Some(name.into());
        self.bucket_key_prefix = key_prefix;
        self
    }

    pub fn with_preview_id(mut self, preview_id: impl Into<String>) -> Self {
        self.revalidation_preview_id = Some(preview_id.into());
        self
    }

    pub fn with_html_page(mut self, path: impl Into<String>) -> Self {
        self.cache.html_pages.push(path.into());
        self
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.image_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "image_path must start with '/': {}",
                self.image_path
            )));
        }
        if self.images.formats.is_empty() {
            return Err(ConfigError::Invalid("images.formats must not be empty".to_string()));
        }
        self.images
            .remote
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use adapter_observability::LogFormat;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.image_path, "/_next/image");
        assert!(config.bucket_name.is_none());
        assert_eq!(config.images.minimum_cache_ttl, 60);
        assert_eq!(config.cache.swr_window_secs, 2_592_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.toml");
        std::fs::write(
            &path,
            r#"
bucket_name = "site-assets"
bucket_key_prefix = "_assets"
revalidation_preview_id = "abc123"

[images]
formats = ["image/avif", "image/webp"]
minimum_cache_ttl = 120

[[images.remote_patterns]]
protocol = "https"
hostname = "**.unsplash.com"

[cache]
html_pages = ["/", "/about"]
"#,
        )
        .unwrap();

        let config = AdapterConfig::load(&path).unwrap();
        assert_eq!(config.bucket_name.as_deref(), Some("site-assets"));
        assert_eq!(config.images.formats, vec!["image/avif", "image/webp"]);
        assert_eq!(config.images.minimum_cache_ttl, 120);
        assert_eq!(config.images.device_sizes.len(), 8);
        assert!(config.images.remote.is_allowed("https://images.unsplash.com/a"));
        assert!(config.cache.is_html_page("/about"));
        assert_eq!(config.cache.static_prefix, "/_next/static/");
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.json");
        std::fs::write(&path, r#"{"bucket_name":"b","images":{"domains":["cdn.example.com"]}}"#).unwrap();

        let config = AdapterConfig::load(&path).unwrap();
        assert_eq!(config.bucket_name.as_deref(), Some("b"));
        assert!(config.images.remote.is_allowed("https://cdn.example.com/x.png"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AdapterConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.toml");
        std::fs::write(&path, "image_path = \"_next/image\"\n").unwrap();
        assert!(matches!(
            AdapterConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [("BUCKET_NAME", "from-env"), ("BUCKET_KEY_PREFIX", "")]
            .into_iter()
            .collect();
        let config = AdapterConfig::default()
            .with_bucket("from-file", Some("prefix".to_string()))
            .with_overrides_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.bucket_name.as_deref(), Some("from-env"));
        assert_eq!(config.bucket_key_prefix.as_deref(), Some("prefix"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_overlay_log_format() {
        let config = AdapterConfig::default()
            .with_overrides_from(|name| (name == "ADAPTER_LOG_FORMAT").then(|| "human".to_string()));
        assert_eq!(config.logging.format, LogFormat::Human);
    }
}
