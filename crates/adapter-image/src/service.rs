//! The image optimization service.

use std::sync::Arc;

use adapter_cache::CacheControl;
use adapter_core::{Headers, QueryParams};
use tracing::{debug, warn};

use crate::config::ImageConfig;
use crate::detect::{detect_content_type, is_animated, JPEG, SVG};
use crate::error::ImageError;
use crate::fetch::{ContentStore, RemoteFetcher, StoredObject};
use crate::params::ImageParams;
use crate::source::{join_key, ImageSource};
use crate::transform::{DefaultTransformer, ImageTransformer, TransformError, TransformRequest};

/// Source formats kept as the output format when no format was negotiated.
const PRESERVED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// Bucket holding local source images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLocation {
    pub name: String,
    pub key_prefix: Option<String>,
}

/// A transformed image ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Response max-age in seconds.
    pub max_age: u64,
}

/// Validates image requests, fetches sources and transforms them.
#[derive(Clone)]
pub struct ImageOptimizer {
    config: Arc<ImageConfig>,
    bucket: Option<BucketLocation>,
    store: Arc<dyn ContentStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    transformer: Arc<dyn ImageTransformer>,
}

impl ImageOptimizer {
    /// Create an optimizer with the default transformer and no bucket.
    pub fn new(
        config: Arc<ImageConfig>,
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        Self {
            config,
            bucket: None,
            store,
            fetcher,
            transformer: Arc::new(DefaultTransformer::new()),
        }
    }

    /// Set the bucket local sources are read from.
    pub fn with_bucket(mut self, name: impl Into<String>, key_prefix: Option<String>) -> Self {
        self.bucket = Some(BucketLocation {
            name: name.into(),
            key_prefix,
        });
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn ImageTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// Validate, fetch and transform one image request.
    pub async fn optimize(
        &self,
        headers: &Headers,
        query: &QueryParams,
    ) -> Result<OptimizedImage, ImageError> {
        let params = ImageParams::validate(headers, query, &self.config)?;
        debug!(
            source = %params.source,
            width = params.width,
            quality = params.quality,
            mime_type = params.mime_type.as_deref().unwrap_or("-"),
            "image params"
        );

        match self.optimize_params(&params).await {
            Ok(image) => Ok(image),
            Err(e) => {
                warn!(source = %params.source, error = %e, "image optimization failed");
                Err(e)
            }
        }
    }

    /// Fetch and transform an already validated request.
    pub async fn optimize_params(&self, params: &ImageParams) -> Result<OptimizedImage, ImageError> {
        let object = self.fetch(&params.source).await?;
        let max_age = self.max_age(object.cache_control.as_deref());

        let upstream_type = detect_content_type(&object.body)
            .map(str::to_string)
            .or_else(|| object.content_type.clone())
            .ok_or(ImageError::NotAnImage)?;

        if upstream_type.starts_with(SVG) {
            if !self.config.dangerously_allow_svg {
                return Err(ImageError::SvgNotAllowed);
            }
            return Ok(passthrough(object.body, upstream_type, max_age));
        }
        if is_animated(&object.body, &upstream_type) {
            return Ok(passthrough(object.body, upstream_type, max_age));
        }
        if !upstream_type.starts_with("image/") || upstream_type.contains(',') {
            return Err(ImageError::NotAnImage);
        }

        let target_type = match &params.mime_type {
            Some(mime) => mime.clone(),
            None if PRESERVED_TYPES.contains(&upstream_type.as_str()) => upstream_type.clone(),
            None => JPEG.to_string(),
        };
        let request = TransformRequest {
            source_type: upstream_type.clone(),
            target_type: target_type.clone(),
            width: params.width,
            quality: params.quality,
        };

        let (source, transformed) = self.transform_blocking(object.body, request).await?;
        match transformed {
            Ok(bytes) => Ok(OptimizedImage {
                bytes,
                content_type: target_type,
                max_age,
            }),
            Err(TransformError::Unsupported(format)) => {
                debug!(format = %format, "serving source image unchanged");
                Ok(passthrough(source, upstream_type, max_age))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run the transformer on the blocking pool. The source bytes are handed
    /// back for pass-through.
    async fn transform_blocking(
        &self,
        source: Vec<u8>,
        request: TransformRequest,
    ) -> Result<(Vec<u8>, Result<Vec<u8>, TransformError>), ImageError> {
        let transformer = Arc::clone(&self.transformer);
        tokio::task::spawn_blocking(move || {
            let result = transformer.transform(&source, &request);
            (source, result)
        })
        .await
        .map_err(|e| ImageError::TransformTask(e.to_string()))
    }

    async fn fetch(&self, source: &ImageSource) -> Result<StoredObject, ImageError> {
        match source {
            ImageSource::Remote { url } => Ok(self.fetcher.fetch(url).await?),
            ImageSource::Local { key } => {
                let bucket = self.bucket.as_ref().ok_or(ImageError::BucketNotConfigured)?;
                let key = join_key(bucket.key_prefix.as_deref(), key);
                let object = self.store.get(&bucket.name, &key).await?;
                if object.body.is_empty() {
                    return Err(crate::fetch::FetchError::EmptyBody(key).into());
                }
                Ok(object)
            }
        }
    }

    fn max_age(&self, cache_control: Option<&str>) -> u64 {
        let upstream = cache_control
            .map(CacheControl::parse)
            .and_then(|cc| cc.shared_max_age())
            .unwrap_or(0);
        upstream.max(self.config.minimum_cache_ttl)
    }
}

fn passthrough(bytes: Vec<u8>, content_type: String, max_age: u64) -> OptimizedImage {
    OptimizedImage {
        bytes,
        content_type,
        max_age,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use adapter_security::{RemoteAllowlist, RemotePattern};
    use async_trait::async_trait;
    use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb};

    use super::*;
    use crate::fetch::FetchError;

    // === Test Fakes ===

    #[derive(Default)]
    struct MemoryStore {
        objects: HashMap<(String, String), StoredObject>,
        requested: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn with(mut self, bucket: &str, key: &str, object: StoredObject) -> Self {
            self.objects.insert((bucket.to_string(), key.to_string()), object);
            self
        }
    }

    #[async_trait]
    impl ContentStore for MemoryStore {
        async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, FetchError> {
            self.requested.lock().unwrap().push(format!("{}/{}", bucket, key));
            self.objects
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| FetchError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        response: Option<StoredObject>,
    }

    #[async_trait]
    impl RemoteFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<StoredObject, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone().ok_or(FetchError::Http {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([10u8, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn config() -> Arc<ImageConfig> {
        Arc::new(ImageConfig::default().with_remote(
            RemoteAllowlist::new().with_pattern(RemotePattern::new("**.unsplash.com")),
        ))
    }

    fn query(url: &str, w: &str) -> QueryParams {
        [("url", url), ("w", w), ("q", "75")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn accept_webp() -> Headers {
        Headers::new().with("accept", "image/webp,image/*")
    }

    // === Local Source Tests ===

    #[tokio::test]
    async fn test_local_image_resized_and_negotiated() {
        let store = Arc::new(
            MemoryStore::default().with("assets", "_site/images/a.png", StoredObject::new(png(1000, 500))),
        );
        let optimizer = ImageOptimizer::new(config(), store.clone(), Arc::new(CountingFetcher::default()))
            .with_bucket("assets", Some("/_site/".to_string()));

        let image = optimizer
            .optimize(&accept_webp(), &query("/images/a.png", "640"))
            .await
            .unwrap();

        assert_eq!(image.content_type, "image/webp");
        assert_eq!(image.max_age, 60);
        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (640, 320));
        assert_eq!(*store.requested.lock().unwrap(), vec!["assets/_site/images/a.png"]);
    }

    #[tokio::test]
    async fn test_source_format_kept_without_accept() {
        let store = Arc::new(MemoryStore::default().with("assets", "a.png", StoredObject::new(png(10, 10))));
        let optimizer = ImageOptimizer::new(config(), store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let image = optimizer
            .optimize(&Headers::new(), &query("/a.png", "640"))
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_upstream_max_age_respected() {
        let object = StoredObject::new(png(10, 10)).with_cache_control("public, max-age=600, s-maxage=3600");
        let store = Arc::new(MemoryStore::default().with("assets", "a.png", object));
        let optimizer = ImageOptimizer::new(config(), store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let image = optimizer
            .optimize(&accept_webp(), &query("/a.png", "640"))
            .await
            .unwrap();
        assert_eq!(image.max_age, 3600);
    }

    #[tokio::test]
    async fn test_minimum_ttl_floor() {
        let object = StoredObject::new(png(10, 10)).with_cache_control("max-age=5");
        let store = Arc::new(MemoryStore::default().with("assets", "a.png", object));
        let optimizer = ImageOptimizer::new(config(), store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let image = optimizer
            .optimize(&accept_webp(), &query("/a.png", "640"))
            .await
            .unwrap();
        assert_eq!(image.max_age, 60);
    }

    #[tokio::test]
    async fn test_bucket_not_configured() {
        let store = Arc::new(MemoryStore::default());
        let optimizer = ImageOptimizer::new(config(), store.clone(), Arc::new(CountingFetcher::default()));

        let err = optimizer
            .optimize(&accept_webp(), &query("/a.png", "640"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::BucketNotConfigured));
        assert!(store.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_object() {
        let optimizer = ImageOptimizer::new(
            config(),
            Arc::new(MemoryStore::default()),
            Arc::new(CountingFetcher::default()),
        )
        .with_bucket("assets", None);

        let err = optimizer
            .optimize(&accept_webp(), &query("/nope.png", "640"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Fetch(FetchError::NotFound { .. })));
    }

    // === Remote Source Tests ===

    #[tokio::test]
    async fn test_disallowed_host_never_fetched() {
        let fetcher = Arc::new(CountingFetcher::default());
        let optimizer = ImageOptimizer::new(config(), Arc::new(MemoryStore::default()), fetcher.clone());

        let err = optimizer
            .optimize(&accept_webp(), &query("https://evil.example.com/a.png", "640"))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_params_never_fetched() {
        let fetcher = Arc::new(CountingFetcher::default());
        let optimizer = ImageOptimizer::new(config(), Arc::new(MemoryStore::default()), fetcher.clone());

        let err = optimizer
            .optimize(&accept_webp(), &query("https://images.unsplash.com/a", "641"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "\"w\" parameter (width) of 641 is not allowed");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_image_fetched() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            response: Some(StoredObject::new(png(20, 20)).with_content_type("image/png")),
        });
        let optimizer = ImageOptimizer::new(config(), Arc::new(MemoryStore::default()), fetcher.clone());

        let image = optimizer
            .optimize(&accept_webp(), &query("https://images.unsplash.com/photo-1", "640"))
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/webp");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_error_status() {
        let fetcher = Arc::new(CountingFetcher::default());
        let optimizer = ImageOptimizer::new(config(), Arc::new(MemoryStore::default()), fetcher);

        let err = optimizer
            .optimize(&accept_webp(), &query("https://images.unsplash.com/missing", "640"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Fetch(FetchError::Http { status: 404, .. })));
    }

    // === Content Type Tests ===

    #[tokio::test]
    async fn test_svg_rejected_by_default() {
        let svg = StoredObject::new(b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>".to_vec());
        let store = Arc::new(MemoryStore::default().with("assets", "logo.svg", svg));
        let optimizer = ImageOptimizer::new(config(), store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let err = optimizer
            .optimize(&accept_webp(), &query("/logo.svg", "640"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::SvgNotAllowed));
    }

    #[tokio::test]
    async fn test_svg_passthrough_when_allowed() {
        let bytes = b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>".to_vec();
        let store = Arc::new(MemoryStore::default().with("assets", "logo.svg", StoredObject::new(bytes.clone())));
        let config = Arc::new(ImageConfig::default().allow_svg(true));
        let optimizer = ImageOptimizer::new(config, store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let image = optimizer
            .optimize(&accept_webp(), &query("/logo.svg", "640"))
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/svg+xml");
        assert_eq!(image.bytes, bytes);
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let object = StoredObject::new(b"<html></html>".to_vec()).with_content_type("text/html");
        let store = Arc::new(MemoryStore::default().with("assets", "page", object));
        let optimizer = ImageOptimizer::new(config(), store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let err = optimizer
            .optimize(&accept_webp(), &query("/page", "640"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::NotAnImage));
    }

    #[tokio::test]
    async fn test_unsupported_output_passes_through() {
        let source = png(10, 10);
        let store = Arc::new(MemoryStore::default().with("assets", "a.png", StoredObject::new(source.clone())));
        let config = Arc::new(ImageConfig::default().with_formats(&["image/avif"]));
        let optimizer = ImageOptimizer::new(config, store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None);

        let image = optimizer
            .optimize(&Headers::new().with("accept", "image/avif"), &query("/a.png", "640"))
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes, source);
    }

    // === Scheduling Tests ===

    /// Transformer that holds its thread like a large resize would.
    struct SlowTransformer;

    impl ImageTransformer for SlowTransformer {
        fn transform(&self, bytes: &[u8], _request: &TransformRequest) -> Result<Vec<u8>, TransformError> {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(bytes.to_vec())
        }
    }

    #[tokio::test]
    async fn test_transform_does_not_block_runtime() {
        let store = Arc::new(MemoryStore::default().with("assets", "a.png", StoredObject::new(png(10, 10))));
        let optimizer = ImageOptimizer::new(config(), store, Arc::new(CountingFetcher::default()))
            .with_bucket("assets", None)
            .with_transformer(Arc::new(SlowTransformer));

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let image = optimizer
            .optimize(&accept_webp(), &query("/a.png", "640"))
            .await
            .unwrap();
        ticker.abort();

        assert_eq!(image.content_type, "image/webp");
        assert!(ticks.load(Ordering::SeqCst) > 0, "runtime was blocked during transform");
    }
}
