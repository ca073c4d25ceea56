//! Source image retrieval.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Empty response body from {0}")]
    EmptyBody(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A fetched source image with the metadata it was stored or served with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

impl StoredObject {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// Object storage holding the deployment's static files.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read one object.
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, FetchError>;
}

/// Fetches absolute remote URLs.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Plain GET of the URL.
    async fn fetch(&self, url: &str) -> Result<StoredObject, FetchError>;
}

/// Content store backed by a local directory: `<root>/<bucket>/<key>`.
///
/// Content-type is inferred from the file extension. Intended for local
/// development.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, bucket: &str, key: &str) -> Option<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, FetchError> {
        let not_found = || FetchError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        let path = self.resolve(bucket, key).ok_or_else(not_found)?;

        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(FetchError::Storage(e.to_string())),
        };
        debug!(path = %path.display(), bytes = body.len(), "read object from disk");

        Ok(StoredObject {
            body,
            content_type: content_type_for_path(&path).map(str::to_string),
            cache_control: None,
        })
    }
}

fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

/// Remote fetcher over `reqwest`. Sends no custom headers.
#[derive(Debug, Clone, Default)]
pub struct HttpRemoteFetcher {
    client: reqwest::Client,
}

impl HttpRemoteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteFetcher for HttpRemoteFetcher {
    async fn fetch(&self, url: &str) -> Result<StoredObject, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let cache_control = header(reqwest::header::CACHE_CONTROL);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }

        Ok(StoredObject {
            body: body.to_vec(),
            content_type,
            cache_control,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_reads_object() {
        let dir = tempfile::tempdir().unwrap();
        let object_dir = dir.path().join("assets").join("_site").join("images");
        std::fs::create_dir_all(&object_dir).unwrap();
        std::fs::write(object_dir.join("a.png"), b"png-bytes").unwrap();

        let store = FsContentStore::new(dir.path());
        let object = store.get("assets", "_site/images/a.png").await.unwrap();
        assert_eq!(object.body, b"png-bytes");
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
        assert!(object.cache_control.is_none());
    }

    #[tokio::test]
    async fn test_fs_store_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        let err = store.get("assets", "missing.png").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_fs_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path().join("root"));
        let err = store.get("assets", "../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("a/b.JPG")), Some("image/jpeg"));
        assert_eq!(content_type_for_path(Path::new("a/b.svg")), Some("image/svg+xml"));
        assert_eq!(content_type_for_path(Path::new("a/b")), None);
    }

    #[test]
    fn test_stored_object_builder() {
        let object = StoredObject::new(vec![1, 2])
            .with_content_type("image/png")
            .with_cache_control("max-age=10");
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
        assert_eq!(object.cache_control.as_deref(), Some("max-age=10"));
    }
}
