//! Regeneration request dispatch.

use async_trait::async_trait;
use tracing::debug;

use adapter_cache::header_names;

/// A page to regenerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationRequest {
    pub host: String,
    pub path: String,
}

impl RevalidationRequest {
    /// Target URL of the regeneration request.
    pub fn url(&self) -> String {
        format!("https://{}{}", self.host, self.path)
    }
}

/// Error type for dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Request error: {0}")]
    Request(String),
}

/// Sends regeneration requests.
#[async_trait]
pub trait RevalidationDispatcher: Send + Sync {
    async fn dispatch(&self, request: RevalidationRequest) -> Result<(), DispatchError>;
}

/// Dispatcher that re-requests the page with the revalidation header set,
/// so the framework regenerates it.
#[derive(Debug, Clone)]
pub struct HttpRevalidationDispatcher {
    client: reqwest::Client,
    preview_id: String,
}

impl HttpRevalidationDispatcher {
    pub fn new(preview_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), preview_id)
    }

    pub fn with_client(client: reqwest::Client, preview_id: impl Into<String>) -> Self {
        Self {
            client,
            preview_id: preview_id.into(),
        }
    }
}

#[async_trait]
impl RevalidationDispatcher for HttpRevalidationDispatcher {
    async fn dispatch(&self, request: RevalidationRequest) -> Result<(), DispatchError> {
        let url = request.url();
        let response = self
            .client
            .head(&url)
            .header(header_names::PRERENDER_REVALIDATE, &self.preview_id)
            .send()
            .await
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Http {
                status: status.as_u16(),
                url,
            });
        }
        debug!(url = %url, status = status.as_u16(), "revalidation request sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let request = RevalidationRequest {
            host: "shop.example.com".to_string(),
            path: "/blog/post-1".to_string(),
        };
        assert_eq!(request.url(), "https://shop.example.com/blog/post-1");
    }
}
