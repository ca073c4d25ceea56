//! Image optimization errors.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::params::ImageRejection;
use crate::transform::TransformError;

/// Errors from the image optimization service.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Rejected(#[from] ImageRejection),

    /// A local source was requested but no bucket is configured.
    #[error("Bucket name must be defined!")]
    BucketNotConfigured,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The blocking transform task panicked or was cancelled.
    #[error("image transform task failed: {0}")]
    TransformTask(String),

    #[error("\"url\" parameter is valid but image type is not allowed")]
    SvgNotAllowed,

    #[error("The requested resource isn't a valid image.")]
    NotAnImage,
}

impl ImageError {
    /// Check if the request failed validation (no fetch was attempted).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::BucketNotConfigured)
    }
}
