//! Image request validation.

use std::collections::HashMap;

use adapter_core::{Headers, QueryParams};
use adapter_security::AllowlistError;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::config::{ImageConfig, MAX_URL_LENGTH};
use crate::source::ImageSource;

/// Path prefix of framework-emitted static media.
const STATIC_MEDIA_PREFIX: &str = "/_next/static/media";

/// Why an image request was refused. Messages are stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageRejection {
    #[error("\"url\" parameter is required")]
    MissingUrl,

    #[error("\"url\" parameter cannot be an array")]
    DuplicateUrl,

    #[error("\"url\" parameter is too long")]
    UrlTooLong,

    #[error("\"url\" parameter cannot be a protocol-relative URL (//)")]
    ProtocolRelativeUrl,

    #[error("\"url\" parameter is invalid")]
    InvalidUrl,

    #[error("\"url\" parameter is not allowed")]
    HostNotAllowed,

    #[error("\"w\" parameter (width) is required")]
    MissingWidth,

    #[error("\"w\" parameter (width) cannot be an array")]
    DuplicateWidth,

    #[error("\"w\" parameter (width) must be a number greater than 0")]
    InvalidWidth,

    #[error("\"w\" parameter (width) of {0} is not allowed")]
    WidthNotAllowed(u32),

    #[error("\"q\" parameter (quality) is required")]
    MissingQuality,

    #[error("\"q\" parameter (quality) cannot be an array")]
    DuplicateQuality,

    #[error("\"q\" parameter (quality) must be a number between 1 and 100")]
    InvalidQuality,
}

/// A validated transform request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageParams {
    pub source: ImageSource,
    /// Target width in pixels.
    pub width: u32,
    /// Encoder quality, 1..=100.
    pub quality: u8,
    /// Negotiated output format; `None` keeps the source format.
    pub mime_type: Option<String>,
    /// Source is a content-hashed framework asset.
    pub is_static: bool,
}

impl ImageParams {
    /// Validate a request given its headers and query map.
    pub fn validate(
        headers: &Headers,
        query: &QueryParams,
        config: &ImageConfig,
    ) -> Result<Self, ImageRejection> {
        Self::validate_pairs(
            headers,
            query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            config,
        )
    }

    /// Validate a request given raw query pairs, which may repeat a key.
    pub fn validate_pairs<'a>(
        headers: &Headers,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        config: &ImageConfig,
    ) -> Result<Self, ImageRejection> {
        let mut query: HashMap<&str, Vec<&str>> = HashMap::new();
        for (key, value) in pairs {
            query.entry(key).or_default().push(value);
        }

        let url = single(&query, "url", ImageRejection::MissingUrl, ImageRejection::DuplicateUrl)?;
        let w = single(&query, "w", ImageRejection::MissingWidth, ImageRejection::DuplicateWidth)?;
        let q = single(&query, "q", ImageRejection::MissingQuality, ImageRejection::DuplicateQuality)?;

        let source = resolve_source(url, config)?;
        let width = parse_width(w, config)?;
        let quality = parse_quality(q)?;
        let mime_type = config.negotiate_format(headers.get("accept"));
        let is_static = url.starts_with(STATIC_MEDIA_PREFIX);

        Ok(Self {
            source,
            width,
            quality,
            mime_type,
            is_static,
        })
    }
}

fn single<'a>(
    query: &HashMap<&str, Vec<&'a str>>,
    key: &str,
    missing: ImageRejection,
    duplicate: ImageRejection,
) -> Result<&'a str, ImageRejection> {
    match query.get(key).map(Vec::as_slice) {
        None | Some([]) => Err(missing),
        Some([value]) if value.is_empty() => Err(missing),
        Some([value]) => Ok(*value),
        Some(_) => Err(duplicate),
    }
}

fn resolve_source(url: &str, config: &ImageConfig) -> Result<ImageSource, ImageRejection> {
    if url.len() > MAX_URL_LENGTH {
        return Err(ImageRejection::UrlTooLong);
    }
    if url.starts_with("//") {
        return Err(ImageRejection::ProtocolRelativeUrl);
    }
    if url.starts_with('/') {
        return Ok(ImageSource::Local {
            key: url.to_string(),
        });
    }

    let parsed = Url::parse(url).map_err(|_| ImageRejection::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ImageRejection::InvalidUrl);
    }
    match config.remote.check(&parsed) {
        Ok(()) => Ok(ImageSource::Remote {
            url: parsed.to_string(),
        }),
        Err(AllowlistError::InvalidUrl(_)) => Err(ImageRejection::InvalidUrl),
        Err(_) => Err(ImageRejection::HostNotAllowed),
    }
}

fn parse_width(w: &str, config: &ImageConfig) -> Result<u32, ImageRejection> {
    let width = leading_int(w).ok_or(ImageRejection::InvalidWidth)?;
    if width <= 0 {
        return Err(ImageRejection::InvalidWidth);
    }
    let width = u32::try_from(width).map_err(|_| ImageRejection::InvalidWidth)?;
    if !config.is_allowed_width(width) {
        return Err(ImageRejection::WidthNotAllowed(width));
    }
    Ok(width)
}

fn parse_quality(q: &str) -> Result<u8, ImageRejection> {
    match leading_int(q) {
        Some(quality @ 1..=100) => Ok(quality as u8),
        _ => Err(ImageRejection::InvalidQuality),
    }
}

/// Parse the leading integer of a string, ignoring trailing garbage
/// (`"75abc"` is 75).
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let digits_end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..digits_end].parse().ok()
}
