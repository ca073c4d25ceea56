//! Image resizing and re-encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::detect::format_for_mime;

/// Error type for transform operations.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The source or requested format cannot be handled; the source is
    /// served unchanged.
    #[error("unsupported format: {0}")]
    Unsupported(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// What the transformer should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Content-type of the source bytes.
    pub source_type: String,
    /// Content-type to encode to.
    pub target_type: String,
    /// Maximum output width.
    pub width: u32,
    /// Encoder quality, 1..=100.
    pub quality: u8,
}

/// Resize and re-encode routine.
pub trait ImageTransformer: Send + Sync {
    fn transform(&self, bytes: &[u8], request: &TransformRequest) -> Result<Vec<u8>, TransformError>;
}

/// Transformer backed by the `image` crate.
///
/// Downscales with Lanczos3 and never upscales. JPEG output honours the
/// requested quality; PNG, GIF and WebP are encoded losslessly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransformer;

impl DefaultTransformer {
    pub fn new() -> Self {
        Self
    }

    fn encode(
        &self,
        img: &DynamicImage,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, TransformError> {
        let mut out = Cursor::new(Vec::new());
        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut out, quality);
                DynamicImage::ImageRgb8(img.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|e| TransformError::Encode(e.to_string()))?;
            }
            ImageFormat::WebP => {
                DynamicImage::ImageRgba8(img.to_rgba8())
                    .write_to(&mut out, format)
                    .map_err(|e| TransformError::Encode(e.to_string()))?;
            }
            ImageFormat::Png | ImageFormat::Gif => {
                img.write_to(&mut out, format)
                    .map_err(|e| TransformError::Encode(e.to_string()))?;
            }
            other => return Err(TransformError::Unsupported(format!("{:?}", other))),
        }
        Ok(out.into_inner())
    }
}

impl ImageTransformer for DefaultTransformer {
    fn transform(&self, bytes: &[u8], request: &TransformRequest) -> Result<Vec<u8>, TransformError> {
        let source = format_for_mime(&request.source_type)
            .filter(|f| f.reading_enabled())
            .ok_or_else(|| TransformError::Unsupported(request.source_type.clone()))?;
        let target = format_for_mime(&request.target_type)
            .filter(|f| f.writing_enabled())
            .ok_or_else(|| TransformError::Unsupported(request.target_type.clone()))?;

        let img = image::load_from_memory_with_format(bytes, source)
            .map_err(|e| TransformError::Decode(e.to_string()))?;

        let (width, height) = img.dimensions();
        let img = if request.width < width {
            let scaled = ((height as u64 * request.width as u64) / width as u64).max(1) as u32;
            img.resize_exact(request.width, scaled, FilterType::Lanczos3)
        } else {
            img
        };

        self.encode(&img, target, request.quality)
    }
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 255) as u8, (y % 255) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn request(source: &str, target: &str, width: u32) -> TransformRequest {
        TransformRequest {
            source_type: source.to_string(),
            target_type: target.to_string(),
            width,
            quality: 75,
        }
    }

    #[test]
    fn test_downscale_preserves_aspect() {
        let out = DefaultTransformer
            .transform(&png(200, 100), &request("image/png", "image/png", 64))
            .unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[test]
    fn test_never_upscales() {
        let out = DefaultTransformer
            .transform(&png(40, 20), &request("image/png", "image/png", 640))
            .unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (40, 20));
    }

    #[test]
    fn test_encode_to_jpeg_and_webp() {
        let jpeg = DefaultTransformer
            .transform(&png(32, 32), &request("image/png", "image/jpeg", 16))
            .unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let webp = DefaultTransformer
            .transform(&png(32, 32), &request("image/png", "image/webp", 16))
            .unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_unsupported_target() {
        let err = DefaultTransformer
            .transform(&png(8, 8), &request("image/png", "image/avif", 8))
            .unwrap_err();
        assert!(matches!(err, TransformError::Unsupported(_)));
    }

    #[test]
    fn test_corrupt_source() {
        let err = DefaultTransformer
            .transform(b"\x89PNG not really", &request("image/png", "image/png", 8))
            .unwrap_err();
        assert!(matches!(err, TransformError::Decode(_)));
    }
}
