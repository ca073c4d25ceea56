//! Content sniffing for fetched source images.

use image::ImageFormat;

pub const SVG: &str = "image/svg+xml";
pub const JPEG: &str = "image/jpeg";

/// Detect an image content-type from magic bytes.
pub fn detect_content_type(bytes: &[u8]) -> Option<&'static str> {
    if looks_like_svg(bytes) {
        return Some(SVG);
    }
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}

/// Map a content-type to an `image` format.
pub fn format_for_mime(mime: &str) -> Option<ImageFormat> {
    let mime = mime.split(';').next().unwrap_or("").trim();
    ImageFormat::from_mime_type(mime)
}

/// Check whether a source is animated. Only GIF, PNG and WebP can be.
pub fn is_animated(bytes: &[u8], content_type: &str) -> bool {
    match content_type {
        "image/gif" => {
            contains(bytes, b"NETSCAPE2.0") || count(bytes, b"\x00\x21\xf9\x04") > 1
        }
        "image/png" => match (find(bytes, b"acTL"), find(bytes, b"IDAT")) {
            (Some(actl), Some(idat)) => actl < idat,
            (Some(_), None) => true,
            _ => false,
        },
        "image/webp" => contains(bytes, b"ANIM"),
        _ => false,
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_raster_formats() {
        assert_eq!(detect_content_type(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]), Some("image/png"));
        assert_eq!(detect_content_type(&[0xff, 0xd8, 0xff, 0xe0]), Some("image/jpeg"));
        assert_eq!(detect_content_type(b"GIF89a\x01\x00"), Some("image/gif"));
        assert_eq!(detect_content_type(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
    }

    #[test]
    fn test_detect_svg() {
        assert_eq!(detect_content_type(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"), Some(SVG));
        assert_eq!(
            detect_content_type(b"<?xml version=\"1.0\"?>\n<svg></svg>"),
            Some(SVG)
        );
        assert_eq!(detect_content_type(b"<html></html>"), None);
    }

    #[test]
    fn test_format_for_mime() {
        assert_eq!(format_for_mime("image/webp"), Some(ImageFormat::WebP));
        assert_eq!(format_for_mime("image/png; q=1"), Some(ImageFormat::Png));
        assert_eq!(format_for_mime("text/plain"), None);
    }

    #[test]
    fn test_animation_markers() {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(b"\x21\xff\x0bNETSCAPE2.0");
        assert!(is_animated(&gif, "image/gif"));
        assert!(!is_animated(b"GIF89a\x00\x21\xf9\x04", "image/gif"));

        assert!(is_animated(b"\x89PNG....acTL....IDAT", "image/png"));
        assert!(!is_animated(b"\x89PNG....IDAT....", "image/png"));

        assert!(is_animated(b"RIFF....WEBPVP8XANIM", "image/webp"));
        assert!(!is_animated(b"\xff\xd8\xffANIM", "image/jpeg"));
    }
}
