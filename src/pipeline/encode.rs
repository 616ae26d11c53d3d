//! Preview encoding: `DecodedImage` → base64 PNG data URI.
//!
//! The page shows the decoded image back to the user before OCR results.
//! Browsers cannot display TIFF and the raster may come from a PDF, so the
//! preview is always re-encoded as PNG rather than echoing the upload. Large
//! scans are downscaled first; the preview only needs to be recognisable.

use crate::error::NoteError;
use crate::pipeline::input::DecodedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Longest preview edge in pixels.
pub const PREVIEW_MAX_EDGE: u32 = 1600;

/// Encode a decoded image as a `data:image/png;base64,…` URI for `<img src>`.
pub fn preview_data_uri(decoded: &DecodedImage) -> Result<String, NoteError> {
    let img = decoded.image();
    let preview: DynamicImage = if img.width() > PREVIEW_MAX_EDGE || img.height() > PREVIEW_MAX_EDGE
    {
        img.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE)
    } else {
        img.clone()
    };

    let mut buf = Vec::new();
    preview
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| NoteError::Internal(format!("Preview encoding failed: {}", e)))?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded preview {}x{} → {} bytes base64",
        preview.width(),
        preview.height(),
        b64.len()
    );

    Ok(format!("data:image/png;base64,{}", b64))
}

/// Whether a string submitted back from the page looks like one of our previews.
///
/// Anything else is dropped instead of being echoed into an `<img src>`.
pub fn is_preview_data_uri(s: &str) -> bool {
    s.strip_prefix("data:image/png;base64,")
        .map(|b64| {
            !b64.is_empty()
                && b64
                    .bytes()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'+' | b'/' | b'='))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::UploadFormat;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let uri = preview_data_uri(&DecodedImage::new(img, UploadFormat::Png))
            .expect("encode should succeed");
        assert!(is_preview_data_uri(&uri));
        let decoded = STANDARD
            .decode(uri.trim_start_matches("data:image/png;base64,"))
            .expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn large_images_are_downscaled() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(PREVIEW_MAX_EDGE * 2, 100));
        let uri = preview_data_uri(&DecodedImage::new(img, UploadFormat::Tiff)).unwrap();
        let bytes = STANDARD
            .decode(uri.trim_start_matches("data:image/png;base64,"))
            .unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!(back.width(), PREVIEW_MAX_EDGE);
    }

    #[test]
    fn rejects_foreign_uris() {
        assert!(!is_preview_data_uri("javascript:alert(1)"));
        assert!(!is_preview_data_uri("data:image/png;base64,"));
        assert!(!is_preview_data_uri("data:image/png;base64,abc\" onerror=\"x"));
        assert!(is_preview_data_uri("data:image/png;base64,iVBORw0KGgo="));
    }
}
