//! PDF rasterisation: render the first page of an uploaded PDF via pdfium.
//!
//! pdfium wraps a C++ library with thread-local state, so the work runs on
//! `spawn_blocking`. The library itself is bound through `pdfium-auto`, which
//! downloads and caches it on first use; a missing or unloadable library is
//! reported as a decode failure for that upload rather than taking the
//! server down.
//!
//! The longest edge is capped at `max_rendered_pixels` regardless of the
//! page's physical size, which keeps a scanned A3 poster from exhausting
//! memory while staying sharp enough for OCR.

use crate::error::NoteError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Rasterise page 1 of a PDF held in memory.
pub async fn render_first_page(
    file_name: &str,
    bytes: Vec<u8>,
    max_pixels: u32,
) -> Result<DynamicImage, NoteError> {
    let name = file_name.to_string();

    tokio::task::spawn_blocking(move || render_first_page_blocking(&name, &bytes, max_pixels))
        .await
        .map_err(|e| NoteError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of first-page rendering.
fn render_first_page_blocking(
    file_name: &str,
    bytes: &[u8],
    max_pixels: u32,
) -> Result<DynamicImage, NoteError> {
    let decode_err = |detail: String| NoteError::Decode {
        file_name: file_name.to_string(),
        detail,
    };

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(decode_err(format!(
            "not a PDF (first bytes: {:?})",
            magic
        )));
    }

    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| decode_err(format!("PDF engine unavailable: {}", e)))?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            decode_err("PDF is password-protected".to_string())
        } else {
            decode_err(format!("corrupt PDF: {}", err_str))
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF '{}' loaded: {} pages, rendering page 1", file_name, total_pages);

    if total_pages == 0 {
        return Err(decode_err("PDF has no pages".to_string()));
    }

    let edge = i32::try_from(max_pixels).unwrap_or(i32::MAX);
    let render_config = PdfRenderConfig::new()
        .set_target_width(edge)
        .set_maximum_height(edge);

    let page = pages
        .get(0)
        .map_err(|e| decode_err(format!("page 1: {:?}", e)))?;

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| decode_err(format!("rasterisation failed: {:?}", e)))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_pdf_bytes_fail_before_binding_pdfium() {
        let err = render_first_page("notes.pdf", b"\x89PNG....".to_vec(), 2000)
            .await
            .unwrap_err();
        match err {
            NoteError::Decode { file_name, detail } => {
                assert_eq!(file_name, "notes.pdf");
                assert!(detail.contains("not a PDF"), "got: {detail}");
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }
}
