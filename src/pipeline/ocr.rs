//! OCR stage: turn a decoded raster into plain text.
//!
//! The engine is a trait object so any "image → text" implementation can
//! stand in: the default drives Tesseract through `rusty-tesseract`, tests
//! use a fixed-string engine. Engines are blocking, so [`run_ocr`] moves the
//! call onto tokio's blocking pool.
//!
//! A blank result is a normal outcome ([`OcrOutcome::NoTextDetected`]), not an
//! error. [`ExtractedText`] can only be built from non-blank text, which is
//! what lets the summarization stage assume it has something to send.

use crate::config::OcrOptions;
use crate::error::NoteError;
use crate::pipeline::input::DecodedImage;
use image::DynamicImage;
use rusty_tesseract::{Args, Image as TesseractImage};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Anything that can read text out of an image.
pub trait OcrEngine: Send + Sync {
    /// Engine identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Extract all text from the image. May block.
    fn extract_text(&self, image: &DynamicImage) -> Result<String, NoteError>;
}

/// OCR text guaranteed to contain at least one non-whitespace character.
///
/// The raw engine output is kept as-is (line breaks, trailing newline) since
/// that is what gets shown and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// `None` for empty or whitespace-only text.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful OCR run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// Readable text was found.
    Text(ExtractedText),
    /// The engine ran but returned nothing but whitespace.
    NoTextDetected,
}

impl OcrOutcome {
    pub fn from_raw(raw: String) -> Self {
        match ExtractedText::new(raw) {
            Some(text) => OcrOutcome::Text(text),
            None => OcrOutcome::NoTextDetected,
        }
    }
}

/// Run the engine on the blocking pool and classify the result.
pub async fn run_ocr(
    engine: Arc<dyn OcrEngine>,
    decoded: &DecodedImage,
) -> Result<OcrOutcome, NoteError> {
    let image = decoded.image().clone();
    let name = engine.name();
    info!(
        "Extracting text with {} ({}x{} px)",
        name,
        image.width(),
        image.height()
    );

    let raw = tokio::task::spawn_blocking(move || engine.extract_text(&image))
        .await
        .map_err(|e| NoteError::Internal(format!("OCR task panicked: {}", e)))??;

    let outcome = OcrOutcome::from_raw(raw);
    match &outcome {
        OcrOutcome::Text(text) => info!("{} extracted {} characters", name, text.as_str().len()),
        OcrOutcome::NoTextDetected => warn!("{} found no text in the image", name),
    }
    Ok(outcome)
}

// ── Tesseract ────────────────────────────────────────────────────────────

/// OCR through the `tesseract` command-line binary.
///
/// Without any [`OcrOptions`] set, Tesseract's own defaults apply.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    options: OcrOptions,
}

impl TesseractEngine {
    pub fn new(options: OcrOptions) -> Self {
        Self { options }
    }

    /// Installed Tesseract version, or an error when the binary is missing.
    pub fn probe() -> Result<String, NoteError> {
        rusty_tesseract::get_tesseract_version().map_err(|e| NoteError::OcrEngine {
            engine: "tesseract",
            detail: e.to_string(),
        })
    }

    fn args(&self) -> Args {
        let mut args = Args::default();
        if let Some(ref lang) = self.options.language {
            args.lang = lang.clone();
        }
        if let Some(dpi) = self.options.dpi {
            args.dpi = Some(dpi);
        }
        if let Some(psm) = self.options.page_segmentation_mode {
            args.psm = Some(psm);
        }
        args
    }

    fn engine_err(detail: impl fmt::Display) -> NoteError {
        NoteError::OcrEngine {
            engine: "tesseract",
            detail: detail.to_string(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(OcrOptions::default())
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn extract_text(&self, image: &DynamicImage) -> Result<String, NoteError> {
        // Hand tesseract a PNG on disk; the temp file is removed on drop.
        let file = tempfile::Builder::new()
            .prefix("note-organizer-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| NoteError::Internal(format!("tempfile: {e}")))?;

        image
            .save_with_format(file.path(), image::ImageFormat::Png)
            .map_err(|e| NoteError::Internal(format!("Failed to stage image for OCR: {e}")))?;

        let tess_image = TesseractImage::from_path(file.path()).map_err(Self::engine_err)?;
        let args = self.args();
        debug!(
            "tesseract lang={} dpi={:?} psm={:?}",
            args.lang, args.dpi, args.psm
        );

        rusty_tesseract::image_to_string(&tess_image, &args).map_err(Self::engine_err)
    }
}
