//! Session state and the two user events that change it.
//!
//! The page is a pure function of [`SessionState`]. Each user action is one
//! event handled by [`Organizer`]:
//!
//! ```text
//!  upload ──▶ accept ──▶ decode ──▶ preview ──▶ OCR ──▶ state { text | no text | error }
//!                                                               │
//!  summarize (only with text) ──────────────────────────────────┴──▶ state { summary | error }
//! ```
//!
//! Every stage failure is stored in the returned state; nothing here returns
//! `Err` to the host, so a bad upload or a dead network never ends the
//! process.

use crate::config::OrganizerConfig;
use crate::error::{NoteError, SummarizeError};
use crate::pipeline::encode::preview_data_uri;
use crate::pipeline::input::{self, UploadedImage};
use crate::pipeline::llm::{SummaryResult, Summarizer};
use crate::pipeline::ocr::{run_ocr, ExtractedText, OcrEngine, OcrOutcome, TesseractEngine};
use std::sync::Arc;
use tracing::{info, warn};

/// What the OCR stage produced for the current upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TextState {
    /// Nothing uploaded yet, or the upload failed before OCR finished.
    #[default]
    Pending,
    /// OCR found text; summarization is available.
    Extracted(ExtractedText),
    /// OCR ran and found nothing.
    NoTextDetected,
}

/// The uploaded file as shown back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    pub file_name: String,
    /// `data:image/png;base64,…`, absent if the preview could not be built.
    pub preview: Option<String>,
}

/// Everything the page needs to render one session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub upload: Option<UploadView>,
    pub text: TextState,
    /// Input or OCR stage failure for the current upload.
    pub error: Option<NoteError>,
    /// Outcome of the last summarize event, if any.
    pub summary: Option<Result<SummaryResult, SummarizeError>>,
}

impl SessionState {
    /// Rebuild state from what the page sends back with a summarize event.
    ///
    /// Blank text yields [`TextState::NoTextDetected`], so a forged request
    /// cannot reach the API without text. Browsers submit form line breaks as
    /// CRLF; they are turned back into `\n` here.
    pub fn restore(upload: Option<UploadView>, text: &str) -> Self {
        let text = match ExtractedText::new(text.replace("\r\n", "\n")) {
            Some(t) => TextState::Extracted(t),
            None => TextState::NoTextDetected,
        };
        Self {
            upload,
            text,
            error: None,
            summary: None,
        }
    }

    /// The summarize action is offered only when non-blank text exists.
    pub fn can_summarize(&self) -> bool {
        matches!(self.text, TextState::Extracted(_))
    }

    pub fn extracted_text(&self) -> Option<&ExtractedText> {
        match &self.text {
            TextState::Extracted(t) => Some(t),
            _ => None,
        }
    }
}

/// The pipeline host: owns configuration, the OCR engine and the API client.
pub struct Organizer {
    config: OrganizerConfig,
    ocr: Arc<dyn OcrEngine>,
    summarizer: Summarizer,
}

impl Organizer {
    /// Build with an explicit OCR engine.
    pub fn new(config: OrganizerConfig, ocr: Arc<dyn OcrEngine>) -> Result<Self, NoteError> {
        let summarizer = Summarizer::new(&config)?;
        Ok(Self {
            config,
            ocr,
            summarizer,
        })
    }

    /// Build with Tesseract configured from `config.ocr`.
    pub fn with_tesseract(config: OrganizerConfig) -> Result<Self, NoteError> {
        let engine = TesseractEngine::new(config.ocr.clone());
        Self::new(config, Arc::new(engine))
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Upload event: accept, decode, preview, OCR.
    pub async fn handle_upload(&self, file_name: &str, bytes: Vec<u8>) -> SessionState {
        let mut state = SessionState::default();

        let upload = match UploadedImage::accept(file_name, bytes, self.config.max_upload_bytes) {
            Ok(u) => u,
            Err(e) => {
                warn!("Upload rejected: {}", e);
                state.error = Some(e);
                return state;
            }
        };

        let mut view = UploadView {
            file_name: upload.file_name().to_string(),
            preview: None,
        };

        let decoded = match input::decode(&upload, &self.config).await {
            Ok(d) => d,
            Err(e) => {
                warn!("Decoding '{}' failed: {}", upload.file_name(), e);
                state.upload = Some(view);
                state.error = Some(e);
                return state;
            }
        };

        match preview_data_uri(&decoded) {
            Ok(uri) => view.preview = Some(uri),
            Err(e) => warn!("Preview unavailable for '{}': {}", upload.file_name(), e),
        }
        state.upload = Some(view);

        match run_ocr(Arc::clone(&self.ocr), &decoded).await {
            Ok(OcrOutcome::Text(text)) => state.text = TextState::Extracted(text),
            Ok(OcrOutcome::NoTextDetected) => state.text = TextState::NoTextDetected,
            Err(e) => {
                warn!("OCR failed for '{}': {}", upload.file_name(), e);
                state.error = Some(e);
            }
        }
        state
    }

    /// Summarize event: one fresh API call, only when text is present.
    pub async fn handle_summarize(&self, mut state: SessionState) -> SessionState {
        let Some(text) = state.extracted_text() else {
            info!("Summarize ignored: no extracted text in session");
            return state;
        };

        let outcome = self.summarizer.summarize(text).await;
        if let Err(ref e) = outcome {
            warn!("Summarization failed ({}): {}", e.kind(), e);
        }
        state.summary = Some(outcome);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    struct FixedEngine(&'static str);

    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn extract_text(&self, _image: &DynamicImage) -> Result<String, NoteError> {
            Ok(self.0.to_string())
        }
    }

    fn organizer(text: &'static str) -> Organizer {
        Organizer::new(OrganizerConfig::default(), Arc::new(FixedEngine(text))).unwrap()
    }

    fn png() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(5, 5)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn restore_gates_on_text() {
        assert!(SessionState::restore(None, "hello").can_summarize());
        assert!(!SessionState::restore(None, "  \n").can_summarize());
        assert!(!SessionState::default().can_summarize());
    }

    #[test]
    fn restore_turns_form_line_breaks_back_into_newlines() {
        let state = SessionState::restore(None, "Line one\r\nLine two\r\n");
        assert_eq!(
            state.extracted_text().map(ExtractedText::as_str),
            Some("Line one\nLine two\n")
        );
    }

    #[tokio::test]
    async fn upload_with_text_enables_summary() {
        let state = organizer("Project kickoff\n").handle_upload("n.png", png()).await;
        assert!(state.error.is_none());
        assert!(state.can_summarize());
        let upload = state.upload.expect("upload view");
        assert_eq!(upload.file_name, "n.png");
        assert!(upload.preview.unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn blank_upload_is_no_text_detected() {
        let state = organizer(" \n").handle_upload("n.png", png()).await;
        assert_eq!(state.text, TextState::NoTextDetected);
        assert!(!state.can_summarize());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn unsupported_upload_records_error_without_preview() {
        let state = organizer("text").handle_upload("n.gif", png()).await;
        assert!(state.upload.is_none());
        assert_eq!(state.error.as_ref().map(NoteError::kind), Some("unsupported_format"));
        assert_eq!(state.text, TextState::Pending);
    }

    #[tokio::test]
    async fn summarize_without_text_makes_no_call() {
        let org = organizer("text");
        let state = org
            .handle_summarize(SessionState::restore(None, "   "))
            .await;
        assert!(state.summary.is_none());
    }

    #[tokio::test]
    async fn summarize_without_key_reports_missing_credential() {
        let org = organizer("text");
        let state = org.handle_summarize(SessionState::restore(None, "notes")).await;
        assert!(matches!(
            state.summary,
            Some(Err(SummarizeError::MissingCredential))
        ));
    }
}
