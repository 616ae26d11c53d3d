//! Error types for the note-organizer library.
//!
//! Two error types mirror the two halves of the pipeline:
//!
//! * [`NoteError`]: the upload could not be turned into text (unsupported
//!   file, undecodable bytes, OCR engine failure) or the configuration is
//!   invalid.
//!
//! * [`SummarizeError`]: the remote chat-completion call failed. Each variant
//!   maps to a different message on the page so a user can tell a bad
//!   certificate from a rejected key from a dead network.
//!
//! A blank page is *not* an error: see [`crate::pipeline::ocr::OcrOutcome`].
//! None of these errors is fatal to the running server; every one is rendered
//! back to the user, who can re-upload or re-trigger.

use thiserror::Error;

/// Failures of the input and OCR stages, plus configuration errors.
#[derive(Debug, Error)]
pub enum NoteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The file extension is not one of png, jpg, jpeg, bmp, tiff, pdf.
    #[error("Unsupported file type '{file_name}'.\nUpload a png, jpg, jpeg, bmp, tiff or pdf file.")]
    UnsupportedFormat { file_name: String },

    /// The upload carried no bytes.
    #[error("The uploaded file '{file_name}' is empty.")]
    EmptyUpload { file_name: String },

    /// The upload exceeds the configured size limit.
    #[error("The uploaded file is {size} bytes; the limit is {limit} bytes.")]
    UploadTooLarge { size: usize, limit: usize },

    /// The bytes are not a valid image (or PDF) of the declared format.
    #[error("Could not read '{file_name}' as an image: {detail}")]
    Decode { file_name: String, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine is missing or failed internally.
    #[error("Text extraction with {engine} failed: {detail}\nCheck that {engine} is installed and on PATH.")]
    OcrEngine { engine: &'static str, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NoteError {
    /// Short, stable name used in logs and as a CSS class on the page.
    pub fn kind(&self) -> &'static str {
        match self {
            NoteError::UnsupportedFormat { .. } => "unsupported_format",
            NoteError::EmptyUpload { .. } => "empty_upload",
            NoteError::UploadTooLarge { .. } => "upload_too_large",
            NoteError::Decode { .. } => "decode_error",
            NoteError::OcrEngine { .. } => "ocr_engine_error",
            NoteError::InvalidConfig(_) => "invalid_config",
            NoteError::Internal(_) => "internal",
        }
    }
}

/// Failures of the summarization call.
#[derive(Debug, Clone, Error)]
pub enum SummarizeError {
    /// No API key was configured at startup.
    #[error("NVIDIA API key is not configured.\nSet the NVIDIA_API_KEY environment variable and restart the server.")]
    MissingCredential,

    /// The secure channel could not be established (certificate or handshake).
    #[error("SSL certificate verification failed. Check your network or try again later.\nDetail: {detail}")]
    Tls { detail: String },

    /// The service answered with a non-2xx status.
    #[error("HTTP error occurred: {status} for url: {url} - {body}")]
    HttpStatus { status: u16, url: String, body: String },

    /// The call did not complete within the configured timeout.
    #[error("API request timed out after {secs}s. Try again.")]
    Timeout { secs: u64 },

    /// Any other failure: DNS, refused connection, malformed response body.
    #[error("API request failed: {detail}")]
    UnknownRequest { detail: String },
}

impl SummarizeError {
    /// Short, stable name used in logs and as a CSS class on the page.
    pub fn kind(&self) -> &'static str {
        match self {
            SummarizeError::MissingCredential => "missing_credential",
            SummarizeError::Tls { .. } => "tls_error",
            SummarizeError::HttpStatus { .. } => "http_status_error",
            SummarizeError::Timeout { .. } => "timeout",
            SummarizeError::UnknownRequest { .. } => "unknown_request_error",
        }
    }

    /// Whether an automatic retry may help: timeouts, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            SummarizeError::Timeout { .. } => true,
            SummarizeError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
