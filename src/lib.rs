//! # note-organizer
//!
//! Upload a photo (or PDF scan) of handwritten or printed notes, read the
//! text with OCR, and, when asked, have a chat-completion model turn it into
//! bullet-point key points and a comma-separated tag list.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Input      check extension, decode png/jpg/bmp/tiff, rasterise pdf
//!  ├─ 2. Preview    re-encode as PNG data URI for the page
//!  ├─ 3. OCR        Tesseract (or any OcrEngine) → text / no text detected
//!  └─ 4. Summarize  on user request only: POST to the chat-completion API
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use note_organizer::{Organizer, OrganizerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads NVIDIA_API_KEY
//!     let organizer = Organizer::with_tesseract(OrganizerConfig::from_env())?;
//!     let bytes = std::fs::read("notes.png")?;
//!     let state = organizer.handle_upload("notes.png", bytes).await;
//!     if state.can_summarize() {
//!         let state = organizer.handle_summarize(state).await;
//!         if let Some(Ok(summary)) = state.summary {
//!             println!("{}", summary);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The web UI ([`web`]) and the `note-organizer` binary (axum + clap + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod session;
#[cfg(feature = "server")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrOptions, OrganizerConfig, OrganizerConfigBuilder};
pub use error::{NoteError, SummarizeError};
pub use pipeline::input::{DecodedImage, UploadFormat, UploadedImage};
pub use pipeline::llm::{SummaryRequestPayload, SummaryResult, Summarizer};
pub use pipeline::ocr::{ExtractedText, OcrEngine, OcrOutcome, TesseractEngine};
pub use session::{Organizer, SessionState, TextState, UploadView};
