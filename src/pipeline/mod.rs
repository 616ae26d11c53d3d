//! Pipeline stages for turning a photo of notes into key points and tags.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ llm
//! (upload)  (pdfium)   (preview)  (text)  (summary)
//! ```
//!
//! 1. [`input`]: validate the extension and decode raster bytes
//! 2. [`render`]: rasterise page 1 of a PDF; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]: PNG-encode and base64-wrap the decoded image for display
//! 4. [`ocr`]: extract text through a pluggable engine (Tesseract by default)
//! 5. [`llm`]: the chat-completion call; the only stage with network I/O

pub mod encode;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod render;
