//! Web server binary for note-organizer.
//!
//! A thin shim over the library crate: maps CLI flags (each with an env
//! fallback) to `OrganizerConfig`, sets up logging, and serves the UI.

use anyhow::{Context, Result};
use clap::Parser;
use note_organizer::config::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use note_organizer::{web, OcrOptions, Organizer, OrganizerConfig, TesseractEngine};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on http://127.0.0.1:8501
  NVIDIA_API_KEY=nvapi-... note-organizer

  # Listen on all interfaces, German handwriting
  note-organizer --bind 0.0.0.0:8080 --ocr-lang deu

  # Retry transient API failures twice
  note-organizer --max-retries 2

ENVIRONMENT VARIABLES:
  NVIDIA_API_KEY          Bearer credential for the chat-completion API
  NVIDIA_API_URL          Override the chat-completion endpoint
  NOTE_ORGANIZER_BIND     Listen address
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  RUST_LOG                tracing filter, e.g. note_organizer=debug

REQUIREMENTS:
  The `tesseract` binary must be on PATH for text extraction.
  PDFium (~30 MB) is downloaded on the first PDF upload and cached.
"#;

/// Serve the note organizer web UI.
#[derive(Parser, Debug)]
#[command(
    name = "note-organizer",
    version,
    about = "Upload a photo of your notes, extract the text, get key points and tags",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "NOTE_ORGANIZER_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// API bearer credential.
    #[arg(long, env = "NVIDIA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat-completion endpoint.
    #[arg(long, env = "NVIDIA_API_URL", default_value = DEFAULT_ENDPOINT)]
    api_url: String,

    /// Model identifier.
    #[arg(long, env = "NOTE_ORGANIZER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Max tokens the model may generate.
    #[arg(long, env = "NOTE_ORGANIZER_MAX_TOKENS", default_value_t = 300)]
    max_tokens: u32,

    /// Sampling temperature (0.0–1.0).
    #[arg(long, env = "NOTE_ORGANIZER_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// API call timeout in seconds.
    #[arg(long, env = "NOTE_ORGANIZER_API_TIMEOUT", default_value_t = 15)]
    api_timeout: u64,

    /// Automatic retries on timeouts, 429 and 5xx (0–10).
    #[arg(long, env = "NOTE_ORGANIZER_MAX_RETRIES", default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Tesseract language, e.g. eng or eng+deu.
    #[arg(long, env = "NOTE_ORGANIZER_OCR_LANG")]
    ocr_lang: Option<String>,

    /// DPI hint for images without resolution metadata.
    #[arg(long, env = "NOTE_ORGANIZER_OCR_DPI")]
    ocr_dpi: Option<i32>,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "NOTE_ORGANIZER_OCR_PSM",
          value_parser = clap::value_parser!(i32).range(0..=13))]
    ocr_psm: Option<i32>,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "NOTE_ORGANIZER_MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTE_ORGANIZER_VERBOSE")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, env = "NOTE_ORGANIZER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    info!("Configuration: {:?}", config);

    if !config.has_api_key() {
        warn!(
            "NVIDIA_API_KEY is not set; uploads and OCR work, summarization will report a configuration error"
        );
    }

    match TesseractEngine::probe() {
        Ok(version) => info!("Tesseract {}", version.trim()),
        Err(e) => warn!("{}", e),
    }

    let organizer =
        Arc::new(Organizer::with_tesseract(config).context("Failed to initialise organizer")?);

    // ── Serve ────────────────────────────────────────────────────────────
    let app = web::router(organizer);
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;

    info!("Note organizer listening on http://{}", cli.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down");
    Ok(())
}

/// Map CLI args to `OrganizerConfig`.
fn build_config(cli: &Cli) -> Result<OrganizerConfig> {
    let ocr = OcrOptions {
        language: cli.ocr_lang.clone(),
        dpi: cli.ocr_dpi,
        page_segmentation_mode: cli.ocr_psm,
    };

    let mut builder = OrganizerConfig::builder()
        .endpoint(cli.api_url.clone())
        .model(cli.model.clone())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .max_retries(cli.max_retries)
        .ocr(ocr)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}
