//! Configuration for the note organizer.
//!
//! Every knob lives in [`OrganizerConfig`], built once at startup through its
//! [`OrganizerConfigBuilder`] and then shared read-only by every request. The
//! API credential is part of this struct and is never read from the
//! environment mid-call.

use crate::error::NoteError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default chat-completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://integrate.api.nvidia.com/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "nvidia/llama3-chatqa-1.5-8b";

/// Environment variable holding the bearer credential.
pub const API_KEY_ENV: &str = "NVIDIA_API_KEY";

/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Upper bound for `max_upload_bytes` (1 GiB).
pub const MAX_UPLOAD_LIMIT: usize = 1024 * 1024 * 1024;

/// Bounds for `max_rendered_pixels`.
pub const MIN_RENDERED_PIXELS: u32 = 100;
pub const MAX_RENDERED_PIXELS: u32 = 10_000;

/// Configuration for the upload → OCR → summary pipeline.
///
/// # Example
/// ```rust
/// use note_organizer::OrganizerConfig;
///
/// let config = OrganizerConfig::builder()
///     .api_key("nvapi-test")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 300);
/// ```
#[derive(Clone)]
pub struct OrganizerConfig {
    /// Bearer credential for the chat-completion API. `None` means the
    /// summarization stage reports a configuration error instead of calling out.
    pub api_key: Option<String>,

    /// Chat-completion endpoint URL.
    pub endpoint: String,

    /// Model identifier sent in every request. Default: `nvidia/llama3-chatqa-1.5-8b`.
    pub model: String,

    /// Maximum tokens the model may generate. Default: 300.
    pub max_tokens: u32,

    /// Sampling temperature, 0.0–1.0. Default: 0.3.
    pub temperature: f32,

    /// Per-call timeout in seconds. Default: 15.
    pub api_timeout_secs: u64,

    /// Retries on transient failures (timeout, 429, 5xx). Default: 0.
    ///
    /// The user re-triggers manually by default; raise this for unattended use.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// OCR engine tuning. All fields default to "engine default".
    pub ocr: OcrOptions,

    /// Longest edge in pixels when rasterising a PDF page. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Largest accepted upload in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 300,
            temperature: 0.3,
            api_timeout_secs: 15,
            max_retries: 0,
            retry_backoff_ms: 500,
            ocr: OcrOptions::default(),
            max_rendered_pixels: 2000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for OrganizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganizerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("ocr", &self.ocr)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl OrganizerConfig {
    /// Create a new builder for `OrganizerConfig`.
    pub fn builder() -> OrganizerConfigBuilder {
        OrganizerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus the credential from `NVIDIA_API_KEY` (empty counts as unset).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());
        config
    }

    /// Whether a credential is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Builder for [`OrganizerConfig`].
#[derive(Debug)]
pub struct OrganizerConfigBuilder {
    config: OrganizerConfig,
}

impl OrganizerConfigBuilder {
    /// Set the credential. Blank strings are treated as "no credential".
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn ocr(mut self, options: OcrOptions) -> Self {
        self.config.ocr = options;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(MIN_RENDERED_PIXELS, MAX_RENDERED_PIXELS);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OrganizerConfig, NoteError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.temperature) {
            return Err(NoteError::InvalidConfig(format!(
                "temperature must be 0.0–1.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(NoteError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(NoteError::InvalidConfig(
                "api timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(NoteError::InvalidConfig(
                "upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.max_upload_bytes > MAX_UPLOAD_LIMIT {
            return Err(NoteError::InvalidConfig(format!(
                "upload limit must be ≤ {} bytes, got {}",
                MAX_UPLOAD_LIMIT, c.max_upload_bytes
            )));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(NoteError::InvalidConfig(format!(
                "max_retries must be ≤ {}, got {}",
                MAX_RETRIES_LIMIT, c.max_retries
            )));
        }
        match reqwest::Url::parse(&c.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(NoteError::InvalidConfig(format!(
                    "endpoint must be http(s), got scheme '{}'",
                    url.scheme()
                )))
            }
            Err(e) => {
                return Err(NoteError::InvalidConfig(format!(
                    "endpoint '{}' is not a valid URL: {}",
                    c.endpoint, e
                )))
            }
        }
        if let Some(psm) = c.ocr.page_segmentation_mode {
            if !(0..=13).contains(&psm) {
                return Err(NoteError::InvalidConfig(format!(
                    "page segmentation mode must be 0–13, got {}",
                    psm
                )));
            }
        }
        Ok(self.config)
    }
}

/// Optional OCR tuning. `None` everywhere means "let the engine decide".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOptions {
    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    pub language: Option<String>,
    /// DPI hint for images without resolution metadata.
    pub dpi: Option<i32>,
    /// Tesseract page segmentation mode (0–13).
    pub page_segmentation_mode: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let c = OrganizerConfig::default();
        assert_eq!(c.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.model, "nvidia/llama3-chatqa-1.5-8b");
        assert_eq!(c.max_tokens, 300);
        assert_eq!(c.temperature, 0.3);
        assert_eq!(c.api_timeout_secs, 15);
        assert_eq!(c.max_retries, 0);
        assert_eq!(c.ocr, OcrOptions::default());
    }

    #[test]
    fn blank_api_key_is_absent() {
        let c = OrganizerConfig::builder().api_key("   ").build().unwrap();
        assert!(!c.has_api_key());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = OrganizerConfig::builder()
            .api_key("nvapi-secret")
            .build()
            .unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("nvapi-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let err = OrganizerConfig::builder().temperature(1.5).build().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        assert!(OrganizerConfig::builder()
            .endpoint("ftp://example.com/x")
            .build()
            .is_err());
        assert!(OrganizerConfig::builder()
            .endpoint("not a url")
            .build()
            .is_err());
    }

    #[test]
    fn rejects_zero_timeout_and_tokens() {
        assert!(OrganizerConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(OrganizerConfig::builder().max_tokens(0).build().is_err());
    }

    #[test]
    fn rejects_excessive_retries() {
        assert!(OrganizerConfig::builder()
            .max_retries(MAX_RETRIES_LIMIT)
            .build()
            .is_ok());
        let err = OrganizerConfig::builder()
            .max_retries(70)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn rejects_huge_upload_limit() {
        assert!(OrganizerConfig::builder()
            .max_upload_bytes(usize::MAX)
            .build()
            .is_err());
        assert!(OrganizerConfig::builder()
            .max_upload_bytes(MAX_UPLOAD_LIMIT)
            .build()
            .is_ok());
    }

    #[test]
    fn rendered_pixels_are_clamped() {
        let c = OrganizerConfig::builder()
            .max_rendered_pixels(u32::MAX)
            .build()
            .unwrap();
        assert_eq!(c.max_rendered_pixels, MAX_RENDERED_PIXELS);
        assert!(i32::try_from(c.max_rendered_pixels).is_ok());

        let c = OrganizerConfig::builder()
            .max_rendered_pixels(1)
            .build()
            .unwrap();
        assert_eq!(c.max_rendered_pixels, MIN_RENDERED_PIXELS);
    }

    #[test]
    fn rejects_bad_psm() {
        let ocr = OcrOptions {
            page_segmentation_mode: Some(42),
            ..Default::default()
        };
        assert!(OrganizerConfig::builder().ocr(ocr).build().is_err());
    }
}
