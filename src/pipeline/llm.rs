//! Summarization stage: send the extracted notes to the chat-completion API.
//!
//! One request carries exactly two messages (a `context` instruction and the
//! `user` prompt embedding the notes). The reply's
//! `choices[0].message.content` is trimmed and returned as a
//! [`SummaryResult`]. Prompt wording lives in [`crate::prompts`].
//!
//! ## Failure classification
//!
//! Transport errors are sorted into [`SummarizeError`] variants by walking the
//! `reqwest` error chain: a `rustls` error anywhere in it (or a message naming
//! a certificate or handshake) is a TLS failure; a timeout is a timeout;
//! everything else is an unknown request error. Non-2xx responses become
//! `HttpStatus` with the raw body attached.
//!
//! ## Retry
//!
//! Off by default: the user re-triggers manually. With `max_retries > 0`,
//! transient failures (timeout, 429, 5xx) are retried after
//! `retry_backoff_ms * 2^attempt`.

use crate::config::OrganizerConfig;
use crate::error::{NoteError, SummarizeError};
use crate::pipeline::ocr::ExtractedText;
use crate::prompts::{notes_prompt, CONTEXT_PROMPT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

// ── Wire types ───────────────────────────────────────────────────────────

/// Message role understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Context,
    User,
}

/// One role-tagged entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRequestPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl SummaryRequestPayload {
    /// Build the two-message request for a set of notes.
    pub fn for_notes(text: &ExtractedText, config: &OrganizerConfig) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: Role::Context,
                    content: CONTEXT_PROMPT.to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: notes_prompt(text.as_str()),
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// ── Result ───────────────────────────────────────────────────────────────

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").unwrap());

static TAGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*_#>-]*(?:relevant\s+)?tags[\s*_]*:[\s*_]*(.+)$").unwrap()
});

/// Key points and tags returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    content: String,
}

impl SummaryResult {
    /// Wrap raw model output, trimming surrounding whitespace.
    pub fn new(content: &str) -> Self {
        Self {
            content: content.trim().to_string(),
        }
    }

    /// The trimmed content as returned by the service.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Bullet or numbered lines, without their markers. Tag lines are skipped.
    pub fn key_points(&self) -> Vec<String> {
        self.content
            .lines()
            .filter(|line| !TAGS_RE.is_match(line))
            .filter_map(|line| BULLET_RE.captures(line))
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Entries of the first `Tags:` line, split on commas.
    pub fn tags(&self) -> Vec<String> {
        TAGS_RE
            .captures(&self.content)
            .map(|c| {
                c[1].split(',')
                    .map(|t| t.trim().trim_matches(|ch: char| ch == '*' || ch == '#' || ch == '`'))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for SummaryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// HTTP client for the chat-completion service.
///
/// Built once at startup from [`OrganizerConfig`]; every call to
/// [`Summarizer::summarize`] is an independent request, nothing is cached.
pub struct Summarizer {
    client: reqwest::Client,
    config: OrganizerConfig,
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

impl Summarizer {
    pub fn new(config: &OrganizerConfig) -> Result<Self, NoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| NoteError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Request key points and tags for `text`.
    pub async fn summarize(&self, text: &ExtractedText) -> Result<SummaryResult, SummarizeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SummarizeError::MissingCredential)?;

        let payload = SummaryRequestPayload::for_notes(text, &self.config);
        let start = Instant::now();
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay_ms(self.config.retry_backoff_ms, attempt);
                warn!(
                    "Summary: retry {}/{} after {}ms",
                    attempt, self.config.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.send_once(api_key, &payload).await {
                Ok(result) => {
                    info!(
                        "Summary received: {} chars in {:?} ({} retries)",
                        result.content().len(),
                        start.elapsed(),
                        attempt
                    );
                    return Ok(result);
                }
                Err(e) => {
                    warn!("Summary: attempt {} failed ({}): {}", attempt + 1, e.kind(), e);
                    let retry = e.is_transient();
                    last_err = Some(e);
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SummarizeError::UnknownRequest {
            detail: "no attempt was made".to_string(),
        }))
    }

    async fn send_once(
        &self,
        api_key: &str,
        payload: &SummaryRequestPayload,
    ) -> Result<SummaryResult, SummarizeError> {
        debug!(
            "POST {} model={} prompt_chars={}",
            self.config.endpoint,
            payload.model,
            payload.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, self.config.api_timeout_secs))?;

        let status = response.status();
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e, self.config.api_timeout_secs))?;

        if !status.is_success() {
            return Err(SummarizeError::HttpStatus {
                status: status.as_u16(),
                url,
                body,
            });
        }

        parse_completion(&body)
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Extract `choices[0].message.content` from a response body.
pub fn parse_completion(body: &str) -> Result<SummaryResult, SummarizeError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| SummarizeError::UnknownRequest {
            detail: format!("malformed JSON response: {}", e),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| SummaryResult::new(&content))
        .ok_or_else(|| SummarizeError::UnknownRequest {
            detail: "response has no choices[0].message.content".to_string(),
        })
}

/// Sort a transport-level `reqwest` failure into a [`SummarizeError`].
fn classify_transport_error(err: &reqwest::Error, timeout_secs: u64) -> SummarizeError {
    let detail = error_chain_text(err);
    if err.source().map(is_tls_failure).unwrap_or(false) {
        SummarizeError::Tls { detail }
    } else if err.is_timeout() {
        SummarizeError::Timeout { secs: timeout_secs }
    } else {
        SummarizeError::UnknownRequest { detail }
    }
}

/// Whether any error in the chain came from the TLS layer.
///
/// The top-level reqwest message is excluded by the caller since it embeds
/// the URL, which could contain anything.
pub(crate) fn is_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
        // io::Error::source() skips the wrapped error, so look inside explicitly.
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if let Some(inner) = io.get_ref() {
                if inner.downcast_ref::<rustls::Error>().is_some() {
                    return true;
                }
            }
        }
        let msg = e.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| msg.contains(needle))
        {
            return true;
        }
        current = e.source();
    }
    false
}

/// `outer: inner: innermost`, for user-facing detail.
fn error_chain_text(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        let s = e.to_string();
        if !parts.iter().any(|p| p.contains(&s)) {
            parts.push(s);
        }
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn notes() -> ExtractedText {
        ExtractedText::new("Buy milk\nCall Alice about the Q3 budget\n").unwrap()
    }

    #[test]
    fn payload_shape_is_fixed() {
        let config = OrganizerConfig::default();
        let p = SummaryRequestPayload::for_notes(&notes(), &config);
        assert_eq!(p.model, "nvidia/llama3-chatqa-1.5-8b");
        assert_eq!(p.max_tokens, 300);
        assert_eq!(p.temperature, 0.3);
        assert_eq!(p.messages.len(), 2);
        assert_eq!(p.messages[0].role, Role::Context);
        assert_eq!(p.messages[0].content, CONTEXT_PROMPT);
        assert_eq!(p.messages[1].role, Role::User);
        assert!(p.messages[1].content.contains("Call Alice about the Q3 budget"));
    }

    #[test]
    fn payload_serialises_roles_lowercase() {
        let p = SummaryRequestPayload::for_notes(&notes(), &OrganizerConfig::default());
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["messages"][0]["role"], "context");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["max_tokens"], 300);
        assert_eq!(v["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(3.0));
    }

    #[test]
    fn long_text_still_two_messages() {
        let long = "word ".repeat(20_000);
        let p = SummaryRequestPayload::for_notes(
            &ExtractedText::new(long).unwrap(),
            &OrganizerConfig::default(),
        );
        assert_eq!(p.messages.len(), 2);
    }

    #[test]
    fn parse_completion_trims_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  - point one\n- point two\nTags: a, b \n"}}]}"#;
        let r = parse_completion(body).unwrap();
        assert_eq!(r.content(), "- point one\n- point two\nTags: a, b");
    }

    #[test]
    fn parse_completion_shape_errors_are_unknown() {
        for body in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"object":"list"}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
        ] {
            let err = parse_completion(body).unwrap_err();
            assert_eq!(err.kind(), "unknown_request_error", "body: {body}");
        }
    }

    #[test]
    fn key_points_and_tags() {
        let r = SummaryResult::new(
            "Key points:\n- Buy milk\n* Call Alice\n2. Review budget\n\n**Tags:** groceries, work ,  finance",
        );
        assert_eq!(r.key_points(), vec!["Buy milk", "Call Alice", "Review budget"]);
        assert_eq!(r.tags(), vec!["groceries", "work", "finance"]);
    }

    #[test]
    fn no_tags_line_means_no_tags() {
        let r = SummaryResult::new("- only a point");
        assert!(r.tags().is_empty());
        assert_eq!(r.key_points(), vec!["only a point"]);
    }

    #[test]
    fn bulleted_tags_line_is_not_a_key_point() {
        let r = SummaryResult::new("- point\n- Tags: a, b");
        assert_eq!(r.key_points(), vec!["point"]);
        assert_eq!(r.tags(), vec!["a", "b"]);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay_ms(500, 1), 500);
        assert_eq!(backoff_delay_ms(500, 2), 1000);
        assert_eq!(backoff_delay_ms(500, 4), 4000);
        assert_eq!(backoff_delay_ms(0, 70), 0);
        assert_eq!(backoff_delay_ms(500, 70), u64::MAX);
        assert_eq!(backoff_delay_ms(u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn tls_detected_through_io_error() {
        let rustls_err = rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer);
        let io_err = io::Error::new(io::ErrorKind::InvalidData, rustls_err);
        assert!(is_tls_failure(&io_err));
    }

    #[test]
    fn connection_refused_is_not_tls() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused");
        assert!(!is_tls_failure(&io_err));
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        // Endpoint is unroutable; reaching the network would be a different error.
        let config = OrganizerConfig::builder()
            .endpoint("http://127.0.0.1:9/v1/chat/completions")
            .build()
            .unwrap();
        let s = Summarizer::new(&config).unwrap();
        let err = s.summarize(&notes()).await.unwrap_err();
        assert!(matches!(err, SummarizeError::MissingCredential));
    }
}
