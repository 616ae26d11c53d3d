//! Web front end: an axum router serving the single-page UI.
//!
//! | Route            | Event                                         |
//! |------------------|-----------------------------------------------|
//! | `GET /`          | empty session                                 |
//! | `POST /upload`   | multipart field `file` → decode + OCR         |
//! | `POST /summarize`| form `text`, `file_name`, `preview` → API call |
//! | `GET /health`    | liveness probe                                |
//!
//! Handlers always answer with a rendered page; stage failures show up on the
//! page, not as server errors.

pub mod page;

use crate::error::NoteError;
use crate::pipeline::encode::is_preview_data_uri;
use crate::session::{Organizer, SessionState, UploadView};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Headroom over the file size limit for multipart framing and the
/// base64 preview echoed back by the summarize form.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
pub fn router(organizer: Arc<Organizer>) -> Router {
    // A summarize form carries a base64 preview (~4/3 of the PNG) plus the text.
    let body_limit = organizer
        .config()
        .max_upload_bytes
        .saturating_mul(2)
        .saturating_add(BODY_OVERHEAD);

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/summarize", post(summarize))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(organizer)
}

async fn index() -> Html<String> {
    Html(page::render_page(&SessionState::default()))
}

async fn health() -> &'static str {
    "ok"
}

fn page_response(status: StatusCode, state: &SessionState) -> Response {
    (status, Html(page::render_page(state))).into_response()
}

async fn upload(State(organizer): State<Arc<Organizer>>, mut multipart: Multipart) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart upload: {}", e);
                let state = SessionState {
                    error: Some(NoteError::Decode {
                        file_name: String::new(),
                        detail: format!("Failed to read upload: {}", e),
                    }),
                    ..Default::default()
                };
                return page_response(StatusCode::BAD_REQUEST, &state);
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(data) => file = Some((file_name, data.to_vec())),
            Err(e) => {
                warn!("Failed to read file field: {}", e);
                let state = SessionState {
                    error: Some(NoteError::Decode {
                        file_name,
                        detail: format!("Failed to read file data: {}", e),
                    }),
                    ..Default::default()
                };
                return page_response(StatusCode::BAD_REQUEST, &state);
            }
        }
    }

    let Some((file_name, bytes)) = file else {
        let state = SessionState {
            error: Some(NoteError::EmptyUpload {
                file_name: String::new(),
            }),
            ..Default::default()
        };
        return page_response(StatusCode::BAD_REQUEST, &state);
    };

    debug!("Upload event: '{}' ({} bytes)", file_name, bytes.len());
    let state = organizer.handle_upload(&file_name, bytes).await;

    let status = match state.error {
        Some(NoteError::UnsupportedFormat { .. }) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Some(NoteError::UploadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(NoteError::EmptyUpload { .. }) => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    page_response(status, &state)
}

/// Fields the page posts back with the summarize button.
#[derive(Debug, Deserialize)]
pub struct SummarizeForm {
    pub text: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub preview: String,
}

async fn summarize(
    State(organizer): State<Arc<Organizer>>,
    Form(form): Form<SummarizeForm>,
) -> Response {
    let upload = (!form.file_name.is_empty()).then(|| UploadView {
        file_name: form.file_name.clone(),
        preview: is_preview_data_uri(&form.preview).then(|| form.preview.clone()),
    });

    let state = SessionState::restore(upload, &form.text);
    debug!(
        "Summarize event: {} chars, summarizable={}",
        form.text.len(),
        state.can_summarize()
    );

    let state = organizer.handle_summarize(state).await;
    page_response(StatusCode::OK, &state)
}
