//! HTML rendering of a [`SessionState`].
//!
//! The page is rebuilt from scratch after every event. Order on the page:
//! title, file picker, preview, extracted text, summarize button (only with
//! text), result. The summarize form carries the preview and the text back
//! to the server as hidden fields, so the session lives in the page rather
//! than in server memory.

use crate::error::SummarizeError;
use crate::pipeline::input::UploadFormat;
use crate::pipeline::llm::SummaryResult;
use crate::session::{SessionState, TextState};
use std::fmt::Write as _;

pub const TITLE: &str = "AI-powered Note Organizer";
pub const NO_TEXT_WARNING: &str = "No text detected in the image. Try a clearer or typed note.";
pub const SUMMARIZE_BUTTON: &str = "Extract Key Points &amp; Tags with NVIDIA GPT";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.8rem; }
textarea { width: 100%; font-family: ui-monospace, monospace; }
img.preview { max-width: 100%; border: 1px solid #ddd; }
figcaption { color: #666; font-size: 0.9rem; }
.warning { background: #fff8e1; border-left: 4px solid #f9a825; padding: 0.75rem; }
.error { background: #fdecea; border-left: 4px solid #d32f2f; padding: 0.75rem; white-space: pre-wrap; }
.key-points li { margin: 0.2rem 0; }
.tags span { display: inline-block; background: #e3f2fd; border-radius: 1rem; padding: 0.1rem 0.6rem; margin: 0.1rem; }
button { padding: 0.5rem 1rem; font-size: 1rem; }
"#;

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the full page for a session.
pub fn render_page(state: &SessionState) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{TITLE}</h1>\n"
    );

    render_picker(&mut html);

    if let Some(ref upload) = state.upload {
        if let Some(ref preview) = upload.preview {
            let _ = write!(
                html,
                "<figure>\n<img class=\"preview\" src=\"{}\" alt=\"Uploaded Image\">\n\
                 <figcaption>Uploaded Image: {}</figcaption>\n</figure>\n",
                escape_html(preview),
                escape_html(&upload.file_name)
            );
        }
    }

    if let Some(ref err) = state.error {
        render_error(&mut html, err.kind(), &err.to_string());
    }

    match &state.text {
        TextState::Pending => {}
        TextState::NoTextDetected => {
            let _ = writeln!(html, "<p class=\"warning\">{NO_TEXT_WARNING}</p>");
        }
        TextState::Extracted(text) => {
            let _ = write!(
                html,
                "<h2>Extracted Text</h2>\n\
                 <form method=\"post\" action=\"/summarize\">\n\
                 <label for=\"text\">Text extracted via OCR</label>\n\
                 <textarea id=\"text\" name=\"text\" rows=\"8\" readonly>\n{}</textarea>\n",
                escape_html(text.as_str())
            );
            if let Some(ref upload) = state.upload {
                let _ = write!(
                    html,
                    "<input type=\"hidden\" name=\"file_name\" value=\"{}\">\n\
                     <input type=\"hidden\" name=\"preview\" value=\"{}\">\n",
                    escape_html(&upload.file_name),
                    escape_html(upload.preview.as_deref().unwrap_or_default())
                );
            }
            let _ = writeln!(
                html,
                "<p><button type=\"submit\">{SUMMARIZE_BUTTON}</button></p>\n</form>"
            );
        }
    }

    match &state.summary {
        Some(Ok(result)) => render_summary(&mut html, result),
        Some(Err(err)) => render_summarize_error(&mut html, err),
        None => {}
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_picker(html: &mut String) {
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n\
         <label for=\"file\">Upload an image file of your notes</label><br>\n\
         <input type=\"file\" id=\"file\" name=\"file\" accept=\"{}\" required>\n\
         <button type=\"submit\">Upload</button>\n</form>\n",
        UploadFormat::accept_attribute()
    );
}

fn render_summary(html: &mut String, result: &SummaryResult) {
    let _ = write!(
        html,
        "<h2>NVIDIA GPT Extracted Key Points &amp; Tags</h2>\n\
         <label for=\"result\">Result</label>\n\
         <textarea id=\"result\" rows=\"10\" readonly>\n{}</textarea>\n",
        escape_html(result.content())
    );
    let points = result.key_points();
    if !points.is_empty() {
        html.push_str("<ul class=\"key-points\">");
        for point in &points {
            let _ = write!(html, "<li>{}</li>", escape_html(point));
        }
        html.push_str("</ul>\n");
    }
    let tags = result.tags();
    if !tags.is_empty() {
        html.push_str("<p class=\"tags\">");
        for tag in &tags {
            let _ = write!(html, "<span>{}</span>", escape_html(tag));
        }
        html.push_str("</p>\n");
    }
}

fn render_summarize_error(html: &mut String, err: &SummarizeError) {
    render_error(html, err.kind(), &err.to_string());
}

fn render_error(html: &mut String, kind: &str, message: &str) {
    let _ = writeln!(
        html,
        "<div class=\"error {}\" role=\"alert\">{}</div>",
        kind,
        escape_html(message)
    );
}
