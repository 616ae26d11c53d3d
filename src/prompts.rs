//! Prompts sent to the chat-completion service.
//!
//! Both messages are fixed text; only the extracted notes vary between
//! requests. Keeping them here lets tests inspect the exact wording without a
//! live model.

/// Instruction carried by the `context` message.
pub const CONTEXT_PROMPT: &str =
    "You are an assistant that extracts key points and tags from notes.";

/// Build the `user` message embedding the full extracted text.
pub fn notes_prompt(text: &str) -> String {
    format!(
        "Extract key points and relevant tags from the following notes:\n\n\
         {}\n\n\
         Provide the key points as bullet points and tags as a comma-separated list.",
        text
    )
}
