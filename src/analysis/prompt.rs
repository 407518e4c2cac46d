//! Prompt construction for diff summaries.

use crate::ollama::{ChatMessage, ChatRequest};

/// System prompt used when the user does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an expert software engineer reviewing a unified git diff for a single file.
Describe every change in the diff; do not skip hunks.
For each logical change, say what was modified, added or removed, the function or
block it belongs to when that is clear, and the likely intent.
Be factual and concise. Do not invent changes that are not in the diff.";

/// Build the user message embedding the file name and the full diff.
pub fn build_user_prompt(filename: &str, diff: &str) -> String {
    format!(
        "Summarize this git diff for file: '{filename}' to prepare for a commit message.\n\
         \n\
         DIFF CONTENT:\n\
         {diff}\n\
         \n\
         Please provide a concise summary of all changes in this diff, focusing on what was \
         modified, added, or removed.\n\
         Keep it brief but informative enough to use as a basis for a good commit message.\n\
         Output only the raw analysis text, without any introduction or extra formatting."
    )
}

/// Assemble the chat request for one diff.
pub fn build_chat_request(
    model: &str,
    system_prompt: Option<&str>,
    filename: &str,
    diff: &str,
) -> ChatRequest {
    let system = system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT);
    ChatRequest::new(
        model,
        vec![
            ChatMessage::system(system),
            ChatMessage::user(build_user_prompt(filename, diff)),
        ],
    )
}
