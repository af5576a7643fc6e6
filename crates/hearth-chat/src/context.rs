// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for a chat turn.
//!
//! The request is one optional system message followed by the stored
//! conversation in chronological order.

use hearth_core::{ChatMessage, HearthError, Message, Role};
use tracing::warn;

const ELLIPSIS: char = '\u{2026}';

/// Conversation title derived from the first user message.
///
/// Cuts on a character boundary and appends an ellipsis when shortened.
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut title = text[..cut].trim_end().to_string();
            title.push(ELLIPSIS);
            title
        }
    }
}

/// Memory block and user system prompt joined by a blank line.
pub fn system_message(fact_context: Option<&str>, system_prompt: &str) -> Option<ChatMessage> {
    let parts: Vec<&str> = [fact_context.unwrap_or_default(), system_prompt.trim()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(ChatMessage::new(Role::System, parts.join("\n\n")))
}

/// Build the message list sent to the model.
///
/// Stored messages that cannot be decrypted are left out.
pub fn assemble_messages(
    system: Option<ChatMessage>,
    history: Vec<Result<Message, HearthError>>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend(system);
    for entry in history {
        match entry {
            Ok(message) => messages.push(ChatMessage::new(message.role, message.content)),
            Err(e) => warn!(error = %e, "leaving unreadable message out of context"),
        }
    }
    messages
}
