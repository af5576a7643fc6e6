// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw row types as stored on disk.
//!
//! Sensitive columns are still sealed here. [`crate::Store`] is the only
//! place they are opened.

/// A `conversations` row with the title still encrypted.
#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: String,
    pub title: Vec<u8>,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A `messages` row with the content still encrypted.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: Vec<u8>,
    pub timestamp: String,
}

/// A `facts` row with the subject still encrypted.
#[derive(Debug, Clone)]
pub struct FactRow {
    pub id: String,
    pub subject: Vec<u8>,
    pub created_at: String,
    pub source_message_id: Option<String>,
}
