// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the engine's HTTP API.
//!
//! The engine omits fields freely, so everything on the response side is
//! optional and defaulted.

use hearth_core::{ChatMessage, ModelDetails, ModelInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// One line of a `/api/chat` response (the whole body when not streaming).
#[derive(Debug, Default, Deserialize)]
pub struct ChatLine {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub message: Option<ChatLineMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatLineMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    pub name: &'a str,
    pub stream: bool,
}

/// One line of a `/api/pull` progress stream.
#[derive(Debug, Default, Deserialize)]
pub struct PullLine {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Option<Vec<TagModel>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagModel {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub modified_at: Option<String>,
    pub digest: Option<String>,
    pub details: Option<TagDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

/// Body of an error status, e.g. `{"error": "model not found"}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<TagModel> for ModelInfo {
    fn from(m: TagModel) -> Self {
        ModelInfo {
            name: m.name.unwrap_or_default(),
            size: m.size.unwrap_or(0),
            modified_at: m.modified_at.unwrap_or_default(),
            digest: m.digest.unwrap_or_default(),
            details: m.details.map(|d| ModelDetails {
                format: d.format,
                family: d.family,
                parameter_size: d.parameter_size,
                quantization_level: d.quantization_level,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_tags_entry_fills_defaults() {
        let tags: TagsResponse =
            serde_json::from_str(r#"{"models":[{"name":"llama3:8b"}]}"#).unwrap();
        let info: ModelInfo = tags.models.unwrap().remove(0).into();
        assert_eq!(info.name, "llama3:8b");
        assert_eq!(info.size, 0);
        assert!(info.details.is_none());
    }

    #[test]
    fn chat_line_tolerates_missing_message() {
        let line: ChatLine = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(line.done);
        assert!(line.message.is_none());
    }
}
