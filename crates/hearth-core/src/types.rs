// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across Hearth crates.
//!
//! Content-bearing fields in these types hold plaintext. They exist only in
//! memory; the storage layer encrypts them before they reach disk.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Author of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A conversation thread.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("title", &format_args!("<{} chars>", self.title.chars().count()))
            .field("model", &self.model)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A single message within a conversation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("conversation_id", &self.conversation_id)
            .field("role", &self.role)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// A durable statement about the user, reused as prompt context.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub subject: String,
    pub created_at: String,
    /// Weak reference to the message the fact was extracted from.
    pub source_message_id: Option<String>,
}

impl std::fmt::Debug for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fact")
            .field("id", &self.id)
            .field("subject", &format_args!("<{} bytes>", self.subject.len()))
            .field("created_at", &self.created_at)
            .field("source_message_id", &self.source_message_id)
            .finish()
    }
}

/// User-facing application settings, persisted as a singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default)]
    pub setup_complete: bool,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default = "default_engine_host")]
    pub engine_host: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            default_model: default_model(),
            setup_complete: false,
            system_prompt: String::new(),
            engine_host: default_engine_host(),
        }
    }
}

fn default_theme() -> String {
    "dark".to_string()
}

fn default_model() -> String {
    "llama3:8b".to_string()
}

fn default_engine_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

/// Lifecycle of the embedded engine. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum EngineState {
    NotProvisioned,
    Provisioning,
    Starting,
    Ready,
    Degraded,
    Failed(String),
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::NotProvisioned => write!(f, "not_provisioned"),
            EngineState::Provisioning => write!(f, "provisioning"),
            EngineState::Starting => write!(f, "starting"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Degraded => write!(f, "degraded"),
            EngineState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl EngineState {
    /// True while an `ensure()` attempt is in flight.
    pub fn is_transitional(&self) -> bool {
        matches!(self, EngineState::Provisioning | EngineState::Starting)
    }
}

/// A model installed in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

/// Descriptive metadata the engine reports for a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

/// One message in a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A request to the generation backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// A non-streamed generation result.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub model: String,
    pub content: String,
}

/// One fragment of a streamed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}
