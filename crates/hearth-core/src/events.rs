// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push events delivered from the core to the presentation layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stage reported in `engine-setup-status` events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SetupStage {
    Checking,
    Downloading,
    Starting,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStatus {
    pub stage: SetupStage,
    pub message: String,
    /// Fraction in `0.0..=1.0`, present while downloading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullProgress {
    pub model: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Size of the layer named by `digest`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Bytes of that layer downloaded so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,
    /// Size of every layer announced so far in this pull.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_total: Option<u64>,
    /// Bytes downloaded across all layers. Never decreases within a pull.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_completed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamToken {
    pub conversation_id: String,
    pub content: String,
    pub done: bool,
}

/// A fire-and-forget notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    EngineSetupStatus(SetupStatus),
    ModelPullProgress(PullProgress),
    ChatStreamToken(StreamToken),
}

impl Event {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::EngineSetupStatus(_) => "engine-setup-status",
            Event::ModelPullProgress(_) => "model-pull-progress",
            Event::ChatStreamToken(_) => "chat-stream-token",
        }
    }

    pub fn setup(stage: SetupStage, message: impl Into<String>, progress: Option<f64>) -> Self {
        Event::EngineSetupStatus(SetupStatus {
            stage,
            message: message.into(),
            progress,
        })
    }

    pub fn token(conversation_id: &str, content: impl Into<String>, done: bool) -> Self {
        Event::ChatStreamToken(StreamToken {
            conversation_id: conversation_id.to_string(),
            content: content.into(),
            done,
        })
    }
}
