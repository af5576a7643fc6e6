// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Hearth.
//!
//! Every error that crosses the command boundary maps to a stable
//! [`ErrorKind`]. Display strings never carry key material or decrypted
//! content, only identifiers and operational detail.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Hearth crates.
#[derive(Debug, Error)]
pub enum HearthError {
    /// The engine subprocess could not be reached (connect refused, timeout).
    #[error("engine unavailable: {message}")]
    EngineUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Installing or starting the engine failed.
    #[error("engine provisioning failed: {reason}")]
    ProvisioningFailed { reason: String },

    /// The engine answered, but with an error status or payload.
    #[error("engine error: {message}")]
    Engine { message: String },

    /// Storage backend errors (database I/O, query failure, filesystem).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Authentication tag did not verify: tampering, corruption, or a key mismatch.
    #[error("decryption failed{}", record_suffix(.record))]
    Decryption { record: Option<String> },

    /// Malformed request, such as an unknown conversation id.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A generation is already running for this conversation.
    #[error("conversation {conversation_id} already has a generation in progress")]
    Busy { conversation_id: String },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Runtime configuration problems.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

fn record_suffix(record: &Option<String>) -> String {
    match record {
        Some(id) => format!(" for record {id}"),
        None => String::new(),
    }
}

impl HearthError {
    /// Shorthand for a storage error built from any error value.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HearthError::Storage {
            source: source.into(),
        }
    }

    /// Shorthand for an unreachable engine.
    pub fn unavailable(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        HearthError::EngineUnavailable {
            message: message.into(),
            source,
        }
    }

    /// Stable kind used at the command boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HearthError::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
            HearthError::ProvisioningFailed { .. } => ErrorKind::ProvisioningFailed,
            HearthError::Engine { .. } => ErrorKind::Engine,
            HearthError::Storage { .. } => ErrorKind::Storage,
            HearthError::Decryption { .. } => ErrorKind::Decryption,
            HearthError::Validation(_) => ErrorKind::Validation,
            HearthError::Busy { .. } => ErrorKind::Busy,
            HearthError::Cancelled => ErrorKind::Cancelled,
            HearthError::Config(_) => ErrorKind::Config,
            HearthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller-initiated retry can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::EngineUnavailable | ErrorKind::ProvisioningFailed | ErrorKind::Busy
        )
    }
}

/// Stable, serializable error classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EngineUnavailable,
    ProvisioningFailed,
    Engine,
    Storage,
    Decryption,
    Validation,
    Busy,
    Cancelled,
    Config,
    Internal,
}

/// An error as presented to the command caller: a stable kind plus readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&HearthError> for CommandError {
    fn from(err: &HearthError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

impl From<HearthError> for CommandError {
    fn from(err: HearthError) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)
    }
}
