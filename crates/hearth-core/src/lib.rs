// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Hearth, a local-first AI chat backend.
//!
//! This crate provides the error taxonomy, the domain types shared by the
//! storage, engine, memory, and chat crates, the push-event contract, and the
//! trait seams those crates meet at.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::{CommandError, ErrorKind, HearthError};
pub use events::{Event, PullProgress, SetupStage, SetupStatus, StreamToken};
pub use traits::{ChannelSink, ChunkStream, EngineHealth, EventSink, GenerationBackend, NullSink};
pub use types::{
    AppConfig, ChatMessage, Conversation, EngineState, Fact, GenerationRequest,
    GenerationResponse, Message, ModelDetails, ModelInfo, Role, StreamChunk,
};

/// Current UTC time in the fixed-width format used for all persisted timestamps.
///
/// Microsecond precision keeps lexical order equal to chronological order.
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

/// Formats a UTC instant as `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn every_variant_has_a_stable_kind() {
        let cases = [
            (HearthError::unavailable("down", None), "engine_unavailable"),
            (
                HearthError::ProvisioningFailed {
                    reason: "no binary".into(),
                },
                "provisioning_failed",
            ),
            (
                HearthError::Engine {
                    message: "model not found".into(),
                },
                "engine",
            ),
            (HearthError::storage(std::io::Error::other("disk")), "storage"),
            (HearthError::Decryption { record: None }, "decryption"),
            (HearthError::Validation("bad id".into()), "validation"),
            (
                HearthError::Busy {
                    conversation_id: "c1".into(),
                },
                "busy",
            ),
            (HearthError::Cancelled, "cancelled"),
            (HearthError::Config("x".into()), "config"),
            (HearthError::Internal("x".into()), "internal"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.kind().to_string(), expected);
            assert_eq!(ErrorKind::from_str(expected).unwrap(), err.kind());
        }
    }

    #[test]
    fn decryption_error_names_record_only() {
        let err = HearthError::Decryption {
            record: Some("msg-7".into()),
        };
        assert_eq!(err.to_string(), "decryption failed for record msg-7");
        assert_eq!(
            HearthError::Decryption { record: None }.to_string(),
            "decryption failed"
        );
    }

    #[test]
    fn command_error_serializes_kind_and_detail() {
        let err = HearthError::Validation("unknown conversation c9".into());
        let cmd = CommandError::from(&err);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["detail"], "invalid request: unknown conversation c9");
    }

    #[test]
    fn retryable_kinds() {
        assert!(HearthError::unavailable("x", None).is_retryable());
        assert!(!HearthError::Decryption { record: None }.is_retryable());
        assert!(!HearthError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Assistant, Role::System] {
            let s = role.to_string();
            assert_eq!(Role::from_str(&s).unwrap(), role);
        }
        assert!(Role::from_str("tool").is_err());
    }

    #[test]
    fn app_config_defaults_fill_missing_fields() {
        let cfg: AppConfig = serde_json::from_str(r#"{"theme":"light"}"#).unwrap();
        assert_eq!(cfg.theme, "light");
        assert_eq!(cfg.default_model, "llama3:8b");
        assert!(!cfg.setup_complete);
        assert_eq!(cfg.engine_host, "http://127.0.0.1:11434");
    }

    #[test]
    fn event_wire_names() {
        let ev = Event::token("c1", "Hel", false);
        assert_eq!(ev.name(), "chat-stream-token");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "chat-stream-token");
        assert_eq!(json["payload"]["content"], "Hel");

        let setup = Event::setup(SetupStage::Downloading, "fetching", Some(0.5));
        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(json["event"], "engine-setup-status");
        assert_eq!(json["payload"]["stage"], "downloading");
    }

    #[test]
    fn debug_output_hides_content() {
        let msg = Message {
            id: "m1".into(),
            conversation_id: "c1".into(),
            role: Role::User,
            content: "my secret diary entry".into(),
            timestamp: now_timestamp(),
        };
        let dbg = format!("{msg:?}");
        assert!(!dbg.contains("diary"));
        assert!(dbg.contains("m1"));
    }

    #[test]
    fn timestamp_format_is_fixed_width() {
        use chrono::TimeZone;

        let at = chrono::Utc.timestamp_opt(1_767_225_600, 42_000).unwrap();
        assert_eq!(format_timestamp(at), "2026-01-01T00:00:00.000042Z");
        assert_eq!(now_timestamp().len(), 27);
    }

    #[tokio::test]
    async fn channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(Event::token("c", "a", false));
        sink.emit(Event::token("c", "b", true));
        assert_eq!(rx.recv().await.unwrap(), Event::token("c", "a", false));
        assert_eq!(rx.recv().await.unwrap(), Event::token("c", "b", true));
    }
}
