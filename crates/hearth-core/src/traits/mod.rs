// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the orchestration layer and its collaborators.
//!
//! Async traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod backend;
pub mod health;
pub mod sink;

pub use backend::{ChunkStream, GenerationBackend};
pub use health::EngineHealth;
pub use sink::{ChannelSink, EventSink, NullSink};
