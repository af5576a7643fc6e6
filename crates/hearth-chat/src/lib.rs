// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat turn orchestration for Hearth.
//!
//! The [`ChatOrchestrator`] ties the encrypted store, the generation backend,
//! and the memory worker together for one turn at a time per conversation.

pub mod context;
pub mod guard;
pub mod orchestrator;
pub mod shutdown;

pub use guard::{ActiveGenerations, GenerationSlot};
pub use orchestrator::{ChatOrchestrator, SendRequest, Turn};
pub use shutdown::install_signal_handler;
