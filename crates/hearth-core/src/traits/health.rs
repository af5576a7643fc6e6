// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback hook from engine clients to whoever supervises the engine.

/// Receives reports that the engine stopped answering.
pub trait EngineHealth: Send + Sync + 'static {
    /// The engine was unreachable while believed ready.
    fn mark_degraded(&self, reason: &str);
}
