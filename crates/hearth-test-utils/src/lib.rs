// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hearth integration tests.
//!
//! Provides a scripted generation backend, a recording event sink, and a
//! harness that wires the real store, orchestrator, and memory worker
//! together, so flows run without an engine.
//!
//! # Components
//!
//! - [`MockBackend`] - Generation backend with queued replies
//! - [`RecordingSink`] - Event sink that keeps every emitted event
//! - [`TestHarness`] - Full chat stack on a temp database

pub mod harness;
pub mod mock_backend;
pub mod sink;

pub use harness::{TEST_MODEL, TestHarness};
pub use mock_backend::{MockBackend, StreamMode};
pub use sink::RecordingSink;
