// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine supervision and model management for Hearth.
//!
//! The engine is an Ollama-compatible model server run as a child process
//! (`<binary> serve`) on loopback. [`Supervisor`] owns its lifecycle,
//! [`EngineClient`] speaks its HTTP API and implements
//! [`hearth_core::GenerationBackend`], and [`ModelRegistry`] lists, pulls,
//! and deletes models.

pub mod client;
pub mod ndjson;
pub mod paths;
pub mod process;
pub mod provision;
pub mod registry;
pub mod supervisor;
pub mod types;

pub use client::EngineClient;
pub use process::EngineProcess;
pub use registry::ModelRegistry;
pub use supervisor::Supervisor;
