// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation backend trait, implemented by the engine client.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::HearthError;
use crate::types::{GenerationRequest, GenerationResponse, StreamChunk};

/// Boxed stream of generation fragments.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, HearthError>> + Send>>;

/// Something that can run chat generations against a model.
///
/// Dropping a stream returned by [`GenerationBackend::stream`] must abort the
/// underlying request.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Runs a generation to completion and returns the full text.
    async fn complete(&self, request: GenerationRequest)
    -> Result<GenerationResponse, HearthError>;

    /// Starts a generation and yields fragments as the model produces them.
    async fn stream(&self, request: GenerationRequest) -> Result<ChunkStream, HearthError>;
}
