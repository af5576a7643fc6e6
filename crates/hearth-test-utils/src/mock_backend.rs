// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted generation backend for deterministic tests.
//!
//! Streamed replies and extraction replies come from separate FIFO queues so a
//! test can script the chat turn and the fact extraction that follows it.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use hearth_core::{
    ChunkStream, GenerationBackend, GenerationRequest, GenerationResponse, HearthError,
    StreamChunk,
};
use tokio::sync::Mutex;

const DEFAULT_REPLY: &str = "mock response";
const DEFAULT_EXTRACTION: &str = "[]";

/// What the next stream does besides yielding its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Yield every word, then a `done` chunk.
    #[default]
    Complete,
    /// Yield the first word, then never finish. Used to exercise cancellation.
    Hang,
    /// Fail before streaming, as an unreachable engine would.
    Unavailable,
}

#[derive(Default)]
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<String>>>,
    extractions: Arc<Mutex<VecDeque<String>>>,
    mode: Mutex<StreamMode>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-loaded with streamed replies.
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            ..Self::default()
        }
    }

    pub async fn add_reply(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(text.into());
    }

    /// Queue the raw text the extraction model will answer with.
    pub async fn add_extraction(&self, text: impl Into<String>) {
        self.extractions.lock().await.push_back(text.into());
    }

    pub async fn set_mode(&self, mode: StreamMode) {
        *self.mode.lock().await = mode;
    }

    /// Every request seen so far, streamed or not.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_reply(&self) -> String {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| DEFAULT_REPLY.to_string())
    }
}

fn word_chunks(text: &str) -> Vec<Result<StreamChunk, HearthError>> {
    text.split_inclusive(' ')
        .map(|word| {
            Ok(StreamChunk {
                content: word.to_string(),
                done: false,
            })
        })
        .collect()
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, HearthError> {
        self.requests.lock().await.push(request.clone());
        let content = self
            .extractions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| DEFAULT_EXTRACTION.to_string());
        Ok(GenerationResponse {
            model: request.model,
            content,
        })
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkStream, HearthError> {
        self.requests.lock().await.push(request);
        let mode = *self.mode.lock().await;
        if mode == StreamMode::Unavailable {
            return Err(HearthError::unavailable("mock engine is down", None));
        }

        let mut chunks = word_chunks(&self.next_reply().await);
        match mode {
            StreamMode::Hang => {
                chunks.truncate(1);
                Ok(Box::pin(stream::iter(chunks).chain(stream::pending())))
            }
            _ => {
                chunks.push(Ok(StreamChunk {
                    content: String::new(),
                    done: true,
                }));
                Ok(Box::pin(stream::iter(chunks)))
            }
        }
    }
}
