// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end chat flows.
//!
//! `TestHarness` assembles the full turn pipeline with a scripted backend, a
//! recording event sink, and an encrypted database in a temp directory.

use std::sync::Arc;

use hearth_chat::{ChatOrchestrator, SendRequest, Turn};
use hearth_config::HearthConfig;
use hearth_core::{HearthError, Message};
use hearth_memory::{ExtractionWorker, FactExtractor};
use hearth_storage::Store;
use hearth_vault::Cipher;
use tokio_util::sync::CancellationToken;

use crate::mock_backend::MockBackend;
use crate::sink::RecordingSink;

pub const TEST_MODEL: &str = "mock-model:latest";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    system_prompt: Option<String>,
    memory: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            system_prompt: None,
            memory: false,
        }
    }

    /// Streamed replies, one per turn.
    pub fn with_mock_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Run the extraction worker after each turn.
    pub fn with_memory(mut self) -> Self {
        self.memory = true;
        self
    }

    pub async fn build(self) -> Result<TestHarness, HearthError> {
        let temp_dir = tempfile::TempDir::new().map_err(HearthError::storage)?;

        let mut config = HearthConfig::default();
        config.paths.data_dir = temp_dir.path().to_path_buf();
        config.memory.enabled = self.memory;

        let cipher = Arc::new(Cipher::random()?);
        let store = Arc::new(
            Store::open(&config.database_path(), config.storage.wal_mode, cipher).await?,
        );
        if let Some(prompt) = self.system_prompt {
            let mut app = store.get_config().await?;
            app.system_prompt = prompt;
            store.save_config(&app).await?;
        }

        let backend = Arc::new(MockBackend::with_replies(self.replies));
        let sink = Arc::new(RecordingSink::new());

        let mut chat = ChatOrchestrator::new(store.clone(), backend.clone(), sink.clone(), &config);
        let worker = if self.memory {
            let extractor = Arc::new(FactExtractor::new(
                backend.clone(),
                store.clone(),
                config.memory.extraction_model.clone(),
                config.memory.dedup_threshold,
            ));
            let worker = Arc::new(ExtractionWorker::spawn(
                extractor,
                config.memory.queue_capacity,
            ));
            chat = chat.with_extraction(worker.clone());
            Some(worker)
        } else {
            None
        };

        Ok(TestHarness {
            backend,
            sink,
            store,
            chat,
            worker,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment. Dropping it removes the database.
pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<Store>,
    pub chat: ChatOrchestrator,
    worker: Option<Arc<ExtractionWorker>>,
    pub config: HearthConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Start a new conversation with `text`.
    pub async fn send_message(&self, text: &str) -> Result<Turn, HearthError> {
        self.send(None, text).await
    }

    /// Continue `conversation_id` with `text`.
    pub async fn send_to(&self, conversation_id: &str, text: &str) -> Result<Turn, HearthError> {
        self.send(Some(conversation_id.to_string()), text).await
    }

    async fn send(
        &self,
        conversation_id: Option<String>,
        text: &str,
    ) -> Result<Turn, HearthError> {
        self.chat
            .send_message(SendRequest {
                conversation_id,
                text: text.to_string(),
                model: TEST_MODEL.to_string(),
                cancel: CancellationToken::new(),
            })
            .await
    }

    /// Readable messages of a conversation, oldest first.
    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, HearthError> {
        self.store
            .get_messages(conversation_id)
            .await?
            .into_iter()
            .collect()
    }

    /// Wait for queued extraction jobs to finish. No more turns are extracted afterwards.
    pub async fn settle(&self) {
        if let Some(worker) = &self.worker {
            worker.shutdown().await;
        }
    }
}
