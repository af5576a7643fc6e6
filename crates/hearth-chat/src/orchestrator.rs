// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single chat turn, end to end.
//!
//! [`ChatOrchestrator::send_message`] persists the user message, assembles the
//! prompt, streams the reply as `chat-stream-token` events, and persists the
//! assistant message only once the stream completes. Every exit path emits
//! exactly one `done: true` token so listeners can always settle.

use std::sync::Arc;

use futures::StreamExt;
use hearth_config::HearthConfig;
use hearth_core::{
    ChatMessage, EngineHealth, Event, EventSink, GenerationBackend, GenerationRequest,
    HearthError, Message, Role,
};
use hearth_memory::{ExtractionJob, ExtractionWorker, memory_context};
use hearth_storage::Store;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context;
use crate::guard::ActiveGenerations;

/// Input for one turn.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Existing conversation, or `None` to start a new one.
    pub conversation_id: Option<String>,
    pub text: String,
    pub model: String,
    pub cancel: CancellationToken,
}

/// A completed turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub conversation_id: String,
    pub user_message: Message,
    pub assistant_message: Message,
}

pub struct ChatOrchestrator {
    store: Arc<Store>,
    backend: Arc<dyn GenerationBackend>,
    sink: Arc<dyn EventSink>,
    health: Option<Arc<dyn EngineHealth>>,
    extraction: Option<Arc<ExtractionWorker>>,
    active: Arc<ActiveGenerations>,
    title_max_chars: usize,
    max_context_facts: usize,
    memory_enabled: bool,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<Store>,
        backend: Arc<dyn GenerationBackend>,
        sink: Arc<dyn EventSink>,
        config: &HearthConfig,
    ) -> Self {
        Self {
            store,
            backend,
            sink,
            health: None,
            extraction: None,
            active: ActiveGenerations::new(),
            title_max_chars: config.chat.title_max_chars,
            max_context_facts: config.memory.max_context_facts,
            memory_enabled: config.memory.enabled,
        }
    }

    /// Report engine connection failures to `health`.
    pub fn with_health(mut self, health: Arc<dyn EngineHealth>) -> Self {
        self.health = Some(health);
        self
    }

    /// Queue completed turns on `worker` for fact extraction.
    pub fn with_extraction(mut self, worker: Arc<ExtractionWorker>) -> Self {
        self.extraction = Some(worker);
        self
    }

    pub fn active_generations(&self) -> &Arc<ActiveGenerations> {
        &self.active
    }

    /// Run one turn.
    pub async fn send_message(&self, request: SendRequest) -> Result<Turn, HearthError> {
        let SendRequest {
            conversation_id,
            text,
            model,
            cancel,
        } = request;

        if text.trim().is_empty() {
            return Err(HearthError::Validation("message must not be empty".to_string()));
        }
        if model.trim().is_empty() {
            return Err(HearthError::Validation("model must not be empty".to_string()));
        }

        let (conversation_id, _slot) = match conversation_id {
            Some(id) => {
                let slot = self.active.try_acquire(&id)?;
                if self.store.get_conversation(&id).await?.is_none() {
                    return Err(HearthError::Validation(format!(
                        "unknown conversation id: {id}"
                    )));
                }
                (id, slot)
            }
            None => {
                let title = context::derive_title(&text, self.title_max_chars);
                let conversation = self.store.create_conversation(&title, &model).await?;
                info!(conversation_id = %conversation.id, "started conversation");
                let slot = self.active.try_acquire(&conversation.id)?;
                (conversation.id, slot)
            }
        };

        let user_message = self
            .store
            .add_message(&conversation_id, Role::User, &text)
            .await?;

        let messages = self.prompt_for(&conversation_id, &text).await?;
        debug!(
            conversation_id = %conversation_id,
            messages = messages.len(),
            %model,
            "starting generation"
        );

        let outcome = self
            .generate(&conversation_id, &model, messages, &cancel)
            .await;
        self.sink
            .emit(Event::token(conversation_id.as_str(), "", true));

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                if matches!(e, HearthError::EngineUnavailable { .. })
                    && let Some(health) = &self.health
                {
                    health.mark_degraded(&e.to_string());
                }
                match &e {
                    HearthError::Cancelled => {
                        info!(conversation_id = %conversation_id, "generation cancelled")
                    }
                    other => {
                        warn!(conversation_id = %conversation_id, error = %other, "generation failed")
                    }
                }
                return Err(e);
            }
        };

        let assistant_message = self
            .store
            .add_message(&conversation_id, Role::Assistant, &reply)
            .await?;
        info!(
            conversation_id = %conversation_id,
            reply_chars = reply.chars().count(),
            "turn complete"
        );

        if self.memory_enabled
            && let Some(worker) = &self.extraction
        {
            worker.enqueue(ExtractionJob {
                conversation_id: conversation_id.clone(),
                user_text: text,
                assistant_text: reply,
                assistant_message_id: assistant_message.id.clone(),
                model,
            });
        }

        Ok(Turn {
            conversation_id,
            user_message,
            assistant_message,
        })
    }

    /// Run one turn from a caller-held history.
    ///
    /// Stored messages are the source of truth for context; `history` only
    /// supplies the new text, which must be its final `user` entry.
    pub async fn send_with_history(
        &self,
        conversation_id: Option<String>,
        history: Vec<ChatMessage>,
        model: String,
        cancel: CancellationToken,
    ) -> Result<Turn, HearthError> {
        let text = match history.last() {
            Some(last) if last.role == Role::User => last.content.clone(),
            _ => {
                return Err(HearthError::Validation(
                    "history must end with a user message".to_string(),
                ));
            }
        };
        self.send_message(SendRequest {
            conversation_id,
            text,
            model,
            cancel,
        })
        .await
    }

    async fn prompt_for(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<Vec<ChatMessage>, HearthError> {
        let facts = if self.memory_enabled {
            match memory_context(&self.store, Some(text), self.max_context_facts).await {
                Ok(block) => block,
                Err(e) => {
                    warn!(error = %e, "fact context unavailable");
                    None
                }
            }
        } else {
            None
        };
        let system_prompt = self.store.get_config().await?.system_prompt;
        let history = self.store.get_messages(conversation_id).await?;

        Ok(context::assemble_messages(
            context::system_message(facts.as_deref(), &system_prompt),
            history,
        ))
    }

    /// Stream the reply, forwarding each fragment. Returns the full text.
    async fn generate(
        &self,
        conversation_id: &str,
        model: &str,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, HearthError> {
        let request = GenerationRequest {
            model: model.to_string(),
            messages,
        };

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HearthError::Cancelled),
            stream = self.backend.stream(request) => stream?,
        };

        let mut reply = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HearthError::Cancelled),
                next = stream.next() => next,
            };
            // A stream that ends without `done` was cut off mid-reply.
            let Some(chunk) = next else {
                return Err(HearthError::unavailable(
                    "engine stream ended before completion",
                    None,
                ));
            };
            let chunk = chunk?;
            if !chunk.content.is_empty() {
                reply.push_str(&chunk.content);
                self.sink
                    .emit(Event::token(conversation_id, chunk.content, false));
            }
            if chunk.done {
                return Ok(reply);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hearth_core::{ChannelSink, ChunkStream, GenerationResponse, StreamChunk};
    use hearth_vault::Cipher;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Streams a fixed reply word by word, or hangs after the first word.
    #[derive(Default)]
    struct ScriptedBackend {
        reply: String,
        hang: bool,
        unavailable: bool,
        truncated: bool,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn complete(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, HearthError> {
            Ok(GenerationResponse {
                model: request.model,
                content: "[]".into(),
            })
        }

        async fn stream(&self, request: GenerationRequest) -> Result<ChunkStream, HearthError> {
            self.requests.lock().unwrap().push(request);
            if self.unavailable {
                return Err(HearthError::unavailable("connection refused", None));
            }
            let mut chunks: Vec<Result<StreamChunk, HearthError>> = self
                .reply
                .split_inclusive(' ')
                .map(|w| {
                    Ok(StreamChunk {
                        content: w.to_string(),
                        done: false,
                    })
                })
                .collect();
            if self.hang {
                chunks.truncate(1);
                let head = futures::stream::iter(chunks);
                return Ok(Box::pin(head.chain(futures::stream::pending())));
            }
            if self.truncated {
                return Ok(Box::pin(futures::stream::iter(chunks)));
            }
            chunks.push(Ok(StreamChunk {
                content: String::new(),
                done: true,
            }));
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    #[derive(Default)]
    struct FlagHealth(AtomicBool);

    impl EngineHealth for FlagHealth {
        fn mark_degraded(&self, _reason: &str) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    async fn setup(
        backend: ScriptedBackend,
    ) -> (
        ChatOrchestrator,
        Arc<Store>,
        Arc<ScriptedBackend>,
        UnboundedReceiver<Event>,
    ) {
        let cipher = Arc::new(Cipher::random().unwrap());
        let store = Arc::new(Store::open_in_memory(cipher).await.unwrap());
        let backend = Arc::new(backend);
        let (sink, rx) = ChannelSink::new();
        let mut config = HearthConfig::default();
        config.chat.title_max_chars = 10;
        let orchestrator =
            ChatOrchestrator::new(store.clone(), backend.clone(), Arc::new(sink), &config);
        (orchestrator, store, backend, rx)
    }

    fn request(conversation_id: Option<String>, text: &str) -> SendRequest {
        SendRequest {
            conversation_id,
            text: text.into(),
            model: "llama3:8b".into(),
            cancel: CancellationToken::new(),
        }
    }

    fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<(String, bool)> {
        let mut tokens = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::ChatStreamToken(token) = event {
                tokens.push((token.content, token.done));
            }
        }
        tokens
    }

    #[tokio::test]
    async fn history_turn_appends_exactly_user_then_assistant() {
        let (chat, store, _backend, _rx) = setup(ScriptedBackend {
            reply: "Paris is lovely.".into(),
            ..Default::default()
        })
        .await;

        let conv = store.create_conversation("Trip", "llama3:8b").await.unwrap();
        store.add_message(&conv.id, Role::User, "Hi").await.unwrap();
        store
            .add_message(&conv.id, Role::Assistant, "Hello! How can I help?")
            .await
            .unwrap();

        let history = vec![
            ChatMessage::new(Role::User, "Hi"),
            ChatMessage::new(Role::Assistant, "Hello! How can I help?"),
            ChatMessage::new(Role::User, "Tell me about Paris"),
        ];
        chat.send_with_history(
            Some(conv.id.clone()),
            history,
            "llama3:8b".into(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let messages: Vec<Message> = store
            .get_messages(&conv.id)
            .await
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[2].content, "Tell me about Paris");
        assert_eq!(messages[3].role, Role::Assistant);
        assert_eq!(messages[3].content, "Paris is lovely.");
    }

    #[tokio::test]
    async fn new_conversation_streams_and_persists() {
        let (chat, store, backend, mut rx) = setup(ScriptedBackend {
            reply: "Hello there friend".into(),
            ..Default::default()
        })
        .await;

        let turn = chat
            .send_message(request(None, "Good morning everyone"))
            .await
            .unwrap();

        let conv = store
            .get_conversation(&turn.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.title, "Good morni\u{2026}");
        assert_eq!(turn.assistant_message.content, "Hello there friend");

        let tokens = drain(&mut rx);
        let text: String = tokens.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(text, "Hello there friend");
        assert_eq!(tokens.iter().filter(|(_, done)| *done).count(), 1);
        assert!(tokens.last().unwrap().1);

        // The prompt ends with the new user message and has no system entry.
        let sent = backend.requests.lock().unwrap();
        let last = sent[0].messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "Good morning everyone");
        assert!(sent[0].messages.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn system_prompt_and_facts_lead_the_request() {
        let (chat, store, backend, _rx) = setup(ScriptedBackend {
            reply: "Sure.".into(),
            ..Default::default()
        })
        .await;
        let mut config = store.get_config().await.unwrap();
        config.system_prompt = "Be brief.".into();
        store.save_config(&config).await.unwrap();
        store.add_fact("The user drinks tea", None).await.unwrap();

        chat.send_message(request(None, "Suggest a tea")).await.unwrap();

        let sent = backend.requests.lock().unwrap();
        let system = &sent[0].messages[0];
        assert_eq!(system.role, Role::System);
        assert_eq!(
            system.content,
            "Known facts about the user:\n- The user drinks tea\n\nBe brief."
        );
    }

    #[tokio::test]
    async fn cancellation_persists_no_assistant_message() {
        let (chat, store, _backend, mut rx) = setup(ScriptedBackend {
            reply: "This will never finish".into(),
            hang: true,
            ..Default::default()
        })
        .await;
        let conv = store.create_conversation("t", "llama3:8b").await.unwrap();

        let req = request(Some(conv.id.clone()), "Write a novel");
        let cancel = req.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let err = chat.send_message(req).await.unwrap_err();
        assert!(matches!(err, HearthError::Cancelled));

        let messages = store.get_messages(&conv.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_ref().unwrap().role, Role::User);

        let tokens = drain(&mut rx);
        assert_eq!(tokens.last(), Some(&(String::new(), true)));
        assert!(!chat.active_generations().is_active(&conv.id));
    }

    #[tokio::test]
    async fn concurrent_turn_on_same_conversation_is_busy() {
        let (chat, store, _backend, _rx) = setup(ScriptedBackend {
            reply: "slow reply".into(),
            hang: true,
            ..Default::default()
        })
        .await;
        let chat = Arc::new(chat);
        let conv = store.create_conversation("t", "llama3:8b").await.unwrap();

        let first = request(Some(conv.id.clone()), "first");
        let cancel = first.cancel.clone();
        let running = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message(first).await })
        };
        while !chat.active_generations().is_active(&conv.id) {
            tokio::task::yield_now().await;
        }

        let err = chat
            .send_message(request(Some(conv.id.clone()), "second"))
            .await
            .unwrap_err();
        assert_eq!(err.kind().to_string(), "busy");

        cancel.cancel();
        assert!(matches!(
            running.await.unwrap(),
            Err(HearthError::Cancelled)
        ));
        // Only the first user message was stored.
        assert_eq!(store.count_messages(&conv.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailable_engine_marks_degraded() {
        let (chat, store, _backend, mut rx) = setup(ScriptedBackend {
            unavailable: true,
            ..Default::default()
        })
        .await;
        let health = Arc::new(FlagHealth::default());
        let chat = chat.with_health(health.clone());

        let err = chat.send_message(request(None, "hello")).await.unwrap_err();
        assert!(matches!(err, HearthError::EngineUnavailable { .. }));
        assert!(health.0.load(Ordering::SeqCst));
        assert_eq!(drain(&mut rx), vec![(String::new(), true)]);

        let conversations = store.list_conversations().await.unwrap();
        let conv = conversations[0].as_ref().unwrap();
        assert_eq!(store.count_messages(&conv.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stream_cut_off_before_done_persists_nothing() {
        let (chat, store, _backend, mut rx) = setup(ScriptedBackend {
            reply: "The answer is".into(),
            truncated: true,
            ..Default::default()
        })
        .await;
        let health = Arc::new(FlagHealth::default());
        let chat = chat.with_health(health.clone());
        let conv = store.create_conversation("t", "llama3:8b").await.unwrap();

        let err = chat
            .send_message(request(Some(conv.id.clone()), "What is it?"))
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::EngineUnavailable { .. }));
        assert!(health.0.load(Ordering::SeqCst));

        let messages = store.get_messages(&conv.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_ref().unwrap().role, Role::User);

        let tokens = drain(&mut rx);
        assert_eq!(tokens.last(), Some(&(String::new(), true)));
        assert!(!chat.active_generations().is_active(&conv.id));
    }

    #[tokio::test]
    async fn validation_errors() {
        let (chat, _store, _backend, _rx) = setup(ScriptedBackend::default()).await;

        let err = chat.send_message(request(None, "   ")).await.unwrap_err();
        assert!(matches!(err, HearthError::Validation(_)));

        let err = chat
            .send_message(request(Some("nope".into()), "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::Validation(_)));
        assert!(!chat.active_generations().is_active("nope"));

        let err = chat
            .send_with_history(
                None,
                vec![ChatMessage::new(Role::Assistant, "hi")],
                "llama3:8b".into(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::Validation(_)));
    }
}
