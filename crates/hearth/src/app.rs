// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide wiring.
//!
//! [`App`] owns everything a command needs: the unlocked store, the engine
//! supervisor, the model registry, and the chat orchestrator with its memory
//! worker. Commands borrow it; [`App::close`] tears it down in order.

use std::sync::Arc;
use std::time::Duration;

use hearth_chat::ChatOrchestrator;
use hearth_config::HearthConfig;
use hearth_core::{AppConfig, EventSink, HearthError};
use hearth_engine::{EngineClient, ModelRegistry, Supervisor};
use hearth_memory::{ExtractionWorker, FactExtractor};
use hearth_storage::Store;
use tracing::{debug, info, warn};

use crate::output::ConsoleSink;

/// What happens to a managed engine when the command finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// Leave a ready engine running for the next command.
    Detach,
    /// Stop it, including one left running by an earlier command.
    Stop,
}

pub struct App {
    pub config: HearthConfig,
    pub store: Arc<Store>,
    pub sink: Arc<ConsoleSink>,
    pub supervisor: Arc<Supervisor>,
    pub registry: ModelRegistry,
    pub chat: ChatOrchestrator,
    worker: Option<Arc<ExtractionWorker>>,
}

impl App {
    /// Unlock the vault, open the database, and build the engine and chat stack.
    ///
    /// Nothing here touches the engine; it is started on first use.
    pub async fn open(config: HearthConfig, sink: Arc<ConsoleSink>) -> Result<Self, HearthError> {
        std::fs::create_dir_all(&config.paths.data_dir).map_err(HearthError::storage)?;
        let cipher = hearth_vault::unlock(&config.paths.data_dir, &config.vault)?;
        let store = Arc::new(
            Store::open(&config.database_path(), config.storage.wal_mode, cipher).await?,
        );

        let app_config = store.get_config().await?;
        let stored = hearth_engine::client::loopback_bind_address(&app_config.engine_host);
        let engine_host = match stored {
            Ok(_) => app_config.engine_host,
            Err(e) => {
                let fallback = AppConfig::default().engine_host;
                warn!(error = %e, %fallback, "stored engine_host rejected, using default");
                fallback
            }
        };
        let connect_timeout = Duration::from_millis(config.engine.connect_timeout_ms);
        let client = EngineClient::new(&engine_host, connect_timeout)?;
        debug!(engine = %client.base_url(), "engine client configured");

        let events: Arc<dyn EventSink> = sink.clone();
        let supervisor = Arc::new(Supervisor::new(&config, client.clone(), events.clone())?);
        let registry = ModelRegistry::new(client.clone(), events.clone());

        let backend = Arc::new(client);
        let mut chat = ChatOrchestrator::new(store.clone(), backend.clone(), events, &config)
            .with_health(supervisor.clone());

        let worker = if config.memory.enabled {
            let extractor = Arc::new(FactExtractor::new(
                backend,
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
            info!("fact extraction disabled by configuration");
            None
        };

        Ok(Self {
            config,
            store,
            sink,
            supervisor,
            registry,
            chat,
            worker,
        })
    }

    /// Finish pending extraction, detach or stop a managed engine, and
    /// checkpoint the database.
    pub async fn close(self, engine: EngineExit) -> Result<(), HearthError> {
        if let Some(worker) = &self.worker {
            worker.shutdown().await;
        }
        match engine {
            EngineExit::Detach => self.supervisor.detach().await,
            EngineExit::Stop => {
                self.supervisor.stop().await;
            }
        }
        self.sink.finish();

        // The orchestrator and worker hold store handles; drop them first.
        let Self { store, chat, worker, .. } = self;
        drop(chat);
        drop(worker);
        match Arc::try_unwrap(store) {
            Ok(store) => store.close().await,
            Err(_) => {
                warn!("store still shared at exit, skipping checkpoint");
                Ok(())
            }
        }
    }
}
