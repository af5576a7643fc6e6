// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model registry operations: list, pull with progress, delete.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use hearth_core::{Event, EventSink, HearthError, ModelInfo, PullProgress};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{EngineClient, ensure_success, error_message};
use crate::ndjson;
use crate::types::{DeleteRequest, PullLine, PullRequest, TagsResponse};

pub struct ModelRegistry {
    client: EngineClient,
    sink: Arc<dyn EventSink>,
}

impl ModelRegistry {
    pub fn new(client: EngineClient, sink: Arc<dyn EventSink>) -> Self {
        Self { client, sink }
    }

    /// Models currently installed in the engine.
    pub async fn list(&self) -> Result<Vec<ModelInfo>, HearthError> {
        let response = self
            .client
            .send(|http| http.get(self.client.url("/api/tags")))
            .await?;
        let response = ensure_success(response).await?;
        let tags: TagsResponse = response.json().await.map_err(|e| HearthError::Engine {
            message: format!("failed to parse model list: {e}"),
        })?;
        Ok(tags
            .models
            .unwrap_or_default()
            .into_iter()
            .map(ModelInfo::from)
            .collect())
    }

    /// Whether `name` is installed. A bare name matches its `:latest` tag.
    pub async fn is_installed(&self, name: &str) -> Result<bool, HearthError> {
        Ok(self
            .list()
            .await?
            .iter()
            .any(|m| same_model(&m.name, name)))
    }

    /// Download a model, emitting `model-pull-progress` for every status line.
    ///
    /// When `cancel` fires the transfer is aborted and, if the model was not
    /// installed beforehand, any partially registered copy is removed.
    pub async fn pull(&self, name: &str, cancel: CancellationToken) -> Result<(), HearthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HearthError::Validation("model name must not be empty".to_string()));
        }

        let installed_before = self.is_installed(name).await?;
        info!(model = %name, "pulling model");

        // Dropping the transfer future drops the response and aborts the download.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(model = %name, "pull cancelled");
                self.discard_partial(name, installed_before).await;
                Err(HearthError::Cancelled)
            }
            result = self.transfer(name) => result,
        }
    }

    async fn transfer(&self, name: &str) -> Result<(), HearthError> {
        let body = PullRequest { name, stream: true };
        let response = self
            .client
            .send(|http| http.post(self.client.url("/api/pull")).json(&body))
            .await?;
        let response = ensure_success(response).await?;
        let mut lines = ndjson::decode_response::<PullLine>(response);
        let mut tracker = ProgressTracker::default();

        while let Some(line) = lines.next().await {
            let line = line?;
            if let Some(error) = line.error {
                warn!(model = %name, "pull reported an error");
                return Err(HearthError::Engine { message: error });
            }
            let progress = tracker.observe(name, line);
            self.sink.emit(Event::ModelPullProgress(progress));
        }

        info!(model = %name, "pull finished");
        Ok(())
    }

    async fn discard_partial(&self, name: &str, installed_before: bool) {
        if installed_before {
            return;
        }
        match self.is_installed(name).await {
            Ok(true) => {
                debug!(model = %name, "removing partially pulled model");
                if let Err(e) = self.delete(name).await {
                    warn!(model = %name, error = %e, "failed to remove partial model");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(model = %name, error = %e, "could not check for partial model"),
        }
    }

    /// Remove an installed model. An unknown name is a validation error.
    pub async fn delete(&self, name: &str) -> Result<(), HearthError> {
        let body = DeleteRequest { name };
        let response = self
            .client
            .send(|http| http.delete(self.client.url("/api/delete")).json(&body))
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HearthError::Validation(format!("model not found: {name}")));
        }
        if !status.is_success() {
            return Err(HearthError::Engine {
                message: error_message(status, response).await,
            });
        }
        info!(model = %name, "model deleted");
        Ok(())
    }
}

fn same_model(installed: &str, requested: &str) -> bool {
    installed == requested
        || installed
            .strip_suffix(":latest")
            .is_some_and(|base| base == requested)
}

#[derive(Debug, Default, Clone, Copy)]
struct LayerProgress {
    total: u64,
    completed: u64,
}

/// High-water marks per layer digest, so neither a layer's `completed` nor
/// the pull-wide sum ever goes back when the engine interleaves layers.
#[derive(Debug, Default)]
struct ProgressTracker {
    layers: HashMap<String, LayerProgress>,
}

impl ProgressTracker {
    fn observe(&mut self, model: &str, line: PullLine) -> PullProgress {
        let mut completed = None;
        if line.total.is_some() || line.completed.is_some() {
            let key = line.digest.clone().unwrap_or_default();
            let layer = self.layers.entry(key).or_default();
            if let Some(total) = line.total {
                layer.total = layer.total.max(total);
            }
            if let Some(c) = line.completed {
                layer.completed = layer.completed.max(c);
                completed = Some(layer.completed);
            }
        }

        let (overall_total, overall_completed) = if self.layers.is_empty() {
            (None, None)
        } else {
            let (total, done) = self
                .layers
                .values()
                .fold((0u64, 0u64), |(t, d), l| (t + l.total, d + l.completed));
            (Some(total), Some(done))
        };

        PullProgress {
            model: model.to_string(),
            status: line.status,
            digest: line.digest,
            total: line.total,
            completed,
            overall_total,
            overall_completed,
        }
    }
}
