// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background extraction queue.
//!
//! Completed turns are handed over with [`ExtractionWorker::enqueue`], which
//! never waits. One task drains the queue in order. Extraction failures are
//! logged and dropped; they never reach the chat path.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::extractor::{ExtractionJob, FactExtractor};

pub struct ExtractionWorker {
    tx: Mutex<Option<mpsc::Sender<ExtractionJob>>>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ExtractionWorker {
    /// Spawn the drain task. Must be called inside a Tokio runtime.
    pub fn spawn(extractor: Arc<FactExtractor>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ExtractionJob>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match extractor.extract(&job).await {
                    Ok(facts) if !facts.is_empty() => {
                        info!(
                            conversation_id = %job.conversation_id,
                            count = facts.len(),
                            "stored extracted facts"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(
                        conversation_id = %job.conversation_id,
                        error = %e,
                        "fact extraction failed"
                    ),
                }
            }
            debug!("extraction queue drained");
        });

        Self {
            tx: Mutex::new(Some(tx)),
            handle: tokio::sync::Mutex::new(Some(handle)),
        }
    }

    /// Queue a job. Returns `false` if it was dropped.
    pub fn enqueue(&self, job: ExtractionJob) -> bool {
        let guard = self.sender();
        let Some(tx) = guard.as_ref() else {
            debug!("extraction worker stopped, dropping job");
            return false;
        };
        match tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(conversation_id = %job.conversation_id, "extraction queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("extraction queue closed, dropping job");
                false
            }
        }
    }

    /// Close the queue and wait for queued jobs to finish.
    pub async fn shutdown(&self) {
        drop(self.sender().take());
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "extraction task ended abnormally");
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::Sender<ExtractionJob>>> {
        self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hearth_core::{
        ChunkStream, GenerationBackend, GenerationRequest, GenerationResponse, HearthError,
    };
    use hearth_storage::Store;
    use hearth_vault::Cipher;
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tracing_test::traced_test;

    /// Replies with one fact per call, each waiting for a permit.
    struct GatedBackend {
        gate: Semaphore,
        fail: bool,
    }

    #[async_trait]
    impl GenerationBackend for GatedBackend {
        async fn complete(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, HearthError> {
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            if self.fail {
                return Err(HearthError::unavailable("engine down", None));
            }
            let prompt = &request.messages[0].content;
            let user = prompt
                .lines()
                .find_map(|l| l.strip_prefix("User: "))
                .unwrap_or_default();
            Ok(GenerationResponse {
                model: request.model,
                content: serde_json::json!([format!("The user said {user}")]).to_string(),
            })
        }

        async fn stream(&self, _request: GenerationRequest) -> Result<ChunkStream, HearthError> {
            Err(HearthError::Internal("not streamed".into()))
        }
    }

    async fn setup(permits: usize, fail: bool) -> (Arc<Store>, Arc<GatedBackend>) {
        let cipher = Arc::new(Cipher::random().unwrap());
        let store = Arc::new(Store::open_in_memory(cipher).await.unwrap());
        let backend = Arc::new(GatedBackend {
            gate: Semaphore::new(permits),
            fail,
        });
        (store, backend)
    }

    fn job(n: usize) -> ExtractionJob {
        ExtractionJob {
            conversation_id: "c1".into(),
            user_text: format!("message number {n}"),
            assistant_text: "ok".into(),
            assistant_message_id: format!("m{n}"),
            model: "llama3:8b".into(),
        }
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let (store, backend) = setup(10, false).await;
        let extractor = Arc::new(FactExtractor::new(backend, store.clone(), None, 0.99));
        let worker = ExtractionWorker::spawn(extractor, 8);

        assert!(worker.enqueue(job(1)));
        assert!(worker.enqueue(job(2)));
        worker.shutdown().await;

        assert_eq!(store.list_facts().await.unwrap().len(), 2);
        assert!(!worker.enqueue(job(3)));
    }

    #[tokio::test]
    #[traced_test]
    async fn full_queue_drops_without_blocking() {
        let (store, backend) = setup(0, false).await;
        let extractor = Arc::new(FactExtractor::new(backend.clone(), store, None, 0.9));
        let worker = ExtractionWorker::spawn(extractor, 1);

        // The first job is taken by the task and parks on the gate.
        assert!(worker.enqueue(job(1)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(worker.enqueue(job(2)));
        assert!(!worker.enqueue(job(3)));
        assert!(logs_contain("extraction queue full"));

        backend.gate.add_permits(2);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let (store, backend) = setup(10, true).await;
        let extractor = Arc::new(FactExtractor::new(backend, store.clone(), None, 0.9));
        let worker = ExtractionWorker::spawn(extractor, 4);

        assert!(worker.enqueue(job(1)));
        assert!(worker.enqueue(job(2)));
        worker.shutdown().await;
        assert!(store.list_facts().await.unwrap().is_empty());
    }
}
