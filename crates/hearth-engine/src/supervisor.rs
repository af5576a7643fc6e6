// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine lifecycle supervision.
//!
//! The observable [`EngineState`] lives in a watch channel. Transitions are
//! serialized by an async mutex that also owns the child process, so
//! concurrent [`Supervisor::ensure`] calls coalesce: the first caller does
//! the work and later callers find the engine ready.
//!
//! A ready engine can be detached so it keeps serving after this process
//! exits. Its pid goes to a pid file, which lets a later invocation stop it
//! or replace it when it stops answering.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hearth_config::HearthConfig;
use hearth_config::model::EngineConfig;
use hearth_core::{EngineHealth, EngineState, Event, EventSink, HearthError, SetupStage};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::client::{self, EngineClient};
use crate::paths;
use crate::process::{self, EngineProcess};
use crate::provision;

#[derive(Default)]
struct Lifecycle {
    process: Option<EngineProcess>,
    binary: Option<PathBuf>,
    spawn_count: u64,
}

pub struct Supervisor {
    config: EngineConfig,
    bin_dir: PathBuf,
    models_dir: PathBuf,
    pid_file: PathBuf,
    client: EngineClient,
    download_http: reqwest::Client,
    sink: Arc<dyn EventSink>,
    state: watch::Sender<EngineState>,
    lifecycle: Mutex<Lifecycle>,
}

impl Supervisor {
    /// Supervisor for the engine reached through `client`.
    pub fn new(
        config: &HearthConfig,
        client: EngineClient,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, HearthError> {
        let download_http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.engine.connect_timeout_ms))
            .build()
            .map_err(|e| HearthError::Internal(format!("failed to build HTTP client: {e}")))?;

        let (state, _) = watch::channel(EngineState::NotProvisioned);
        Ok(Self {
            config: config.engine.clone(),
            bin_dir: config.bin_dir(),
            models_dir: config.models_dir(),
            pid_file: config.engine_pid_path(),
            client,
            download_http,
            sink,
            state,
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    /// Number of engine processes spawned over this supervisor's lifetime.
    pub async fn spawn_count(&self) -> u64 {
        self.lifecycle.lock().await.spawn_count
    }

    /// Where a detached engine's pid is recorded.
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// One health check. Never changes state and never provisions.
    pub async fn check(&self) -> bool {
        self.client.is_healthy(self.health_timeout()).await
    }

    pub async fn version(&self) -> Result<String, HearthError> {
        self.client.version().await
    }

    /// Bring the engine to `Ready`, installing and starting it if needed.
    pub async fn ensure(&self) -> Result<(), HearthError> {
        let mut life = self.lifecycle.lock().await;

        if self.state() == EngineState::Ready && self.check().await {
            return Ok(());
        }

        self.report(SetupStage::Checking, "Checking AI engine...", None);

        if let Some(process) = life.process.as_mut()
            && let Some(status) = process.try_exit_status()
        {
            warn!(pid = process.pid(), ?status, "engine process exited unexpectedly");
            life.process = None;
        }

        if self.check().await {
            if life.process.is_none() {
                info!(url = %self.client.base_url(), "adopting running engine");
            }
            self.become_ready();
            return Ok(());
        }

        if !self.config.manage_process {
            return Err(self.fail(format!(
                "no engine answering at {} and process management is disabled",
                self.client.base_url()
            )));
        }

        // The managed engine listens where the client connects.
        let bind = match client::loopback_bind_address(self.client.base_url()) {
            Ok(bind) => bind,
            Err(e) => return Err(self.fail(e.to_string())),
        };

        if let Some(stale) = life.process.take() {
            warn!(pid = stale.pid(), "restarting unresponsive engine");
            stale.terminate(self.shutdown_grace()).await;
        }
        if let Some(pid) = process::read_pid_file(&self.pid_file).await {
            warn!(pid, "replacing unresponsive detached engine");
            process::terminate_detached(pid, self.shutdown_grace()).await;
            process::remove_pid_file(&self.pid_file).await;
        }

        let binary = match life.binary.clone().filter(|b| b.is_file()) {
            Some(known) => known,
            None => match paths::locate_binary(&self.config, &self.bin_dir) {
                Some(found) => found,
                None => {
                    self.state.send_replace(EngineState::Provisioning);
                    match self.provision().await {
                        Ok(installed) => installed,
                        Err(e) => return Err(self.fail(e.to_string())),
                    }
                }
            },
        };
        life.binary = Some(binary.clone());

        self.state.send_replace(EngineState::Starting);
        self.report(SetupStage::Starting, "Starting AI engine...", None);
        let process = match EngineProcess::spawn(&binary, &bind, &self.models_dir) {
            Ok(p) => p,
            Err(e) => return Err(self.fail(e.to_string())),
        };
        life.spawn_count += 1;
        let process = life.process.insert(process);

        self.report(SetupStage::Starting, "Waiting for AI engine to be ready...", None);
        match self.wait_healthy(process).await {
            Ok(()) => {
                self.become_ready();
                Ok(())
            }
            Err(reason) => {
                if let Some(dead) = life.process.take() {
                    dead.terminate(Duration::ZERO).await;
                }
                Err(self.fail(reason))
            }
        }
    }

    /// Record that the engine stopped answering. The next `ensure` restarts it.
    pub fn mark_degraded(&self, reason: &str) {
        let changed = self.state.send_if_modified(|state| {
            if *state == EngineState::Ready {
                *state = EngineState::Degraded;
                true
            } else {
                false
            }
        });
        if changed {
            warn!(reason, "engine marked degraded");
        }
    }

    /// Release a ready engine so it outlives this process.
    ///
    /// An engine that is not ready is stopped instead. Engines this
    /// supervisor adopted rather than spawned are left alone.
    pub async fn detach(&self) {
        let mut life = self.lifecycle.lock().await;
        let Some(process) = life.process.take() else {
            return;
        };
        if self.state() != EngineState::Ready {
            info!(pid = process.pid(), "stopping engine that never became ready");
            process.terminate(self.shutdown_grace()).await;
            self.state.send_replace(EngineState::NotProvisioned);
            return;
        }
        if let Err(e) = process.detach(&self.pid_file).await {
            // The handle was dropped with the error, which kills the child.
            warn!(error = %e, "could not record engine pid, engine stopped");
            self.state.send_replace(EngineState::NotProvisioned);
        }
    }

    /// Stop the managed engine, whether this process spawned it or an
    /// earlier one detached it: SIGTERM, then SIGKILL after the grace period.
    ///
    /// Returns false when there was no managed engine to stop.
    pub async fn stop(&self) -> bool {
        let mut life = self.lifecycle.lock().await;
        let stopped = if let Some(process) = life.process.take() {
            info!(pid = process.pid(), "stopping engine");
            process.terminate(self.shutdown_grace()).await;
            true
        } else if let Some(pid) = process::read_pid_file(&self.pid_file).await {
            info!(pid, "stopping detached engine");
            process::terminate_detached(pid, self.shutdown_grace()).await;
            true
        } else {
            false
        };
        process::remove_pid_file(&self.pid_file).await;
        if stopped {
            self.state.send_replace(EngineState::NotProvisioned);
        }
        stopped
    }

    async fn provision(&self) -> Result<PathBuf, HearthError> {
        let asset = paths::platform_asset_name().ok_or_else(|| HearthError::ProvisioningFailed {
            reason: format!(
                "no engine build for {}-{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
        })?;
        let url = provision::download_url(&self.config.download_base_url, asset);
        let dest = paths::bundled_binary_path(&self.bin_dir, &self.config.binary_name);
        provision::download_engine(
            &self.download_http,
            &url,
            &dest,
            self.config.binary_sha256.as_deref(),
            self.sink.as_ref(),
        )
        .await
    }

    /// Check health with exponential backoff until healthy or out of attempts, or until the child exits.
    async fn wait_healthy(&self, process: &mut EngineProcess) -> Result<(), String> {
        let max_attempts = self.config.health_max_attempts.max(1);
        let max_backoff = Duration::from_millis(self.config.max_backoff_ms);
        let mut delay = Duration::from_millis(self.config.initial_backoff_ms);

        for attempt in 1..=max_attempts {
            if let Some(status) = process.try_exit_status() {
                return Err(format!("engine exited during startup ({status})"));
            }
            if self.check().await {
                debug!(attempt, "engine answered health check");
                return Ok(());
            }
            debug!(attempt, max_attempts, "engine not ready yet");
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_backoff);
            }
        }
        Err(format!(
            "engine did not become healthy after {max_attempts} attempts"
        ))
    }

    fn become_ready(&self) {
        self.state.send_replace(EngineState::Ready);
        self.report(SetupStage::Ready, "AI engine ready!", None);
        info!("engine ready");
    }

    fn fail(&self, reason: String) -> HearthError {
        warn!(%reason, "engine setup failed");
        self.state.send_replace(EngineState::Failed(reason.clone()));
        self.report(SetupStage::Error, reason.clone(), None);
        HearthError::ProvisioningFailed { reason }
    }

    fn report(&self, stage: SetupStage, message: impl Into<String>, progress: Option<f64>) {
        self.sink.emit(Event::setup(stage, message, progress));
    }

    fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.config.health_timeout_ms)
    }

    fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.config.shutdown_grace_ms)
    }
}

impl EngineHealth for Supervisor {
    fn mark_degraded(&self, reason: &str) {
        Supervisor::mark_degraded(self, reason);
    }
}
