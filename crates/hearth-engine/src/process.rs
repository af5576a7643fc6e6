// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped handle to the engine child process.
//!
//! A handle either terminates its child or detaches it. A detached engine
//! keeps serving after this process exits; its pid is recorded in a pid file
//! so a later invocation can stop it.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use hearth_core::HearthError;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// A running `<binary> serve` child. Killed on drop unless detached.
pub struct EngineProcess {
    child: Option<Child>,
    pid: u32,
}

impl EngineProcess {
    /// Spawn the engine listening on `bind` (`host:port`), storing models in `models_dir`.
    pub fn spawn(binary: &Path, bind: &str, models_dir: &Path) -> Result<Self, HearthError> {
        std::fs::create_dir_all(models_dir).map_err(|e| HearthError::ProvisioningFailed {
            reason: format!("cannot create models directory {}: {e}", models_dir.display()),
        })?;

        let mut command = Command::new(binary);
        command
            .arg("serve")
            .env("OLLAMA_HOST", bind)
            .env("OLLAMA_MODELS", models_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Own process group, so Ctrl+C at the terminal reaches hearth and not the engine.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| HearthError::ProvisioningFailed {
            reason: format!("failed to start {}: {e}", binary.display()),
        })?;
        let pid = child.id().ok_or_else(|| HearthError::ProvisioningFailed {
            reason: "engine exited before reporting a pid".to_string(),
        })?;

        info!(pid, bind, binary = %binary.display(), "engine process started");
        Ok(Self {
            child: Some(child),
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the child has already exited.
    pub fn try_exit_status(&mut self) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!(pid = self.pid, error = %e, "failed to poll engine process");
                None
            }
        }
    }

    /// SIGTERM, wait up to `grace` for exit, then SIGKILL.
    pub async fn terminate(mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        #[cfg(unix)]
        if !grace.is_zero() && send_signal(self.pid, libc::SIGTERM) {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    info!(pid = self.pid, %status, "engine exited");
                    return;
                }
                Ok(Err(e)) => warn!(pid = self.pid, error = %e, "failed to wait for engine"),
                Err(_) => warn!(pid = self.pid, "engine ignored SIGTERM, killing"),
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        if let Err(e) = child.kill().await {
            debug!(pid = self.pid, error = %e, "kill failed, process likely gone");
        }
    }

    /// Release the child so it outlives this process, recording its pid in `pid_file`.
    pub async fn detach(mut self, pid_file: &Path) -> Result<u32, HearthError> {
        write_pid_file(pid_file, self.pid).await?;
        // Dropping a tokio child without `kill_on_drop` leaves it running.
        drop(self.child.take());
        info!(pid = self.pid, "engine left running");
        Ok(self.pid)
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            warn!(pid = self.pid, "engine process dropped while running, killing");
            if let Err(e) = child.start_kill() {
                debug!(pid = self.pid, error = %e, "kill failed, process likely gone");
            }
        }
    }
}

async fn write_pid_file(path: &Path, pid: u32) -> Result<(), HearthError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(HearthError::storage)?;
    }
    tokio::fs::write(path, format!("{pid}\n"))
        .await
        .map_err(HearthError::storage)
}

/// Pid recorded by a previous detach, if any.
pub async fn read_pid_file(path: &Path) -> Option<u32> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    text.trim().parse().ok()
}

pub async fn remove_pid_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "pid file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove pid file"),
    }
}

/// Stop an engine left running by an earlier invocation.
///
/// It is not our child, so there is no exit status to await: liveness is
/// polled with signal 0 until `grace` runs out, then it is killed.
#[cfg(unix)]
pub async fn terminate_detached(pid: u32, grace: Duration) {
    const POLL: Duration = Duration::from_millis(50);

    if !send_signal(pid, libc::SIGTERM) {
        debug!(pid, "detached engine already gone");
        return;
    }
    let deadline = tokio::time::Instant::now() + grace;
    let mut ticks = tokio::time::interval(POLL);
    while tokio::time::Instant::now() < deadline {
        ticks.tick().await;
        if !send_signal(pid, 0) {
            info!(pid, "detached engine exited");
            return;
        }
    }
    warn!(pid, "detached engine ignored SIGTERM, killing");
    send_signal(pid, libc::SIGKILL);
}

#[cfg(not(unix))]
pub async fn terminate_detached(pid: u32, _grace: Duration) {
    warn!(pid, "stopping a detached engine is only supported on unix");
}

/// `kill(2)`; false when the process does not exist.
#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    unsafe { libc::kill(pid, signal) == 0 }
}
