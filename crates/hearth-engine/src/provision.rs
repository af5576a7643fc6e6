// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine binary download.
//!
//! The binary is streamed to a sibling temp file, optionally checked against
//! a SHA-256 digest, marked executable, and renamed into place, so a
//! half-written download is never mistaken for an installed engine.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use hearth_core::{Event, EventSink, HearthError, SetupStage};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Full download URL for `asset` under `base_url`.
pub fn download_url(base_url: &str, asset: &str) -> String {
    format!("{}/{asset}", base_url.trim_end_matches('/'))
}

/// Download the engine from `url` to `dest`, reporting progress through `sink`.
pub async fn download_engine(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    sink: &dyn EventSink,
) -> Result<PathBuf, HearthError> {
    let partial = partial_path(dest);
    let result = fetch_to(http, url, &partial, expected_sha256, sink).await;
    if let Err(e) = result {
        if let Err(rm) = tokio::fs::remove_file(&partial).await
            && rm.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %partial.display(), error = %rm, "failed to remove partial download");
        }
        return Err(e);
    }

    make_executable(&partial).await?;
    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| failed(format!("failed to install engine binary: {e}")))?;

    sink.emit(Event::setup(SetupStage::Downloading, "Download complete", Some(1.0)));
    info!(path = %dest.display(), "engine binary installed");
    Ok(dest.to_path_buf())
}

async fn fetch_to(
    http: &reqwest::Client,
    url: &str,
    partial: &Path,
    expected_sha256: Option<&str>,
    sink: &dyn EventSink,
) -> Result<(), HearthError> {
    sink.emit(Event::setup(SetupStage::Downloading, "Downloading AI engine...", Some(0.0)));
    info!(%url, "downloading engine binary");

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| failed(format!("download request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("download failed with HTTP {status}")));
    }

    if let Some(parent) = partial.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| failed(format!("cannot create {}: {e}", parent.display())))?;
    }
    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| failed(format!("cannot create {}: {e}", partial.display())))?;

    let total = response.content_length().filter(|t| *t > 0);
    let mut body = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut last_percent = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| failed(format!("download interrupted: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| failed(format!("write error: {e}")))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;

        if let Some(total) = total {
            let percent = downloaded.saturating_mul(100) / total;
            if percent > last_percent && percent < 100 {
                last_percent = percent;
                sink.emit(Event::setup(
                    SetupStage::Downloading,
                    format!("Downloading AI engine... {percent}%"),
                    Some(downloaded as f64 / total as f64),
                ));
            }
        }
    }
    file.flush()
        .await
        .map_err(|e| failed(format!("write error: {e}")))?;
    drop(file);
    debug!(bytes = downloaded, "engine download finished");

    if let Some(expected) = expected_sha256 {
        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(failed(format!(
                "checksum mismatch: expected {expected}, got {actual}"
            )));
        }
        debug!("engine checksum verified");
    }
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

async fn make_executable(path: &Path) -> Result<(), HearthError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| failed(format!("cannot mark engine executable: {e}")))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn failed(reason: String) -> HearthError {
    HearthError::ProvisioningFailed { reason }
}
