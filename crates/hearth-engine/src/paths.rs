// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine binary discovery and platform asset selection.

use std::path::{Path, PathBuf};

use hearth_config::model::EngineConfig;
use tracing::debug;

/// System directories searched after the bundled copy, before `PATH`.
const WELL_KNOWN_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// File name of the engine executable on this platform.
pub fn executable_name(binary_name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{binary_name}.exe")
    } else {
        binary_name.to_string()
    }
}

/// Where a downloaded engine is installed.
pub fn bundled_binary_path(bin_dir: &Path, binary_name: &str) -> PathBuf {
    bin_dir.join(executable_name(binary_name))
}

/// Find an engine binary without downloading anything.
///
/// Order: bundled copy, configured `binary_path`, well-known system
/// directories, then each entry of `PATH`.
pub fn locate_binary(config: &EngineConfig, bin_dir: &Path) -> Option<PathBuf> {
    let bundled = bundled_binary_path(bin_dir, &config.binary_name);
    if bundled.is_file() {
        debug!(path = %bundled.display(), "using bundled engine binary");
        return Some(bundled);
    }

    if let Some(explicit) = &config.binary_path
        && explicit.is_file()
    {
        debug!(path = %explicit.display(), "using configured engine binary");
        return Some(explicit.clone());
    }

    let name = executable_name(&config.binary_name);
    let path_dirs = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();

    WELL_KNOWN_DIRS
        .iter()
        .map(PathBuf::from)
        .chain(path_dirs)
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file())
        .inspect(|found| debug!(path = %found.display(), "found system engine binary"))
}

/// Release asset name for the running OS and architecture.
pub fn platform_asset_name() -> Option<&'static str> {
    asset_name_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn asset_name_for(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("macos", "aarch64" | "x86_64") => Some("ollama-darwin"),
        ("linux", "x86_64") => Some("ollama-linux-amd64"),
        ("linux", "aarch64") => Some("ollama-linux-arm64"),
        _ => None,
    }
}
