// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./hearth.toml` > `~/.config/hearth/hearth.toml` >
//! `/etc/hearth/hearth.toml`, with `HEARTH_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::HearthConfig;

/// Config file name searched in each location.
pub const CONFIG_FILE_NAME: &str = "hearth.toml";

const SYSTEM_CONFIG_PATH: &str = "/etc/hearth/hearth.toml";

/// Sections recognised in `HEARTH_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "paths", "storage", "vault", "engine", "chat", "memory", "logging",
];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hearth/hearth.toml`
/// 3. `~/.config/hearth/hearth.toml`
/// 4. `./hearth.toml`
/// 5. `HEARTH_*` environment variables
pub fn load_config() -> Result<HearthConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<HearthConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HearthConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HearthConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HearthConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for hierarchical loading, before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(HearthConfig::default()));
    for path in config_file_locations() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Candidate config files, lowest precedence first.
pub fn config_file_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("hearth").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Environment provider mapping `HEARTH_ENGINE_HEALTH_MAX_ATTEMPTS` to
/// `engine.health_max_attempts`.
///
/// Only the underscore after a known section name becomes a dot, so keys
/// that contain underscores survive intact.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("HEARTH_")
        .filter(|key| section_of(&key.as_str().to_ascii_lowercase()).is_some())
        .map(|key| {
            let key_str = key.as_str().to_ascii_lowercase();
            match section_of(&key_str) {
                Some((section, rest)) => format!("{section}.{rest}").into(),
                None => key_str.into(),
            }
        })
}

/// Splits `engine_manage_process` into `("engine", "manage_process")`. Variables outside the
/// known sections (such as `HEARTH_PASSPHRASE`) are not configuration.
fn section_of(key: &str) -> Option<(&'static str, &str)> {
    ENV_SECTIONS.iter().find_map(|section| {
        key.strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
            .map(|rest| (*section, rest))
    })
}
