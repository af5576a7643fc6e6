// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{HearthConfig, KeySource};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first.
pub fn validate_config(config: &HearthConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.paths.data_dir.as_os_str().is_empty() {
        errors.push(ConfigError::validation("paths.data_dir must not be empty"));
    }

    if config.storage.database_file.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_file must not be empty",
        ));
    }

    if config.vault.key_source == KeySource::Passphrase {
        if config.vault.kdf_memory_cost < 32768 {
            errors.push(ConfigError::validation(format!(
                "vault.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
                config.vault.kdf_memory_cost
            )));
        }
        if config.vault.kdf_iterations < 2 {
            errors.push(ConfigError::validation(format!(
                "vault.kdf_iterations must be at least 2, got {}",
                config.vault.kdf_iterations
            )));
        }
        if config.vault.kdf_parallelism < 1 {
            errors.push(ConfigError::validation(
                "vault.kdf_parallelism must be at least 1",
            ));
        }
    }

    let engine = &config.engine;
    if engine.binary_name.trim().is_empty() || engine.binary_name.contains('/') {
        errors.push(ConfigError::validation(format!(
            "engine.binary_name `{}` must be a bare file name",
            engine.binary_name
        )));
    }
    if !engine.download_base_url.starts_with("https://")
        && !engine.download_base_url.starts_with("http://")
    {
        errors.push(ConfigError::validation(format!(
            "engine.download_base_url `{}` must be an http(s) URL",
            engine.download_base_url
        )));
    }
    if let Some(sum) = &engine.binary_sha256
        && (sum.len() != 64 || !sum.chars().all(|c| c.is_ascii_hexdigit()))
    {
        errors.push(ConfigError::validation(
            "engine.binary_sha256 must be 64 hex characters",
        ));
    }
    if engine.health_max_attempts == 0 {
        errors.push(ConfigError::validation(
            "engine.health_max_attempts must be at least 1",
        ));
    }
    if engine.initial_backoff_ms == 0 || engine.initial_backoff_ms > engine.max_backoff_ms {
        errors.push(ConfigError::validation(format!(
            "engine.initial_backoff_ms ({}) must be positive and not exceed engine.max_backoff_ms ({})",
            engine.initial_backoff_ms, engine.max_backoff_ms
        )));
    }
    if engine.health_timeout_ms == 0 {
        errors.push(ConfigError::validation(
            "engine.health_timeout_ms must be positive",
        ));
    }

    if config.chat.title_max_chars == 0 {
        errors.push(ConfigError::validation(
            "chat.title_max_chars must be at least 1",
        ));
    }

    let memory = &config.memory;
    if !(0.0..=1.0).contains(&memory.dedup_threshold) {
        errors.push(ConfigError::validation(format!(
            "memory.dedup_threshold must be within 0.0..=1.0, got {}",
            memory.dedup_threshold
        )));
    }
    if memory.queue_capacity == 0 {
        errors.push(ConfigError::validation(
            "memory.queue_capacity must be at least 1",
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
