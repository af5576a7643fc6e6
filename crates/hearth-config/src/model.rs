// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Hearth.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup with a suggestion instead of being silently ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// This is operator-level configuration (paths, ports, timeouts). User-facing
/// settings such as theme and system prompt live in the encrypted store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HearthConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HearthConfig {
    /// Absolute path of the encrypted database file.
    pub fn database_path(&self) -> PathBuf {
        let file = PathBuf::from(&self.storage.database_file);
        if file.is_absolute() {
            file
        } else {
            self.paths.data_dir.join(file)
        }
    }

    /// Directory holding the engine binary.
    pub fn bin_dir(&self) -> PathBuf {
        self.paths.data_dir.join("bin")
    }

    /// Directory holding downloaded model weights.
    pub fn models_dir(&self) -> PathBuf {
        self.paths.data_dir.join("models")
    }

    /// Pid of a managed engine left running between invocations.
    pub fn engine_pid_path(&self) -> PathBuf {
        self.paths.data_dir.join("engine.pid")
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Application-private directory for the database, key material, engine, and models.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hearth"))
        .unwrap_or_else(|| PathBuf::from(".hearth"))
}

/// SQLite storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Database file name, relative to `paths.data_dir` unless absolute.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            wal_mode: true,
        }
    }
}

fn default_database_file() -> String {
    "hearth.db".to_string()
}

/// Where the encryption key comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// A random secret stored in the data directory.
    #[default]
    Keyfile,
    /// A passphrase supplied at startup, stretched with Argon2id.
    Passphrase,
}

/// Key management settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    #[serde(default)]
    pub key_source: KeySource,

    /// Argon2id memory cost in KiB (passphrase mode only).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iterations (passphrase mode only).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id lanes (passphrase mode only).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_source: KeySource::default(),
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Engine subprocess and HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Executable name, used for the bundled copy and the PATH search.
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Explicit binary location. Skips discovery when set.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Base URL release assets are downloaded from.
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Expected SHA-256 of the downloaded binary, hex encoded.
    #[serde(default)]
    pub binary_sha256: Option<String>,

    /// Spawn and supervise the engine. When false, only an external engine is used.
    #[serde(default = "default_true")]
    pub manage_process: bool,

    /// Timeout for each health check.
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    /// Health checks attempted after spawning before giving up.
    #[serde(default = "default_health_max_attempts")]
    pub health_max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Time between SIGTERM and SIGKILL on shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// TCP connect timeout for API requests. Generation itself has no total timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_name: default_binary_name(),
            binary_path: None,
            download_base_url: default_download_base_url(),
            binary_sha256: None,
            manage_process: true,
            health_timeout_ms: default_health_timeout_ms(),
            health_max_attempts: default_health_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_binary_name() -> String {
    "ollama".to_string()
}

fn default_download_base_url() -> String {
    "https://github.com/ollama/ollama/releases/latest/download".to_string()
}

fn default_health_timeout_ms() -> u64 {
    2000
}

fn default_health_max_attempts() -> u32 {
    12
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    4000
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

/// Chat orchestration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Maximum characters of the first message used as a conversation title.
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_title_max_chars() -> usize {
    50
}

/// Long-term memory settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Run fact extraction after each completed turn.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model used for extraction. Falls back to the turn's model.
    #[serde(default)]
    pub extraction_model: Option<String>,

    /// Upper bound on facts injected into a prompt.
    #[serde(default = "default_max_context_facts")]
    pub max_context_facts: usize,

    /// Similarity at or above which a candidate counts as a duplicate.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,

    /// Pending extraction jobs held before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extraction_model: None,
            max_context_facts: default_max_context_facts(),
            dedup_threshold: default_dedup_threshold(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_max_context_facts() -> usize {
    20
}

fn default_dedup_threshold() -> f64 {
    0.9
}

fn default_queue_capacity() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
