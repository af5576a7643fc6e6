// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key & crypto management for Hearth.
//!
//! The data key is derived once per process from machine-bound material
//! (a random secret in the data directory, or a passphrase stretched with
//! Argon2id), verified against a sealed check value, and held in a
//! [`Cipher`] for the lifetime of the process. It never leaves memory.

pub mod crypto;
pub mod kdf;
pub mod keyfile;
pub mod prompt;

use std::path::Path;
use std::sync::Arc;

use hearth_config::model::{KeySource, VaultConfig};
use hearth_core::HearthError;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

pub use crypto::Cipher;
pub use prompt::get_passphrase;

/// Derive the data key for `data_dir` and return a ready cipher.
///
/// In passphrase mode the passphrase is read through [`get_passphrase`].
pub fn unlock(data_dir: &Path, config: &VaultConfig) -> Result<Arc<Cipher>, HearthError> {
    match config.key_source {
        KeySource::Keyfile => unlock_with_keyfile(data_dir),
        KeySource::Passphrase => unlock_with_passphrase(data_dir, config, &get_passphrase()?),
    }
}

/// Keyfile mode: HKDF over the machine secret.
pub fn unlock_with_keyfile(data_dir: &Path) -> Result<Arc<Cipher>, HearthError> {
    let secret = keyfile::load_or_create_secret(data_dir)?;
    let cipher = Cipher::new(kdf::derive_from_secret(secret.as_ref())?);
    keyfile::verify_key(data_dir, &cipher)?;
    info!(source = "keyfile", "encryption key ready");
    Ok(Arc::new(cipher))
}

/// Passphrase mode: Argon2id over the supplied passphrase and stored salt.
pub fn unlock_with_passphrase(
    data_dir: &Path,
    config: &VaultConfig,
    passphrase: &SecretString,
) -> Result<Arc<Cipher>, HearthError> {
    let salt = keyfile::load_or_create_salt(data_dir)?;
    let key = kdf::derive_from_passphrase(
        passphrase.expose_secret().as_bytes(),
        &salt,
        kdf::Argon2Params {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        },
    )?;
    let cipher = Cipher::new(key);
    keyfile::verify_key(data_dir, &cipher)?;
    info!(source = "passphrase", "encryption key ready");
    Ok(Arc::new(cipher))
}
