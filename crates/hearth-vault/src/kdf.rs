// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key derivation.
//!
//! The default path expands a random machine secret with HKDF-SHA256. The
//! passphrase path stretches user input with Argon2id (v0x13).

use hearth_core::HearthError;
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

const HKDF_SALT: &[u8] = b"hearth-salt";
const HKDF_INFO: &[u8] = b"hearth-encryption-key";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Expand a high-entropy secret into the 32-byte data key.
pub fn derive_from_secret(secret: &[u8]) -> Result<Zeroizing<[u8; 32]>, HearthError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT).extract(secret);
    let okm = prk
        .expand(&[HKDF_INFO], hkdf::HKDF_SHA256)
        .map_err(|_| HearthError::Internal("HKDF expand failed".to_string()))?;

    let mut key = Zeroizing::new([0u8; 32]);
    okm.fill(key.as_mut())
        .map_err(|_| HearthError::Internal("HKDF fill failed".to_string()))?;
    Ok(key)
}

/// Stretch a passphrase into the 32-byte data key.
pub fn derive_from_passphrase(
    passphrase: &[u8],
    salt: &[u8; 16],
    params: Argon2Params,
) -> Result<Zeroizing<[u8; 32]>, HearthError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| HearthError::Config(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, key.as_mut())
        .map_err(|e| HearthError::Internal(format!("Argon2id key derivation failed: {e}")))?;
    Ok(key)
}

/// Random bytes from the system CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<Zeroizing<[u8; N]>, HearthError> {
    let mut out = Zeroizing::new([0u8; N]);
    SystemRandom::new()
        .fill(out.as_mut())
        .map_err(|_| HearthError::Internal("system randomness unavailable".to_string()))?;
    Ok(out)
}
