// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM field encryption.
//!
//! Sealed blobs are laid out as `nonce (12) || ciphertext || tag (16)`. Every
//! [`Cipher::encrypt`] call draws a fresh 96-bit nonce from the system CSPRNG.

use hearth_core::HearthError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Holds the process encryption key and seals/opens payloads with it.
///
/// Debug output omits the key.
pub struct Cipher {
    key: Zeroizing<[u8; 32]>,
    rng: SystemRandom,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("key", &"[REDACTED]").finish()
    }
}

impl Cipher {
    pub fn new(key: Zeroizing<[u8; 32]>) -> Self {
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    /// A cipher over a freshly generated random key.
    pub fn random() -> Result<Self, HearthError> {
        Ok(Self::new(generate_random_key()?))
    }

    fn aead_key(&self) -> Result<LessSafeKey, HearthError> {
        let unbound = UnboundKey::new(&AES_256_GCM, self.key.as_ref())
            .map_err(|_| HearthError::Internal("failed to create AES-256-GCM key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt `plaintext` under a new random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, HearthError> {
        let key = self.aead_key()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| HearthError::Internal("failed to generate random nonce".to_string()))?;

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| HearthError::Internal("AES-256-GCM encryption failed".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(blob)
    }

    /// Decrypt a blob produced by [`Cipher::encrypt`].
    ///
    /// Fails with [`HearthError::Decryption`] when the blob is truncated or the
    /// tag does not verify. Callers attach the record id.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, HearthError> {
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(HearthError::Decryption { record: None });
        }
        let key = self.aead_key()?;

        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| HearthError::Decryption { record: None })?;

        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| HearthError::Decryption { record: None })?;
        Ok(plaintext.to_vec())
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, HearthError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt into UTF-8. Invalid UTF-8 is treated as corruption.
    pub fn decrypt_str(&self, blob: &[u8]) -> Result<String, HearthError> {
        String::from_utf8(self.decrypt(blob)?).map_err(|_| HearthError::Decryption { record: None })
    }
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<Zeroizing<[u8; 32]>, HearthError> {
    let mut key = Zeroizing::new([0u8; 32]);
    SystemRandom::new()
        .fill(key.as_mut())
        .map_err(|_| HearthError::Internal("failed to generate random key".to_string()))?;
    Ok(key)
}
