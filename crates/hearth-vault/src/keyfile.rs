// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material persisted in the data directory.
//!
//! Files are created owner-read/write only and are never rewritten once
//! present: replacing the keyfile would orphan every encrypted record.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use hearth_core::HearthError;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::Cipher;
use crate::kdf;

pub const KEYFILE_NAME: &str = ".keyfile";
pub const SALT_FILE_NAME: &str = ".salt";
pub const KEYCHECK_FILE_NAME: &str = ".keycheck";

const KEYCHECK_PLAINTEXT: &[u8] = b"hearth key check v1";

/// Read the 32-byte machine secret, creating it on first run.
pub fn load_or_create_secret(dir: &Path) -> Result<Zeroizing<[u8; 32]>, HearthError> {
    load_or_create::<32>(&dir.join(KEYFILE_NAME))
}

/// Read the 16-byte Argon2id salt, creating it on first run.
pub fn load_or_create_salt(dir: &Path) -> Result<Zeroizing<[u8; 16]>, HearthError> {
    load_or_create::<16>(&dir.join(SALT_FILE_NAME))
}

fn load_or_create<const N: usize>(path: &Path) -> Result<Zeroizing<[u8; N]>, HearthError> {
    match fs::read(path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            if bytes.len() != N {
                return Err(HearthError::Config(format!(
                    "{} has length {}, expected {N}",
                    path.display(),
                    bytes.len()
                )));
            }
            let mut out = Zeroizing::new([0u8; N]);
            out.copy_from_slice(&bytes);
            debug!(path = %path.display(), "loaded key material");
            Ok(out)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let fresh = kdf::random_bytes::<N>()?;
            write_private(path, fresh.as_ref())?;
            info!(path = %path.display(), "created key material");
            Ok(fresh)
        }
        Err(e) => Err(HearthError::storage(e)),
    }
}

/// Confirm `cipher` matches the key that sealed the check file, recording one if absent.
///
/// A mismatch surfaces as a single [`HearthError::Decryption`] at startup
/// rather than a failure on every record.
pub fn verify_key(dir: &Path, cipher: &Cipher) -> Result<(), HearthError> {
    let path = dir.join(KEYCHECK_FILE_NAME);
    match fs::read(&path) {
        Ok(blob) => {
            let opened = cipher.decrypt(&blob).map_err(|_| HearthError::Decryption {
                record: Some(KEYCHECK_FILE_NAME.to_string()),
            })?;
            if opened != KEYCHECK_PLAINTEXT {
                return Err(HearthError::Decryption {
                    record: Some(KEYCHECK_FILE_NAME.to_string()),
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            write_private(&path, &cipher.encrypt(KEYCHECK_PLAINTEXT)?)
        }
        Err(e) => Err(HearthError::storage(e)),
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> Result<(), HearthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(HearthError::storage)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(HearthError::storage)?;
    file.write_all(bytes).map_err(HearthError::storage)?;
    file.sync_all().map_err(HearthError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn secret_is_created_once_and_reused() {
        let dir = tempdir().unwrap();
        let first = load_or_create_secret(dir.path()).unwrap();
        let second = load_or_create_secret(dir.path()).unwrap();
        assert_eq!(*first, *second);
        assert_eq!(fs::read(dir.path().join(KEYFILE_NAME)).unwrap().len(), 32);
    }

    #[cfg(unix)]
    #[test]
    fn keyfile_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        load_or_create_secret(dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join(KEYFILE_NAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn short_keyfile_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(KEYFILE_NAME), [1u8; 5]).unwrap();
        assert!(matches!(
            load_or_create_secret(dir.path()),
            Err(HearthError::Config(_))
        ));
    }

    #[test]
    fn keycheck_detects_a_different_key() {
        let dir = tempdir().unwrap();
        let original = Cipher::random().unwrap();
        verify_key(dir.path(), &original).unwrap();
        verify_key(dir.path(), &original).unwrap();

        let other = Cipher::random().unwrap();
        let err = verify_key(dir.path(), &other).unwrap_err();
        assert!(matches!(err, HearthError::Decryption { .. }));
    }
}
