// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase acquisition via the HEARTH_PASSPHRASE variable or a TTY prompt.

use hearth_core::HearthError;
use secrecy::SecretString;

pub const PASSPHRASE_ENV_VAR: &str = "HEARTH_PASSPHRASE";

/// Environment first, then an interactive prompt when stdin is a terminal.
pub fn get_passphrase() -> Result<SecretString, HearthError> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(SecretString::from(value));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Hearth passphrase: ");
        let passphrase = rpassword::read_password()
            .map_err(|e| HearthError::Config(format!("failed to read passphrase: {e}")))?;
        if passphrase.is_empty() {
            return Err(HearthError::Config("empty passphrase not allowed".to_string()));
        }
        return Ok(SecretString::from(passphrase));
    }

    Err(HearthError::Config(format!(
        "no passphrase provided; set {PASSPHRASE_ENV_VAR} or run interactively"
    )))
}
