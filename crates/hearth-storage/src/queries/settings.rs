// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `app_config` singleton row (id is always 1).

use hearth_core::HearthError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Insert `payload` only when the row is missing.
pub async fn insert_default(
    db: &Database,
    payload: Vec<u8>,
    updated_at: &str,
) -> Result<bool, HearthError> {
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO app_config (id, payload, updated_at) VALUES (1, ?1, ?2)",
                params![payload, updated_at],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn read_payload(db: &Database) -> Result<Option<Vec<u8>>, HearthError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT payload FROM app_config WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn write_payload(
    db: &Database,
    payload: Vec<u8>,
    updated_at: &str,
) -> Result<(), HearthError> {
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO app_config (id, payload, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload,
                                               updated_at = excluded.updated_at",
                params![payload, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
