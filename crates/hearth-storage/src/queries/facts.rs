// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact persistence.

use hearth_core::HearthError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::FactRow;

pub async fn insert_fact(db: &Database, fact: FactRow) -> Result<(), HearthError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO facts (id, subject, created_at, source_message_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![fact.id, fact.subject, fact.created_at, fact.source_message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest first.
pub async fn list_facts(db: &Database) -> Result<Vec<FactRow>, HearthError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject, created_at, source_message_id
                 FROM facts ORDER BY created_at DESC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(FactRow {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    created_at: row.get(2)?,
                    source_message_id: row.get(3)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_fact(db: &Database, id: &str) -> Result<bool, HearthError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM facts WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
