// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD.

use hearth_core::HearthError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::ConversationRow;

const COLUMNS: &str = "id, title, model, created_at, updated_at";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        title: row.get(1)?,
        model: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub async fn insert_conversation(db: &Database, conv: ConversationRow) -> Result<(), HearthError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, title, model, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![conv.id, conv.title, conv.model, conv.created_at, conv.updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<ConversationRow>, HearthError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Most recently active first.
pub async fn list_conversations(db: &Database) -> Result<Vec<ConversationRow>, HearthError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations ORDER BY updated_at DESC, id ASC"
            ))?;
            let rows = stmt.query_map([], from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the sealed title. Returns false when no such conversation exists.
pub async fn update_title(
    db: &Database,
    id: &str,
    title: Vec<u8>,
    updated_at: &str,
) -> Result<bool, HearthError> {
    let id = id.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3",
                params![title, updated_at, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a conversation; its messages go with it via `ON DELETE CASCADE`.
pub async fn delete_conversation(db: &Database, id: &str) -> Result<bool, HearthError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
