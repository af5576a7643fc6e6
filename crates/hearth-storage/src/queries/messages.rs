// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence.

use hearth_core::HearthError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::MessageRow;

/// Insert a message and bump the parent's `updated_at` in one transaction.
///
/// Returns false, writing nothing, when the conversation does not exist.
pub async fn insert_message(db: &Database, msg: MessageRow) -> Result<bool, HearthError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let touched = tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![msg.timestamp, msg.conversation_id],
            )?;
            if touched == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO messages (id, conversation_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![msg.id, msg.conversation_id, msg.role, msg.content, msg.timestamp],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Messages in insertion order. Ties on timestamp fall back to the row sequence.
pub async fn messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MessageRow>, HearthError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, timestamp
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY timestamp ASC, seq ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_messages(db: &Database, conversation_id: &str) -> Result<i64, HearthError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
