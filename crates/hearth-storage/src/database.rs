// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! makes [`Database`] the single writer. Do NOT open extra connections for
//! writes.

use std::path::Path;

use hearth_core::HearthError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the application database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub async fn open(path: &Path, wal_mode: bool) -> Result<Self, HearthError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(HearthError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(HearthError::storage)?;
        let db = Self::initialize(conn, wal_mode).await?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, HearthError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(HearthError::storage)?;
        Self::initialize(conn, false).await
    }

    async fn initialize(conn: Connection, wal_mode: bool) -> Result<Self, HearthError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<_, rusqlite::Error> { Ok(migrations::run_migrations(conn)) })
            .await
            .map_err(map_tr_err)?
            .map_err(HearthError::storage)?;
        debug!("migrations applied");

        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), HearthError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(HearthError::storage)
    }
}

/// Convert a tokio-rusqlite error into [`HearthError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> HearthError {
    HearthError::Storage {
        source: Box::new(e),
    }
}
