// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted SQLite persistence for Hearth.
//!
//! WAL-mode SQLite with embedded migrations and a single writer through
//! `tokio-rusqlite`. Titles, message bodies, fact subjects, and the settings
//! payload are sealed with the vault cipher; ids, roles, and timestamps stay
//! in the clear so ordering and cascades work in SQL.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::Store;
