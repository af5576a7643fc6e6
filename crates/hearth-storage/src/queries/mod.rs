// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions over raw rows.

pub mod conversations;
pub mod facts;
pub mod messages;
pub mod settings;
