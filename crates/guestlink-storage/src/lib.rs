// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Guestlink engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, typed CRUD for
//! links, guest sessions, conversation messages, and routing rules, and the
//! serialized per-conversation append path.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use database::Database;
pub use models::*;
pub use writer::ConversationWriter;
