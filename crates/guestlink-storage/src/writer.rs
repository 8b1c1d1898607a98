// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation serialized append path.
//!
//! All writes in guestlink-storage run on tokio-rusqlite's single background
//! thread, and [`ConversationWriter::append`] wraps each append in one
//! transaction that allocates `seq` and the timestamp together. Concurrent
//! guest and owner writes to the same conversation therefore serialize with
//! deterministic history order, while writes to different conversations
//! interleave freely (their seq spaces are independent).
//!
//! **Do NOT append to `conversation_messages` outside this writer.**

use chrono::Utc;
use guestlink_core::GuestlinkError;

use crate::database::Database;
use crate::models::{ConversationMessage, NewMessage};
use crate::queries::messages;

/// The single append path into conversation timelines.
#[derive(Clone)]
pub struct ConversationWriter {
    db: Database,
}

impl ConversationWriter {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a message, allocating seq and a strictly-increasing timestamp.
    pub async fn append(&self, new: NewMessage) -> Result<ConversationMessage, GuestlinkError> {
        messages::append_message(&self.db, new, Utc::now()).await
    }

    /// Read a conversation's transcript in timeline order.
    pub async fn transcript(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>, GuestlinkError> {
        messages::list_messages(&self.db, conversation_id).await
    }
}
