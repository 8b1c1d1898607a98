// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation timeline appends and reads.
//!
//! Appends allocate `seq` and the message timestamp inside one transaction.
//! If the wall clock has not advanced past the previous message (or moved
//! backwards), the new timestamp is bumped 1ms past the previous one so the
//! timeline's timestamps stay strictly increasing alongside `seq`.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use guestlink_core::GuestlinkError;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};
use crate::models::{ConversationMessage, NewMessage};

/// Append a message to a conversation, allocating seq and timestamp.
pub async fn append_message(
    db: &Database,
    new: NewMessage,
    now: DateTime<Utc>,
) -> Result<ConversationMessage, GuestlinkError> {
    let id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| -> Result<ConversationMessage, rusqlite::Error> {
            let tx = conn.transaction()?;

            type SeqAndTs = (i64, Option<String>);
            let (last_seq, last_created): SeqAndTs = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0), MAX(created_at)
                 FROM conversation_messages WHERE conversation_id = ?1",
                params![new.conversation_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let mut created_at = now;
            if let Some(ref last) = last_created
                && let Ok(last_ts) = DateTime::parse_from_rfc3339(last)
            {
                let last_ts = last_ts.with_timezone(&Utc);
                if created_at <= last_ts {
                    created_at = last_ts + Duration::milliseconds(1);
                }
            }
            let created_at = created_at.to_rfc3339_opts(SecondsFormat::Millis, true);

            let message = ConversationMessage {
                id,
                conversation_id: new.conversation_id,
                seq: last_seq + 1,
                role: new.role,
                content: new.content,
                session_id: new.session_id,
                link_id: new.link_id,
                guest_greeting: new.guest_greeting,
                intent: new.intent,
                participant_name: new.participant_name,
                created_at,
            };

            tx.execute(
                "INSERT INTO conversation_messages (id, conversation_id, seq, role, content,
                     session_id, link_id, guest_greeting, intent, participant_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    message.id,
                    message.conversation_id,
                    message.seq,
                    message.role,
                    message.content,
                    message.session_id,
                    message.link_id,
                    message.guest_greeting,
                    message.intent,
                    message.participant_name,
                    message.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// List a conversation's messages in timeline order.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<ConversationMessage>, GuestlinkError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ConversationMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, seq, role, content, session_id, link_id,
                        guest_greeting, intent, participant_name, created_at
                 FROM conversation_messages WHERE conversation_id = ?1 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(ConversationMessage {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    seq: row.get(2)?,
                    role: row.get(3)?,
                    content: row.get(4)?,
                    session_id: row.get(5)?,
                    link_id: row.get(6)?,
                    guest_greeting: row.get(7)?,
                    intent: row.get(8)?,
                    participant_name: row.get(9)?,
                    created_at: row.get(10)?,
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
