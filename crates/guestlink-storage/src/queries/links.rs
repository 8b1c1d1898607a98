// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link and conversation CRUD operations.

use guestlink_core::GuestlinkError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{Conversation, LinkRecord};

const LINK_COLUMNS: &str = "id, owner_id, conversation_id, active, expires_at, max_sessions,
     max_messages_per_session, rate_per_minute, allowed_origins, intent,
     system_prompt_override, opening_message, send_opening_message,
     token_handle, created_at, revoked_at";

fn row_to_link(row: &rusqlite::Row<'_>) -> Result<LinkRecord, rusqlite::Error> {
    Ok(LinkRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        conversation_id: row.get(2)?,
        active: row.get(3)?,
        expires_at: row.get(4)?,
        max_sessions: row.get(5)?,
        max_messages_per_session: row.get(6)?,
        rate_per_minute: row.get(7)?,
        allowed_origins: row.get(8)?,
        intent: row.get(9)?,
        system_prompt_override: row.get(10)?,
        opening_message: row.get(11)?,
        send_opening_message: row.get(12)?,
        token_handle: row.get(13)?,
        created_at: row.get(14)?,
        revoked_at: row.get(15)?,
    })
}

/// Create a conversation record.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), GuestlinkError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, owner_id, created_at) VALUES (?1, ?2, ?3)",
                params![conversation.id, conversation.owner_id, conversation.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, GuestlinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, owner_id, created_at FROM conversations WHERE id = ?1")?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            });
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Persist a new link.
pub async fn insert_link(db: &Database, link: &LinkRecord) -> Result<(), GuestlinkError> {
    let link = link.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO links (id, owner_id, conversation_id, active, expires_at,
                     max_sessions, max_messages_per_session, rate_per_minute,
                     allowed_origins, intent, system_prompt_override, opening_message,
                     send_opening_message, token_handle, created_at, revoked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    link.id,
                    link.owner_id,
                    link.conversation_id,
                    link.active,
                    link.expires_at,
                    link.max_sessions,
                    link.max_messages_per_session,
                    link.rate_per_minute,
                    link.allowed_origins,
                    link.intent,
                    link.system_prompt_override,
                    link.opening_message,
                    link.send_opening_message,
                    link.token_handle,
                    link.created_at,
                    link.revoked_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a link by id.
pub async fn get_link(db: &Database, id: &str) -> Result<Option<LinkRecord>, GuestlinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_link);
            match result {
                Ok(link) => Ok(Some(link)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-revoke a link owned by `owner_id`.
///
/// Idempotent: revoking an already-revoked link succeeds. Returns `false`
/// only when no link with that id/owner pair exists.
pub async fn revoke_link(
    db: &Database,
    id: &str,
    owner_id: &str,
    now: &str,
) -> Result<bool, GuestlinkError> {
    let id = id.to_string();
    let owner_id = owner_id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM links WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Ok(false);
            }
            conn.execute(
                "UPDATE links SET active = 0, revoked_at = COALESCE(revoked_at, ?3)
                 WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id, now],
            )?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Deactivate links whose expiry has passed. Returns the number swept.
pub async fn expire_links(db: &Database, now: &str) -> Result<usize, GuestlinkError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let swept = conn.execute(
                "UPDATE links SET active = 0 WHERE active = 1 AND expires_at <= ?1",
                params![now],
            )?;
            Ok(swept)
        })
        .await
        .map_err(map_tr_err)
}
