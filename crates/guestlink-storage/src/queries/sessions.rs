// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guest session CRUD and capacity-checked creation.

use guestlink_core::GuestlinkError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::GuestSessionRecord;

const SESSION_COLUMNS: &str = "id, link_id, conversation_id, token_handle, participant_name,
     origin_addr, user_agent, referrer, status, message_count, created_at,
     last_activity_at, ended_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<GuestSessionRecord, rusqlite::Error> {
    Ok(GuestSessionRecord {
        id: row.get(0)?,
        link_id: row.get(1)?,
        conversation_id: row.get(2)?,
        token_handle: row.get(3)?,
        participant_name: row.get(4)?,
        origin_addr: row.get(5)?,
        user_agent: row.get(6)?,
        referrer: row.get(7)?,
        status: row.get(8)?,
        message_count: row.get(9)?,
        created_at: row.get(10)?,
        last_activity_at: row.get(11)?,
        ended_at: row.get(12)?,
    })
}

/// Insert a session only if the link still has capacity.
///
/// The count and insert run in one transaction on the single writer thread,
/// so the link's `max_sessions` cap cannot be raced past: for a link with
/// cap N, the (N+1)-th concurrent attempt always observes N active rows.
///
/// Returns `true` if the session was inserted, `false` if capacity was
/// already reached.
pub async fn insert_session_if_capacity(
    db: &Database,
    session: &GuestSessionRecord,
    max_sessions: u32,
) -> Result<bool, GuestlinkError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let active: i64 = tx.query_row(
                "SELECT COUNT(*) FROM guest_sessions WHERE link_id = ?1 AND status = 'active'",
                params![session.link_id],
                |row| row.get(0),
            )?;
            if active >= i64::from(max_sessions) {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO guest_sessions (id, link_id, conversation_id, token_handle,
                     participant_name, origin_addr, user_agent, referrer, status,
                     message_count, created_at, last_activity_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    session.id,
                    session.link_id,
                    session.conversation_id,
                    session.token_handle,
                    session.participant_name,
                    session.origin_addr,
                    session.user_agent,
                    session.referrer,
                    session.status,
                    session.message_count,
                    session.created_at,
                    session.last_activity_at,
                    session.ended_at,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by id.
pub async fn get_session(
    db: &Database,
    id: &str,
) -> Result<Option<GuestSessionRecord>, GuestlinkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM guest_sessions WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_session);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Set a session's status, recording `ended_at` for terminal transitions.
pub async fn set_session_status(
    db: &Database,
    id: &str,
    status: &str,
    ended_at: Option<&str>,
) -> Result<(), GuestlinkError> {
    let id = id.to_string();
    let status = status.to_string();
    let ended_at = ended_at.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE guest_sessions SET status = ?2, ended_at = COALESCE(?3, ended_at)
                 WHERE id = ?1",
                params![id, status, ended_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record one accepted guest message: bump the counter and last activity.
pub async fn record_session_message(
    db: &Database,
    id: &str,
    now: &str,
) -> Result<(), GuestlinkError> {
    let id = id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE guest_sessions
                 SET message_count = message_count + 1, last_activity_at = ?2
                 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// End active sessions whose last activity is at or before `cutoff`.
/// Returns the number of sessions ended.
pub async fn end_idle_sessions(
    db: &Database,
    cutoff: &str,
    now: &str,
) -> Result<usize, GuestlinkError> {
    let cutoff = cutoff.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let ended = conn.execute(
                "UPDATE guest_sessions SET status = 'ended', ended_at = ?2
                 WHERE status = 'active' AND last_activity_at <= ?1",
                params![cutoff, now],
            )?;
            Ok(ended)
        })
        .await
        .map_err(map_tr_err)
}

/// Expire active sessions whose owning link has passed its expiry.
/// Returns the number of sessions expired.
pub async fn expire_sessions_for_expired_links(
    db: &Database,
    now: &str,
) -> Result<usize, GuestlinkError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let expired = conn.execute(
                "UPDATE guest_sessions SET status = 'expired', ended_at = ?1
                 WHERE status = 'active'
                   AND link_id IN (SELECT id FROM links WHERE expires_at <= ?1)",
                params![now],
            )?;
            Ok(expired)
        })
        .await
        .map_err(map_tr_err)
}
