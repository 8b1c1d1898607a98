// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the Guestlink schema.
//!
//! Timestamps are RFC 3339 strings with millisecond precision (see
//! [`now_rfc3339`]) so they sort lexicographically in SQL.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Format a timestamp the way every table stores it.
pub fn now_rfc3339(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A pre-existing owner conversation that links can bind guests into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub created_at: String,
}

/// A standing guest-chat invitation.
///
/// `token_handle` is an opaque vault reference; the raw redeemable token is
/// returned exactly once at creation and never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: String,
    pub owner_id: String,
    /// `None` for legacy links without a bound target conversation.
    pub conversation_id: Option<String>,
    pub active: bool,
    pub expires_at: String,
    pub max_sessions: u32,
    pub max_messages_per_session: u32,
    pub rate_per_minute: u32,
    /// JSON array of allowed origin domains, `None` = unrestricted.
    pub allowed_origins: Option<String>,
    pub intent: String,
    pub system_prompt_override: Option<String>,
    pub opening_message: Option<String>,
    pub send_opening_message: bool,
    pub token_handle: String,
    pub created_at: String,
    pub revoked_at: Option<String>,
}

impl LinkRecord {
    /// Whether the link has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expiry) => now >= expiry.with_timezone(&Utc),
            // Unparseable expiry is treated as expired, never as open-ended.
            Err(_) => true,
        }
    }

    /// Whether the link can currently mint sessions.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }
}

/// One redemption of a link: an anonymous participant's bound chat context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSessionRecord {
    pub id: String,
    pub link_id: String,
    /// Immutable after creation; copied from the link (or synthesized for
    /// legacy links).
    pub conversation_id: String,
    pub token_handle: String,
    pub participant_name: Option<String>,
    pub origin_addr: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// `active`, `expired`, `ended`, or `capacity_rejected`.
    pub status: String,
    pub message_count: u32,
    pub created_at: String,
    pub last_activity_at: String,
    pub ended_at: Option<String>,
}

/// One entry in a conversation timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    /// Strictly increasing within the conversation.
    pub seq: i64,
    pub role: String,
    pub content: String,
    /// `None` for owner-side messages.
    pub session_id: Option<String>,
    pub link_id: Option<String>,
    pub guest_greeting: bool,
    /// The link's intent at the time the message was written. `None` for
    /// owner-side messages.
    pub intent: Option<String>,
    pub participant_name: Option<String>,
    pub created_at: String,
}

/// Input for appending a message; seq and timestamps are allocated by the
/// append transaction.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub session_id: Option<String>,
    pub link_id: Option<String>,
    pub guest_greeting: bool,
    pub intent: Option<String>,
    pub participant_name: Option<String>,
}

/// Ordered condition -> action mapping for inbound events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRuleRecord {
    pub id: String,
    /// Lower evaluates first.
    pub priority: i64,
    /// Event field the predicate inspects.
    pub field: String,
    /// `equals`, `contains`, or `regex`.
    pub predicate: String,
    pub pattern: String,
    /// JSON array of actions.
    pub actions: String,
    /// Halts evaluation when this rule matches.
    pub stop_processing: bool,
    pub enabled: bool,
    pub match_count: i64,
    pub last_matched_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link_expiring_at(expires_at: &str) -> LinkRecord {
        LinkRecord {
            id: "lnk-1".into(),
            owner_id: "owner-1".into(),
            conversation_id: Some("conv-1".into()),
            active: true,
            expires_at: expires_at.into(),
            max_sessions: 1,
            max_messages_per_session: 50,
            rate_per_minute: 10,
            allowed_origins: None,
            intent: String::new(),
            system_prompt_override: None,
            opening_message: None,
            send_opening_message: false,
            token_handle: "hdl-1".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            revoked_at: None,
        }
    }

    #[test]
    fn link_expiry_boundary() {
        let now = Utc::now();
        let future = now_rfc3339(now + Duration::seconds(1));
        let past = now_rfc3339(now - Duration::seconds(1));

        assert!(!link_expiring_at(&future).is_expired(now));
        assert!(link_expiring_at(&past).is_expired(now));
    }

    #[test]
    fn unparseable_expiry_counts_as_expired() {
        assert!(link_expiring_at("not-a-timestamp").is_expired(Utc::now()));
    }

    #[test]
    fn revoked_link_is_not_redeemable() {
        let now = Utc::now();
        let mut link = link_expiring_at(&now_rfc3339(now + Duration::hours(1)));
        assert!(link.is_redeemable(now));
        link.active = false;
        assert!(!link.is_redeemable(now));
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let now = Utc::now();
        let a = now_rfc3339(now);
        let b = now_rfc3339(now + Duration::milliseconds(1));
        assert!(a < b);
    }
}
