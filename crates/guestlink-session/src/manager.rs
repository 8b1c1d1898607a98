// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session state machine.
//!
//! A session moves `Active -> {Expired | Ended}`; capacity rejection is
//! terminal without ever entering `Active` and is not persisted. Creation
//! binds the session's conversation to the link's target conversation
//! (context fusion); links created without a target get a fresh standalone
//! conversation instead, as an explicit branch rather than a silent default.

use std::sync::Arc;

use chrono::{Duration, Utc};
use guestlink_config::model::SessionsConfig;
use guestlink_core::retry::{with_backoff, RetryPolicy};
use guestlink_core::types::{GuestSessionId, SessionStatus};
use guestlink_core::GuestlinkError;
use guestlink_fusion::{ConversationFuser, MessageTags};
use guestlink_guard::AbuseGuard;
use guestlink_registry::LinkRegistry;
use guestlink_storage::models::now_rfc3339;
use guestlink_storage::queries::sessions;
use guestlink_storage::{ConversationMessage, Database, GuestSessionRecord, LinkRecord};
use guestlink_vault::{TokenSubject, TokenVault};
use secrecy::SecretString;
use tracing::{debug, info};
use uuid::Uuid;

/// Advisory participant metadata captured at redemption. Never used for
/// authorization.
#[derive(Debug, Clone, Default)]
pub struct ParticipantMeta {
    pub name: Option<String>,
    pub origin_addr: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// Origin header of the redeeming page, checked against the link's
    /// origin allow-list.
    pub origin: Option<String>,
}

/// What a successful redemption returns to the caller.
#[derive(Debug)]
pub struct CreatedSession {
    pub session_id: GuestSessionId,
    /// The raw session token. Shown once.
    pub token: SecretString,
    pub conversation_id: String,
    /// The opening message text, when one was auto-sent, so the caller can
    /// render it without a second round trip.
    pub opening_message: Option<String>,
}

/// One accepted guest message together with its session and link context.
#[derive(Debug)]
pub struct AcceptedMessage {
    pub message: ConversationMessage,
    pub session: GuestSessionRecord,
    pub link: LinkRecord,
}

/// One guest message as received on the wire: the text, the peer address of
/// the request carrying it, and the declared content types of any
/// attachments.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub content: String,
    /// The address of the request delivering this message, not the address
    /// captured at redemption. Rate ceilings charge the live sender.
    pub origin_addr: String,
    pub attachment_types: Vec<String>,
}

/// Orchestrates session redemption, validation, and message admission.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    vault: Arc<TokenVault>,
    registry: LinkRegistry,
    guard: Arc<AbuseGuard>,
    fuser: ConversationFuser,
    config: SessionsConfig,
    retry: RetryPolicy,
}

impl SessionManager {
    pub fn new(
        db: Database,
        vault: Arc<TokenVault>,
        registry: LinkRegistry,
        guard: Arc<AbuseGuard>,
        fuser: ConversationFuser,
        config: SessionsConfig,
    ) -> Self {
        Self {
            db,
            vault,
            registry,
            guard,
            fuser,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Redeem a link token into a new active session.
    ///
    /// Failure detail is deliberately flattened: everything about the token
    /// and the link's state surfaces as `InvalidLink`, capacity as
    /// `CapacityExceeded`, throttling as `RateLimited`.
    pub async fn create_session(
        &self,
        raw_link_token: &str,
        meta: ParticipantMeta,
    ) -> Result<CreatedSession, GuestlinkError> {
        let now = Utc::now();
        self.guard.admit_redeem(&meta.origin_addr, now)?;

        let link = self.registry.get_link_by_token(raw_link_token).await?;
        if !self.guard.origin_allowed(&link, meta.origin.as_deref()) {
            debug!(link_id = %link.id, "redemption origin not on the link's allow-list");
            return Err(GuestlinkError::InvalidLink);
        }

        // Context fusion: bind to the link's target conversation. Legacy
        // links without one get a standalone conversation instead.
        let conversation_id = match &link.conversation_id {
            Some(id) => id.clone(),
            None => {
                let id = self
                    .registry
                    .register_conversation(&guestlink_core::types::OwnerId(
                        link.owner_id.clone(),
                    ))
                    .await?;
                debug!(link_id = %link.id, conversation_id = %id,
                    "link has no target conversation; synthesized a standalone one");
                id
            }
        };

        let session_id = format!("sess-{}", Uuid::new_v4());
        let minted = self
            .vault
            .mint(&TokenSubject::Session(GuestSessionId(session_id.clone())))
            .await?;

        let created_at = now_rfc3339(now);
        let session = GuestSessionRecord {
            id: session_id.clone(),
            link_id: link.id.clone(),
            conversation_id: conversation_id.clone(),
            token_handle: minted.handle.clone(),
            participant_name: meta.name.clone(),
            origin_addr: meta.origin_addr.clone(),
            user_agent: meta.user_agent.clone(),
            referrer: meta.referrer.clone(),
            status: SessionStatus::Active.to_string(),
            message_count: 0,
            created_at: created_at.clone(),
            last_activity_at: created_at,
            ended_at: None,
        };

        let inserted =
            sessions::insert_session_if_capacity(&self.db, &session, link.max_sessions).await?;
        if !inserted {
            // The minted token must not stay redeemable for a session that
            // was never created.
            self.vault.revoke(&minted.handle).await?;
            info!(link_id = %link.id, "session refused: capacity reached");
            return Err(GuestlinkError::CapacityExceeded);
        }

        let opening_message = self.send_opening_message(&link, &session).await?;

        info!(
            session_id = %session.id,
            link_id = %link.id,
            conversation_id = %conversation_id,
            "guest session created"
        );
        Ok(CreatedSession {
            session_id: GuestSessionId(session_id),
            token: minted.token,
            conversation_id,
            opening_message,
        })
    }

    async fn send_opening_message(
        &self,
        link: &LinkRecord,
        session: &GuestSessionRecord,
    ) -> Result<Option<String>, GuestlinkError> {
        if !link.send_opening_message {
            return Ok(None);
        }
        let Some(text) = link.opening_message.as_deref().filter(|t| !t.trim().is_empty())
        else {
            return Ok(None);
        };
        let tags = MessageTags {
            session_id: session.id.clone(),
            link_id: link.id.clone(),
            guest_greeting: true,
            intent: link.intent.clone(),
            participant_name: None,
        };
        self.fuser
            .append_assistant(&session.conversation_id, text, &tags, true)
            .await?;
        Ok(Some(text.to_string()))
    }

    /// Resolve and check a session token, lazily ending timed-out sessions.
    ///
    /// Returns the session with its link. Every failure mode is
    /// `InvalidLink` so a caller cannot enumerate session state.
    pub async fn validate_session(
        &self,
        raw_session_token: &str,
    ) -> Result<(GuestSessionRecord, LinkRecord), GuestlinkError> {
        let subject = with_backoff(self.retry, "vault.resolve", || {
            self.vault.resolve(raw_session_token)
        })
        .await?;
        let Some(TokenSubject::Session(session_id)) = subject else {
            return Err(GuestlinkError::InvalidLink);
        };

        let session = with_backoff(self.retry, "sessions.get_session", || {
            sessions::get_session(&self.db, &session_id.0)
        })
        .await?;
        let Some(session) = session else {
            return Err(GuestlinkError::InvalidLink);
        };
        if session.status != SessionStatus::Active.to_string() {
            return Err(GuestlinkError::InvalidLink);
        }

        let now = Utc::now();
        let Some(link) = self.registry.get_link(&session.link_id).await? else {
            return Err(GuestlinkError::InvalidLink);
        };
        if !link.is_redeemable(now) {
            // The link died under the session; the session dies with it.
            sessions::set_session_status(
                &self.db,
                &session.id,
                &SessionStatus::Expired.to_string(),
                Some(&now_rfc3339(now)),
            )
            .await?;
            debug!(session_id = %session.id, "session expired with its link");
            return Err(GuestlinkError::InvalidLink);
        }

        if self.timed_out(&session, now) {
            sessions::set_session_status(
                &self.db,
                &session.id,
                &SessionStatus::Ended.to_string(),
                Some(&now_rfc3339(now)),
            )
            .await?;
            debug!(session_id = %session.id, "session ended by inactivity timeout");
            return Err(GuestlinkError::InvalidLink);
        }

        Ok((session, link))
    }

    fn timed_out(&self, session: &GuestSessionRecord, now: chrono::DateTime<Utc>) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&session.last_activity_at) {
            Ok(last) => {
                let deadline = last.with_timezone(&Utc)
                    + Duration::minutes(i64::from(self.config.timeout_minutes));
                now >= deadline
            }
            // An unreadable activity timestamp is treated as timed out.
            Err(_) => true,
        }
    }

    /// Admit one guest message into the bound conversation.
    ///
    /// The per-session message cap is checked first; a message refused by a
    /// rate counter does not consume cap quota. Rate ceilings charge the
    /// request's own origin address, which may differ from the address the
    /// session was redeemed from.
    pub async fn append_guest_message(
        &self,
        raw_session_token: &str,
        incoming: IncomingMessage,
    ) -> Result<AcceptedMessage, GuestlinkError> {
        let (session, link) = self.validate_session(raw_session_token).await?;

        if session.message_count >= link.max_messages_per_session {
            return Err(GuestlinkError::LimitExceeded);
        }

        for media_type in &incoming.attachment_types {
            self.guard.admit_attachment_type(media_type)?;
        }

        let now = Utc::now();
        self.guard
            .admit_message(&incoming.origin_addr, &link, &incoming.content, now)?;

        let tags = MessageTags {
            session_id: session.id.clone(),
            link_id: link.id.clone(),
            guest_greeting: false,
            intent: link.intent.clone(),
            participant_name: session.participant_name.clone(),
        };
        let message = self
            .fuser
            .append_guest(&session.conversation_id, &incoming.content, &tags)
            .await?;
        sessions::record_session_message(&self.db, &session.id, &now_rfc3339(now)).await?;

        Ok(AcceptedMessage {
            message,
            session,
            link,
        })
    }

    /// Explicitly terminate a session. Idempotent on already-ended sessions.
    pub async fn end_session(&self, raw_session_token: &str) -> Result<(), GuestlinkError> {
        let subject = self.vault.resolve(raw_session_token).await?;
        let Some(TokenSubject::Session(session_id)) = subject else {
            return Err(GuestlinkError::InvalidLink);
        };
        let Some(session) = sessions::get_session(&self.db, &session_id.0).await? else {
            return Err(GuestlinkError::InvalidLink);
        };
        sessions::set_session_status(
            &self.db,
            &session.id,
            &SessionStatus::Ended.to_string(),
            Some(&now_rfc3339(Utc::now())),
        )
        .await?;
        self.vault.revoke(&session.token_handle).await?;
        info!(session_id = %session.id, "session ended by explicit termination");
        Ok(())
    }

    /// The fusion layer, shared with callers that need transcript access.
    pub fn fuser(&self) -> &ConversationFuser {
        &self.fuser
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestlink_config::model::{GuardConfig, LinksConfig, VaultConfig};
    use guestlink_core::types::OwnerId;
    use guestlink_registry::{BehavioralPayload, LinkPolicy};
    use guestlink_storage::ConversationWriter;
    use secrecy::ExposeSecret;

    struct Stack {
        manager: SessionManager,
        registry: LinkRegistry,
        db: Database,
    }

    async fn test_stack() -> Stack {
        test_stack_with(SessionsConfig::default()).await
    }

    async fn test_stack_with(config: SessionsConfig) -> Stack {
        test_stack_parts(config, GuardConfig::default()).await
    }

    async fn test_stack_with_guard(guard: GuardConfig) -> Stack {
        test_stack_parts(SessionsConfig::default(), guard).await
    }

    async fn test_stack_parts(config: SessionsConfig, guard_config: GuardConfig) -> Stack {
        let db = Database::open_in_memory().await.unwrap();
        let vault = Arc::new(
            TokenVault::open(db.connection().clone(), &VaultConfig { master_key: None })
                .await
                .unwrap(),
        );
        let registry = LinkRegistry::new(db.clone(), vault.clone(), LinksConfig::default());
        let guard = Arc::new(AbuseGuard::new(guard_config));
        let fuser = ConversationFuser::new(ConversationWriter::new(db.clone()));
        let manager = SessionManager::new(
            db.clone(),
            vault,
            registry.clone(),
            guard,
            fuser,
            config,
        );
        Stack {
            manager,
            registry,
            db,
        }
    }

    fn owner() -> OwnerId {
        OwnerId("owner-1".to_string())
    }

    fn meta() -> ParticipantMeta {
        ParticipantMeta {
            name: Some("Ada".to_string()),
            origin_addr: "203.0.113.7".to_string(),
            ..ParticipantMeta::default()
        }
    }

    fn incoming(content: &str) -> IncomingMessage {
        IncomingMessage {
            content: content.to_string(),
            origin_addr: "203.0.113.7".to_string(),
            ..IncomingMessage::default()
        }
    }

    async fn create_link(
        stack: &Stack,
        policy: LinkPolicy,
        payload: BehavioralPayload,
    ) -> (String, SecretString) {
        let conversation = stack.registry.register_conversation(&owner()).await.unwrap();
        let created = stack
            .registry
            .create_link(&owner(), Some(&conversation), policy, payload)
            .await
            .unwrap();
        (conversation, created.token)
    }

    #[tokio::test]
    async fn redemption_binds_to_the_target_conversation() {
        let stack = test_stack().await;
        let (conversation, token) =
            create_link(&stack, LinkPolicy::default(), BehavioralPayload::default()).await;

        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();
        assert_eq!(session.conversation_id, conversation);
        assert!(session.opening_message.is_none());
    }

    #[tokio::test]
    async fn greeting_scenario_end_to_end() {
        // maxSessions=1 + auto greeting: first redemption yields a
        // conversation already holding exactly one greeting message; the
        // second redemption is refused for capacity.
        let stack = test_stack().await;
        let (conversation, token) = create_link(
            &stack,
            LinkPolicy {
                max_sessions: 1,
                expires_in_hours: Some(1),
                ..LinkPolicy::default()
            },
            BehavioralPayload {
                opening_message: Some("Hi!".to_string()),
                send_opening_message: true,
                ..BehavioralPayload::default()
            },
        )
        .await;

        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();
        assert_eq!(session.opening_message.as_deref(), Some("Hi!"));

        let transcript = stack.manager.fuser().transcript(&conversation).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "Hi!");
        assert_eq!(transcript[0].role, "assistant");
        assert!(transcript[0].guest_greeting);

        let err = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::CapacityExceeded));
    }

    #[tokio::test]
    async fn capacity_rejection_leaves_no_session_row() {
        let stack = test_stack().await;
        let (_, token) = create_link(
            &stack,
            LinkPolicy {
                max_sessions: 1,
                ..LinkPolicy::default()
            },
            BehavioralPayload::default(),
        )
        .await;

        stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();
        let _ = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap_err();

        let rows: i64 = stack
            .db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM guest_sessions", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn legacy_link_synthesizes_a_standalone_conversation() {
        let stack = test_stack().await;
        let created = stack
            .registry
            .create_link(&owner(), None, LinkPolicy::default(), BehavioralPayload::default())
            .await
            .unwrap();

        let session = stack
            .manager
            .create_session(created.token.expose_secret(), meta())
            .await
            .unwrap();
        // A fresh conversation exists and accepts messages.
        assert!(session.conversation_id.starts_with("conv-"));
        let accepted = stack
            .manager
            .append_guest_message(session.token.expose_secret(), incoming("hello"))
            .await
            .unwrap();
        assert_eq!(accepted.message.conversation_id, session.conversation_id);
    }

    #[tokio::test]
    async fn messages_flow_into_the_fused_timeline() {
        let stack = test_stack().await;
        let (conversation, token) =
            create_link(&stack, LinkPolicy::default(), BehavioralPayload::default()).await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();

        stack
            .manager
            .append_guest_message(session.token.expose_secret(), incoming("first"))
            .await
            .unwrap();
        stack
            .manager
            .append_guest_message(session.token.expose_secret(), incoming("second"))
            .await
            .unwrap();

        let transcript = stack.manager.fuser().transcript(&conversation).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(transcript[0].created_at < transcript[1].created_at);
        assert_eq!(
            transcript[0].session_id.as_deref(),
            Some(session.session_id.0.as_str())
        );
        assert_eq!(transcript[0].participant_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn message_cap_is_enforced() {
        let stack = test_stack().await;
        let (_, token) = create_link(
            &stack,
            LinkPolicy {
                max_messages_per_session: 2,
                rate_per_minute: 100,
                ..LinkPolicy::default()
            },
            BehavioralPayload::default(),
        )
        .await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();
        let session_token = session.token.expose_secret().to_string();

        stack
            .manager
            .append_guest_message(&session_token, incoming("one"))
            .await
            .unwrap();
        stack
            .manager
            .append_guest_message(&session_token, incoming("two"))
            .await
            .unwrap();
        let err = stack
            .manager
            .append_guest_message(&session_token, incoming("three"))
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::LimitExceeded));
    }

    #[tokio::test]
    async fn disallowed_attachment_type_is_refused_without_side_effects() {
        let stack = test_stack().await;
        let (conversation, token) =
            create_link(&stack, LinkPolicy::default(), BehavioralPayload::default()).await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();

        let mut message = incoming("see attached");
        message.attachment_types = vec!["application/x-msdownload".to_string()];
        let err = stack
            .manager
            .append_guest_message(session.token.expose_secret(), message)
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::Validation(_)));

        // Nothing was persisted and the cap quota is untouched.
        let transcript = stack.manager.fuser().transcript(&conversation).await.unwrap();
        assert!(transcript.is_empty());
        let count: u32 = stack
            .db
            .connection()
            .call(|conn| -> Result<u32, rusqlite::Error> {
                conn.query_row(
                    "SELECT message_count FROM guest_sessions",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Allow-listed types pass.
        let mut message = incoming("photo attached");
        message.attachment_types = vec!["image/png".to_string()];
        stack
            .manager
            .append_guest_message(session.token.expose_secret(), message)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rate_ceiling_charges_the_live_request_origin() {
        let stack = test_stack_with_guard(GuardConfig {
            origin_rate_per_minute: 2,
            ..GuardConfig::default()
        })
        .await;
        let (_, token) = create_link(
            &stack,
            LinkPolicy {
                rate_per_minute: 100,
                ..LinkPolicy::default()
            },
            BehavioralPayload::default(),
        )
        .await;

        // Redemption from one address charges that address once.
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();

        // Messages arriving from a different address charge that address,
        // not the one captured at redemption.
        let from_elsewhere = |content: &str| IncomingMessage {
            content: content.to_string(),
            origin_addr: "198.51.100.4".to_string(),
            ..IncomingMessage::default()
        };
        stack
            .manager
            .append_guest_message(session.token.expose_secret(), from_elsewhere("one"))
            .await
            .unwrap();
        stack
            .manager
            .append_guest_message(session.token.expose_secret(), from_elsewhere("two"))
            .await
            .unwrap();
        let err = stack
            .manager
            .append_guest_message(session.token.expose_secret(), from_elsewhere("three"))
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::RateLimited));

        // The redemption address still has one slot of its own left.
        stack
            .manager
            .append_guest_message(session.token.expose_secret(), incoming("from home"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rate_rejections_do_not_consume_cap_quota() {
        let stack = test_stack().await;
        let (_, token) = create_link(
            &stack,
            LinkPolicy {
                max_messages_per_session: 10,
                rate_per_minute: 1,
                ..LinkPolicy::default()
            },
            BehavioralPayload::default(),
        )
        .await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();
        let session_token = session.token.expose_secret().to_string();

        stack
            .manager
            .append_guest_message(&session_token, incoming("one"))
            .await
            .unwrap();
        let err = stack
            .manager
            .append_guest_message(&session_token, incoming("two"))
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::RateLimited));

        // The rejected message did not bump the session counter.
        let count: u32 = stack
            .db
            .connection()
            .call(|conn| -> Result<u32, rusqlite::Error> {
                conn.query_row(
                    "SELECT message_count FROM guest_sessions",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn inactivity_timeout_lazily_ends_the_session() {
        let stack = test_stack_with(SessionsConfig {
            timeout_minutes: 30,
            ..SessionsConfig::default()
        })
        .await;
        let (_, token) =
            create_link(&stack, LinkPolicy::default(), BehavioralPayload::default()).await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();

        // Backdate the last activity past the timeout.
        let stale = now_rfc3339(Utc::now() - Duration::minutes(31));
        let session_id = session.session_id.0.clone();
        stack
            .db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE guest_sessions SET last_activity_at = ?2 WHERE id = ?1",
                    rusqlite::params![session_id, stale],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = stack
            .manager
            .validate_session(session.token.expose_secret())
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::InvalidLink));

        let status: String = stack
            .db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("SELECT status FROM guest_sessions", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(status, "ended");
    }

    #[tokio::test]
    async fn expiry_boundary_is_enforced_on_every_operation() {
        let stack = test_stack().await;
        let (_, token) =
            create_link(&stack, LinkPolicy::default(), BehavioralPayload::default()).await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();

        // Push the link's expiry one second into the past.
        let expired = now_rfc3339(Utc::now() - Duration::seconds(1));
        stack
            .db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE links SET expires_at = ?1",
                    rusqlite::params![expired],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        // No new session, no new message.
        assert!(matches!(
            stack
                .manager
                .create_session(token.expose_secret(), meta())
                .await
                .unwrap_err(),
            GuestlinkError::InvalidLink
        ));
        assert!(matches!(
            stack
                .manager
                .append_guest_message(session.token.expose_secret(), incoming("late"))
                .await
                .unwrap_err(),
            GuestlinkError::InvalidLink
        ));
    }

    #[tokio::test]
    async fn origin_allow_list_gates_redemption() {
        let stack = test_stack().await;
        let (_, token) = create_link(
            &stack,
            LinkPolicy {
                allowed_origins: Some(vec!["https://example.com".to_string()]),
                ..LinkPolicy::default()
            },
            BehavioralPayload::default(),
        )
        .await;

        let mut bad = meta();
        bad.origin = Some("https://evil.example.net".to_string());
        assert!(matches!(
            stack
                .manager
                .create_session(token.expose_secret(), bad)
                .await
                .unwrap_err(),
            GuestlinkError::InvalidLink
        ));

        let mut good = meta();
        good.origin = Some("https://example.com".to_string());
        stack
            .manager
            .create_session(token.expose_secret(), good)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ended_session_token_stops_working() {
        let stack = test_stack().await;
        let (_, token) =
            create_link(&stack, LinkPolicy::default(), BehavioralPayload::default()).await;
        let session = stack
            .manager
            .create_session(token.expose_secret(), meta())
            .await
            .unwrap();

        stack
            .manager
            .end_session(session.token.expose_secret())
            .await
            .unwrap();
        assert!(stack
            .manager
            .append_guest_message(session.token.expose_secret(), incoming("after end"))
            .await
            .is_err());
    }
}
