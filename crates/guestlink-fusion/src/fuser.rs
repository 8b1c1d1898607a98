// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merges guest session traffic into the bound owner conversation.
//!
//! Guest messages land in the same timeline as owner messages, ordered by
//! the storage writer's strictly-increasing seq/timestamp allocation, and
//! stay distinguishable through their tag fields (session id, link id,
//! greeting marker, intent, participant name). Link-derived prompt
//! augmentation is request-scoped: recomputed from the link on every engine
//! call, never written to the transcript.

use guestlink_core::retry::{with_backoff, RetryPolicy};
use guestlink_core::traits::{EngineMessage, EngineRequest};
use guestlink_core::types::ConversationId;
use guestlink_core::GuestlinkError;
use guestlink_storage::{ConversationMessage, ConversationWriter, LinkRecord, NewMessage};
use tracing::debug;

/// Metadata carried by every message written through a session.
#[derive(Debug, Clone)]
pub struct MessageTags {
    pub session_id: String,
    pub link_id: String,
    /// Set on the auto-sent opening message only.
    pub guest_greeting: bool,
    /// The link's intent, snapshotted onto every message the session writes.
    pub intent: String,
    pub participant_name: Option<String>,
}

/// Link-derived fields handed to the reasoning engine per request.
#[derive(Debug, Clone, Default)]
pub struct PromptAugmentation {
    pub system_prompt_override: Option<String>,
    pub chat_intent: Option<String>,
}

impl PromptAugmentation {
    /// Recompute augmentation from the link. Empty fields are dropped so the
    /// engine never sees blank instructions.
    pub fn from_link(link: &LinkRecord) -> Self {
        let system_prompt_override = link
            .system_prompt_override
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        let chat_intent = if link.intent.trim().is_empty() {
            None
        } else {
            Some(link.intent.clone())
        };
        Self {
            system_prompt_override,
            chat_intent,
        }
    }
}

/// The fusion layer: the single path guest traffic takes into a
/// conversation timeline.
#[derive(Clone)]
pub struct ConversationFuser {
    writer: ConversationWriter,
    retry: RetryPolicy,
}

impl ConversationFuser {
    pub fn new(writer: ConversationWriter) -> Self {
        Self {
            writer,
            retry: RetryPolicy::default(),
        }
    }

    /// Append a guest-authored message, tagged with its session.
    pub async fn append_guest(
        &self,
        conversation_id: &str,
        content: &str,
        tags: &MessageTags,
    ) -> Result<ConversationMessage, GuestlinkError> {
        debug!(
            conversation_id = %conversation_id,
            session_id = %tags.session_id,
            "appending guest message"
        );
        self.writer
            .append(NewMessage {
                conversation_id: conversation_id.to_string(),
                role: "user".to_string(),
                content: content.to_string(),
                session_id: Some(tags.session_id.clone()),
                link_id: Some(tags.link_id.clone()),
                guest_greeting: false,
                intent: Some(tags.intent.clone()),
                participant_name: tags.participant_name.clone(),
            })
            .await
    }

    /// Append an assistant message produced within a session.
    ///
    /// Opening messages sent at session creation pass `guest_greeting =
    /// true`; they are attributed to the assistant, not the guest.
    pub async fn append_assistant(
        &self,
        conversation_id: &str,
        content: &str,
        tags: &MessageTags,
        guest_greeting: bool,
    ) -> Result<ConversationMessage, GuestlinkError> {
        self.writer
            .append(NewMessage {
                conversation_id: conversation_id.to_string(),
                role: "assistant".to_string(),
                content: content.to_string(),
                session_id: Some(tags.session_id.clone()),
                link_id: Some(tags.link_id.clone()),
                guest_greeting,
                intent: Some(tags.intent.clone()),
                participant_name: None,
            })
            .await
    }

    /// Read the fused transcript in timeline order.
    ///
    /// Reads are idempotent, so transient storage failures are retried with
    /// backoff; appends stay single-shot.
    pub async fn transcript(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>, GuestlinkError> {
        with_backoff(self.retry, "messages.transcript", || {
            self.writer.transcript(conversation_id)
        })
        .await
    }

    /// Build the engine request for one assistant reply: the full fused
    /// transcript plus augmentation recomputed from the link.
    pub async fn engine_request(
        &self,
        link: &LinkRecord,
        conversation_id: &str,
    ) -> Result<EngineRequest, GuestlinkError> {
        let transcript = self.transcript(conversation_id).await?;
        let augmentation = PromptAugmentation::from_link(link);
        Ok(EngineRequest {
            conversation_id: ConversationId(conversation_id.to_string()),
            messages: transcript
                .into_iter()
                .map(|m| EngineMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            system_prompt_override: augmentation.system_prompt_override,
            chat_intent: augmentation.chat_intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestlink_storage::Database;

    async fn test_fuser() -> ConversationFuser {
        let db = Database::open_in_memory().await.unwrap();
        ConversationFuser::new(ConversationWriter::new(db))
    }

    fn tags() -> MessageTags {
        MessageTags {
            session_id: "sess-1".to_string(),
            link_id: "lnk-1".to_string(),
            guest_greeting: false,
            intent: "sell the car".to_string(),
            participant_name: Some("Ada".to_string()),
        }
    }

    fn make_link(intent: &str, override_text: Option<&str>) -> LinkRecord {
        LinkRecord {
            id: "lnk-1".to_string(),
            owner_id: "owner-1".to_string(),
            conversation_id: Some("conv-1".to_string()),
            active: true,
            expires_at: "2099-01-01T00:00:00.000Z".to_string(),
            max_sessions: 1,
            max_messages_per_session: 50,
            rate_per_minute: 10,
            allowed_origins: None,
            intent: intent.to_string(),
            system_prompt_override: override_text.map(str::to_string),
            opening_message: None,
            send_opening_message: false,
            token_handle: "hdl-1".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn guest_and_owner_messages_share_one_ordered_timeline() {
        let fuser = test_fuser().await;

        // Owner writes go through the same writer, untagged.
        fuser
            .writer
            .append(NewMessage {
                conversation_id: "conv-1".to_string(),
                role: "user".to_string(),
                content: "owner first".to_string(),
                session_id: None,
                link_id: None,
                guest_greeting: false,
                intent: None,
                participant_name: None,
            })
            .await
            .unwrap();
        fuser.append_guest("conv-1", "guest second", &tags()).await.unwrap();
        fuser
            .append_assistant("conv-1", "assistant third", &tags(), false)
            .await
            .unwrap();

        let transcript = fuser.transcript("conv-1").await.unwrap();
        assert_eq!(transcript.len(), 3);
        for pair in transcript.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
        // Owner message carries no tags; guest messages do.
        assert!(transcript[0].session_id.is_none());
        assert!(transcript[0].intent.is_none());
        assert_eq!(transcript[1].session_id.as_deref(), Some("sess-1"));
        assert_eq!(transcript[1].intent.as_deref(), Some("sell the car"));
        assert_eq!(transcript[1].participant_name.as_deref(), Some("Ada"));
        assert_eq!(transcript[2].role, "assistant");
        assert_eq!(transcript[2].intent.as_deref(), Some("sell the car"));
    }

    #[tokio::test]
    async fn greeting_is_assistant_attributed_and_marked() {
        let fuser = test_fuser().await;
        let msg = fuser
            .append_assistant("conv-1", "Hi!", &tags(), true)
            .await
            .unwrap();
        assert_eq!(msg.role, "assistant");
        assert!(msg.guest_greeting);
        assert_eq!(msg.session_id.as_deref(), Some("sess-1"));
    }

    #[tokio::test]
    async fn augmentation_is_derived_but_never_persisted() {
        let fuser = test_fuser().await;
        fuser.append_guest("conv-1", "hello", &tags()).await.unwrap();

        let link = make_link("sell the car", Some("Answer as a negotiator."));
        let request = fuser.engine_request(&link, "conv-1").await.unwrap();

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.chat_intent.as_deref(), Some("sell the car"));
        assert_eq!(
            request.system_prompt_override.as_deref(),
            Some("Answer as a negotiator.")
        );
        // The transcript itself contains no augmentation text.
        let transcript = fuser.transcript("conv-1").await.unwrap();
        assert!(transcript.iter().all(|m| !m.content.contains("negotiator")));
    }

    #[test]
    fn blank_augmentation_fields_are_dropped() {
        let augmentation = PromptAugmentation::from_link(&make_link("  ", Some("   ")));
        assert!(augmentation.chat_intent.is_none());
        assert!(augmentation.system_prompt_override.is_none());
    }
}
