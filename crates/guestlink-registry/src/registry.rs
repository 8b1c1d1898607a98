// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The link registry: the owner-facing lifecycle of guest-chat links and
//! the single public-facing token resolution path.
//!
//! Token resolution is deliberately enumeration-proof: a malformed token, an
//! unknown token, a revoked link, and an expired link all surface as the
//! same [`GuestlinkError::InvalidLink`]. The distinguishing detail is logged
//! server-side only.

use std::sync::Arc;

use chrono::Utc;
use guestlink_config::model::LinksConfig;
use guestlink_core::retry::{with_backoff, RetryPolicy};
use guestlink_core::types::{LinkId, OwnerId};
use guestlink_core::GuestlinkError;
use guestlink_storage::models::now_rfc3339;
use guestlink_storage::queries::links;
use guestlink_storage::{Database, LinkRecord};
use guestlink_vault::{TokenSubject, TokenVault};
use secrecy::SecretString;
use tracing::{debug, info};
use uuid::Uuid;

use crate::policy::{BehavioralPayload, LinkPolicy};

/// A newly created link together with its one-time redeemable token.
#[derive(Debug)]
pub struct CreatedLink {
    pub link: LinkRecord,
    /// The raw redeemable token. Shown once; not recoverable afterwards.
    pub token: SecretString,
}

/// Owner-facing registry over links and their vault-backed tokens.
#[derive(Clone)]
pub struct LinkRegistry {
    db: Database,
    vault: Arc<TokenVault>,
    config: LinksConfig,
    retry: RetryPolicy,
}

impl LinkRegistry {
    pub fn new(db: Database, vault: Arc<TokenVault>, config: LinksConfig) -> Self {
        Self {
            db,
            vault,
            config,
            retry: RetryPolicy::default(),
        }
    }

    /// Create a link for `owner`, optionally bound to one of their existing
    /// conversations.
    ///
    /// When a target conversation is named it must belong to `owner`;
    /// anything else is a validation failure. Links without a target are
    /// allowed and get a standalone conversation at redemption time.
    pub async fn create_link(
        &self,
        owner: &OwnerId,
        target_conversation: Option<&str>,
        policy: LinkPolicy,
        payload: BehavioralPayload,
    ) -> Result<CreatedLink, GuestlinkError> {
        policy.validate()?;
        payload.validate()?;

        if let Some(conversation_id) = target_conversation {
            let conversation = links::get_conversation(&self.db, conversation_id).await?;
            let owned = conversation.is_some_and(|c| c.owner_id == owner.0);
            if !owned {
                return Err(GuestlinkError::Validation(
                    "target conversation does not exist or is not owned by the caller"
                        .to_string(),
                ));
            }
        }

        let now = Utc::now();
        let link_id = format!("lnk-{}", Uuid::new_v4());
        let minted = self
            .vault
            .mint(&TokenSubject::Link(LinkId(link_id.clone())))
            .await?;

        let allowed_origins = match &policy.allowed_origins {
            Some(origins) => Some(serde_json::to_string(origins).map_err(|e| {
                GuestlinkError::Internal(format!("failed to encode allowed_origins: {e}"))
            })?),
            None => None,
        };

        let link = LinkRecord {
            id: link_id,
            owner_id: owner.0.clone(),
            conversation_id: target_conversation.map(str::to_string),
            active: true,
            expires_at: now_rfc3339(policy.resolve_expiry(&self.config, now)),
            max_sessions: policy.max_sessions,
            max_messages_per_session: policy.max_messages_per_session,
            rate_per_minute: policy.rate_per_minute,
            allowed_origins,
            intent: payload.intent,
            system_prompt_override: payload.system_prompt_override,
            opening_message: payload.opening_message,
            send_opening_message: payload.send_opening_message,
            token_handle: minted.handle,
            created_at: now_rfc3339(now),
            revoked_at: None,
        };
        links::insert_link(&self.db, &link).await?;

        info!(link_id = %link.id, owner = %owner, expires_at = %link.expires_at, "link created");
        Ok(CreatedLink {
            link,
            token: minted.token,
        })
    }

    /// Revoke a link: flip it inactive and drop its vault token.
    ///
    /// Idempotent for the owning caller. Fails only when no link with this
    /// id belongs to `owner`.
    pub async fn revoke_link(&self, owner: &OwnerId, link_id: &str) -> Result<(), GuestlinkError> {
        let now = now_rfc3339(Utc::now());
        let revoked = links::revoke_link(&self.db, link_id, &owner.0, &now).await?;
        if !revoked {
            return Err(GuestlinkError::Validation(
                "link not found".to_string(),
            ));
        }
        if let Some(link) = links::get_link(&self.db, link_id).await? {
            self.vault.revoke(&link.token_handle).await?;
        }
        info!(link_id = %link_id, owner = %owner, "link revoked");
        Ok(())
    }

    /// Resolve a raw redeemable token to its link.
    ///
    /// The sole public-facing lookup path. Every failure mode collapses to
    /// [`GuestlinkError::InvalidLink`]. Both lookups are idempotent reads,
    /// so transient vault/storage failures are retried with backoff.
    pub async fn get_link_by_token(&self, raw_token: &str) -> Result<LinkRecord, GuestlinkError> {
        let subject =
            with_backoff(self.retry, "vault.resolve", || self.vault.resolve(raw_token)).await?;
        let Some(TokenSubject::Link(link_id)) = subject else {
            debug!("token resolution failed: unknown or non-link token");
            return Err(GuestlinkError::InvalidLink);
        };

        let Some(link) = self.get_link(&link_id.0).await? else {
            debug!(link_id = %link_id, "token resolved to a missing link record");
            return Err(GuestlinkError::InvalidLink);
        };

        if !link.is_redeemable(Utc::now()) {
            debug!(link_id = %link.id, "token resolved to a revoked or expired link");
            return Err(GuestlinkError::InvalidLink);
        }
        Ok(link)
    }

    /// Fetch a link by id, without any redeemability check.
    pub async fn get_link(&self, link_id: &str) -> Result<Option<LinkRecord>, GuestlinkError> {
        with_backoff(self.retry, "links.get_link", || {
            links::get_link(&self.db, link_id)
        })
        .await
    }

    /// Deactivate all links past their expiry. Returns how many were swept.
    pub async fn sweep_expired(&self) -> Result<usize, GuestlinkError> {
        let now = now_rfc3339(Utc::now());
        let swept = links::expire_links(&self.db, &now).await?;
        if swept > 0 {
            info!(count = swept, "expired links deactivated");
        }
        Ok(swept)
    }

    /// Register a conversation owned by `owner`, returning its id.
    ///
    /// Owner conversations normally pre-exist in the host system; this
    /// mirrors that registration so links can be bound to them.
    pub async fn register_conversation(&self, owner: &OwnerId) -> Result<String, GuestlinkError> {
        let conversation = guestlink_storage::Conversation {
            id: format!("conv-{}", Uuid::new_v4()),
            owner_id: owner.0.clone(),
            created_at: now_rfc3339(Utc::now()),
        };
        links::insert_conversation(&self.db, &conversation).await?;
        Ok(conversation.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestlink_config::model::VaultConfig;
    use secrecy::ExposeSecret;

    async fn test_registry() -> LinkRegistry {
        let db = Database::open_in_memory().await.unwrap();
        let vault = TokenVault::open(db.connection().clone(), &VaultConfig { master_key: None })
            .await
            .unwrap();
        LinkRegistry::new(db, Arc::new(vault), LinksConfig::default())
    }

    fn owner() -> OwnerId {
        OwnerId("owner-1".to_string())
    }

    #[tokio::test]
    async fn create_and_resolve_link() {
        let registry = test_registry().await;
        let conversation = registry.register_conversation(&owner()).await.unwrap();

        let created = registry
            .create_link(
                &owner(),
                Some(&conversation),
                LinkPolicy::default(),
                BehavioralPayload {
                    intent: "discuss the quarterly report".to_string(),
                    ..BehavioralPayload::default()
                },
            )
            .await
            .unwrap();

        let resolved = registry
            .get_link_by_token(created.token.expose_secret())
            .await
            .unwrap();
        assert_eq!(resolved.id, created.link.id);
        assert_eq!(resolved.conversation_id.as_deref(), Some(conversation.as_str()));
        assert_eq!(resolved.intent, "discuss the quarterly report");
    }

    #[tokio::test]
    async fn foreign_conversation_is_rejected() {
        let registry = test_registry().await;
        let other = OwnerId("owner-2".to_string());
        let conversation = registry.register_conversation(&other).await.unwrap();

        let err = registry
            .create_link(
                &owner(),
                Some(&conversation),
                LinkPolicy::default(),
                BehavioralPayload::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::Validation(_)));

        // Unknown conversation ids fail the same way.
        let err = registry
            .create_link(
                &owner(),
                Some("conv-missing"),
                LinkPolicy::default(),
                BehavioralPayload::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::Validation(_)));
    }

    #[tokio::test]
    async fn all_resolution_failures_look_identical() {
        let registry = test_registry().await;
        let created = registry
            .create_link(&owner(), None, LinkPolicy::default(), BehavioralPayload::default())
            .await
            .unwrap();

        // Garbage token.
        let garbage = registry.get_link_by_token("garbage").await.unwrap_err();
        // Revoked link.
        registry.revoke_link(&owner(), &created.link.id).await.unwrap();
        let revoked = registry
            .get_link_by_token(created.token.expose_secret())
            .await
            .unwrap_err();

        assert_eq!(garbage.to_string(), revoked.to_string());
        assert!(matches!(garbage, GuestlinkError::InvalidLink));
        assert!(matches!(revoked, GuestlinkError::InvalidLink));
    }

    #[tokio::test]
    async fn expired_link_is_unresolvable() {
        let registry = test_registry().await;
        let created = registry
            .create_link(&owner(), None, LinkPolicy::default(), BehavioralPayload::default())
            .await
            .unwrap();

        // Force the expiry into the past.
        let db = registry.db.clone();
        let link_id = created.link.id.clone();
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE links SET expires_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                    rusqlite::params![link_id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = registry
            .get_link_by_token(created.token.expose_secret())
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::InvalidLink));

        // The sweep deactivates it.
        assert_eq!(registry.sweep_expired().await.unwrap(), 1);
        let link = registry.get_link(&created.link.id).await.unwrap().unwrap();
        assert!(!link.active);
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_owner_scoped() {
        let registry = test_registry().await;
        let created = registry
            .create_link(&owner(), None, LinkPolicy::default(), BehavioralPayload::default())
            .await
            .unwrap();

        registry.revoke_link(&owner(), &created.link.id).await.unwrap();
        registry.revoke_link(&owner(), &created.link.id).await.unwrap();

        // A different owner cannot revoke, and learns only "not found".
        let err = registry
            .revoke_link(&OwnerId("owner-2".to_string()), &created.link.id)
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::Validation(_)));
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_before_minting() {
        let registry = test_registry().await;
        let err = registry
            .create_link(
                &owner(),
                None,
                LinkPolicy::default(),
                BehavioralPayload {
                    intent: "x".repeat(2001),
                    ..BehavioralPayload::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GuestlinkError::Validation(_)));
    }

    #[tokio::test]
    async fn allowed_origins_round_trip_as_json() {
        let registry = test_registry().await;
        let created = registry
            .create_link(
                &owner(),
                None,
                LinkPolicy {
                    allowed_origins: Some(vec!["https://example.com".to_string()]),
                    ..LinkPolicy::default()
                },
                BehavioralPayload::default(),
            )
            .await
            .unwrap();

        let stored: Vec<String> =
            serde_json::from_str(created.link.allowed_origins.as_deref().unwrap()).unwrap();
        assert_eq!(stored, vec!["https://example.com"]);
    }
}
