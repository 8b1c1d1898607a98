// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-stack test harness backed by a temporary database.
//!
//! `TestStack` wires the storage, vault, registry, guard, fusion, and
//! session layers exactly the way the binary does, against a tempdir
//! database, so integration tests exercise the production composition.

use std::sync::Arc;

use guestlink_config::model::GuestlinkConfig;
use guestlink_core::types::OwnerId;
use guestlink_fusion::ConversationFuser;
use guestlink_guard::AbuseGuard;
use guestlink_registry::{BehavioralPayload, CreatedLink, LinkPolicy, LinkRegistry};
use guestlink_session::SessionManager;
use guestlink_storage::{ConversationWriter, Database};
use guestlink_vault::TokenVault;
use guestlink_webhook::RuleEngine;

/// A fully wired engine stack over a temporary database.
pub struct TestStack {
    pub db: Database,
    pub vault: Arc<TokenVault>,
    pub registry: LinkRegistry,
    pub guard: Arc<AbuseGuard>,
    pub fuser: ConversationFuser,
    pub manager: SessionManager,
    pub rules: RuleEngine,
    pub config: GuestlinkConfig,
    _dir: tempfile::TempDir,
}

impl TestStack {
    /// Build a stack with default configuration.
    pub async fn new() -> Self {
        Self::with_config(GuestlinkConfig::default()).await
    }

    /// Build a stack with the given configuration. The database path is
    /// always redirected into the tempdir.
    pub async fn with_config(mut config: GuestlinkConfig) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let db_path = dir.path().join("guestlink-test.db");
        config.storage.database_path = db_path
            .to_str()
            .expect("utf-8 tempdir path")
            .to_string();
        let db = Database::open(&config.storage)
            .await
            .expect("open test database");

        let vault = Arc::new(
            TokenVault::open(db.connection().clone(), &config.vault)
                .await
                .expect("open vault"),
        );
        let registry = LinkRegistry::new(db.clone(), vault.clone(), config.links.clone());
        let guard = Arc::new(AbuseGuard::new(config.guard.clone()));
        let fuser = ConversationFuser::new(ConversationWriter::new(db.clone()));
        let manager = SessionManager::new(
            db.clone(),
            vault.clone(),
            registry.clone(),
            guard.clone(),
            fuser.clone(),
            config.sessions.clone(),
        );
        let rules = RuleEngine::new(db.clone());

        Self {
            db,
            vault,
            registry,
            guard,
            fuser,
            manager,
            rules,
            config,
            _dir: dir,
        }
    }

    /// Create a link for `owner` bound to a freshly registered conversation.
    ///
    /// Returns the conversation id and the created link.
    pub async fn link_with_conversation(
        &self,
        owner: &OwnerId,
        policy: LinkPolicy,
        payload: BehavioralPayload,
    ) -> (String, CreatedLink) {
        let conversation = self
            .registry
            .register_conversation(owner)
            .await
            .expect("register conversation");
        let created = self
            .registry
            .create_link(owner, Some(&conversation), policy, payload)
            .await
            .expect("create link");
        (conversation, created)
    }
}
