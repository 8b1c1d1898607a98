// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server startup: wires storage, vault, registry, guard, fusion, session,
//! webhook, and gateway layers, spawns the background sweep, and serves
//! until shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use guestlink_config::GuestlinkConfig;
use guestlink_core::traits::{EngineReply, EngineRequest, ReasoningEngine};
use guestlink_core::GuestlinkError;
use guestlink_fusion::ConversationFuser;
use guestlink_gateway::auth::AuthConfig;
use guestlink_gateway::server::{start_server, GatewayState};
use guestlink_guard::AbuseGuard;
use guestlink_registry::LinkRegistry;
use guestlink_session::{run_periodic, SessionManager};
use guestlink_storage::{ConversationWriter, Database};
use guestlink_vault::TokenVault;
use guestlink_webhook::RuleEngine;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Placeholder engine used until a real reasoning backend is configured.
///
/// Acknowledges the latest guest message so the full link, session, and
/// fusion path can be exercised end to end.
struct EchoEngine;

#[async_trait]
impl ReasoningEngine for EchoEngine {
    async fn respond(&self, request: EngineRequest) -> Result<EngineReply, GuestlinkError> {
        let last = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(EngineReply {
            content: format!("Received: {last}"),
        })
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Decode the configured hex Ed25519 public key for owner keypair auth.
fn owner_verifying_key(hex_key: &str) -> Result<VerifyingKey, GuestlinkError> {
    let bytes = hex::decode(hex_key)
        .map_err(|e| GuestlinkError::Config(format!("server.keypair_public_key is not hex: {e}")))?;
    let array: [u8; 32] = bytes.try_into().map_err(|_| {
        GuestlinkError::Config("server.keypair_public_key must be 32 bytes".to_string())
    })?;
    VerifyingKey::from_bytes(&array).map_err(|e| {
        GuestlinkError::Config(format!("server.keypair_public_key is not a valid key: {e}"))
    })
}

/// Start the Guestlink server with the given configuration.
pub async fn run(config: GuestlinkConfig) -> Result<(), GuestlinkError> {
    init_tracing(&config.server.log_level);

    let db = Database::open(&config.storage).await?;
    info!(path = %config.storage.database_path, "storage opened");

    let vault = Arc::new(TokenVault::open(db.connection().clone(), &config.vault).await?);
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

    let webhook_key = match config.webhook.public_key.as_deref() {
        Some(hex_key) => Some(hex::decode(hex_key).map_err(|e| {
            GuestlinkError::Config(format!("webhook.public_key is not hex: {e}"))
        })?),
        None => {
            info!("webhook.public_key not set -- inbound webhook route disabled");
            None
        }
    };

    let keypair_public_key = match config.server.keypair_public_key.as_deref() {
        Some(hex_key) => Some(owner_verifying_key(hex_key)?),
        None => None,
    };
    let auth = AuthConfig {
        bearer_token: config.server.bearer_token.clone(),
        keypair_public_key,
    };
    if auth.bearer_token.is_none() && auth.keypair_public_key.is_none() {
        warn!("no owner auth configured -- owner routes will reject all requests");
    }

    let state = GatewayState {
        manager,
        registry: registry.clone(),
        engine: Arc::new(EchoEngine),
        rules,
        webhook_key,
        auth,
        public_base_url: config.server.public_base_url.clone(),
        start_time: std::time::Instant::now(),
    };

    let sweep = tokio::spawn(run_periodic(
        db.clone(),
        registry,
        guard,
        config.sessions.clone(),
    ));

    let result = tokio::select! {
        r = start_server(&config.server, state) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    sweep.abort();
    db.close().await?;
    result
}
