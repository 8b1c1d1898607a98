// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Owner routes sit behind
//! the auth middleware; guest and webhook routes are public and carry
//! their own credentials in the request.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use guestlink_config::model::ServerConfig;
use guestlink_core::traits::ReasoningEngine;
use guestlink_core::GuestlinkError;
use guestlink_registry::LinkRegistry;
use guestlink_session::SessionManager;
use guestlink_webhook::RuleEngine;
use tower_http::cors::CorsLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Session redemption, validation, and message admission.
    pub manager: SessionManager,
    /// Owner-facing link lifecycle.
    pub registry: LinkRegistry,
    /// The external reply-producing collaborator.
    pub engine: Arc<dyn ReasoningEngine>,
    /// Routing rules for verified inbound events.
    pub rules: RuleEngine,
    /// DER-encoded P-256 provider key. `None` disables the webhook route.
    pub webhook_key: Option<Vec<u8>>,
    /// Owner-route authentication configuration.
    pub auth: AuthConfig,
    /// Base URL used to render public redeemable link URLs.
    pub public_base_url: String,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Build the full route tree over the given state.
pub fn build_router(state: GatewayState) -> Router {
    // Public routes: health, guest surface, signed webhook.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/guest/sessions", post(handlers::post_redeem))
        .route("/v1/guest/messages", post(handlers::post_guest_message))
        .route("/v1/webhooks/inbound", post(handlers::post_webhook))
        .with_state(state.clone());

    // Owner routes behind auth.
    let owner_routes = Router::new()
        .route("/v1/links", post(handlers::post_create_link))
        .route("/v1/links/{id}/revoke", post(handlers::post_revoke_link))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(owner_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until shutdown.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), GuestlinkError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GuestlinkError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| GuestlinkError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
