// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the Guestlink REST API.
//!
//! Owner surface: POST /v1/links, POST /v1/links/{id}/revoke.
//! Guest surface: POST /v1/guest/sessions, POST /v1/guest/messages.
//! Event surface: POST /v1/webhooks/inbound. Plus GET /health.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use guestlink_core::GuestlinkError;
use guestlink_fusion::MessageTags;
use guestlink_registry::{BehavioralPayload, LinkPolicy};
use guestlink_session::{IncomingMessage, ParticipantMeta};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::AuthenticatedOwner;
use crate::server::GatewayState;

/// Error response body. Always a generic message; detail stays in logs.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an engine error to its public HTTP shape.
fn error_response(err: &GuestlinkError) -> Response {
    let status = match err {
        GuestlinkError::Validation(_) => StatusCode::BAD_REQUEST,
        GuestlinkError::InvalidLink => StatusCode::NOT_FOUND,
        GuestlinkError::CapacityExceeded => StatusCode::CONFLICT,
        // The quota is gone for good, but 429 is still the closest standard
        // status; the body distinguishes it from throttling.
        GuestlinkError::LimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        GuestlinkError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        GuestlinkError::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "request failed with internal error");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.public_message().to_string(),
        }),
    )
        .into_response()
}

/// Request body for POST /v1/links.
#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    /// Target conversation to fuse guest sessions into. Optional: links
    /// without one get a standalone conversation per session.
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub expires_in_hours: Option<u32>,
    #[serde(default)]
    pub max_sessions: Option<u32>,
    #[serde(default)]
    pub max_messages_per_session: Option<u32>,
    #[serde(default)]
    pub rate_per_minute: Option<u32>,
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub system_prompt_override: Option<String>,
    #[serde(default)]
    pub initial_agent_message: Option<String>,
    #[serde(default)]
    pub send_initial_message: Option<bool>,
}

/// Response body for POST /v1/links.
#[derive(Debug, Serialize)]
pub struct CreateLinkResponse {
    pub id: String,
    /// Public redeemable URL. The only place the raw token ever appears.
    pub url: String,
    pub conversation_id: Option<String>,
    pub expires_at: String,
    pub max_sessions: u32,
    pub max_messages_per_session: u32,
    pub rate_per_minute: u32,
    pub created_at: String,
}

/// POST /v1/links (owner-authenticated)
pub async fn post_create_link(
    State(state): State<GatewayState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Json(body): Json<CreateLinkRequest>,
) -> Response {
    let defaults = LinkPolicy::default();
    let policy = LinkPolicy {
        expires_in_hours: body.expires_in_hours,
        max_sessions: body.max_sessions.unwrap_or(defaults.max_sessions),
        max_messages_per_session: body
            .max_messages_per_session
            .unwrap_or(defaults.max_messages_per_session),
        rate_per_minute: body.rate_per_minute.unwrap_or(defaults.rate_per_minute),
        allowed_origins: body.allowed_origins,
    };
    let payload = BehavioralPayload {
        intent: body.intent.unwrap_or_default(),
        system_prompt_override: body.system_prompt_override,
        opening_message: body.initial_agent_message,
        send_opening_message: body.send_initial_message.unwrap_or(false),
    };

    match state
        .registry
        .create_link(&owner, body.conversation_id.as_deref(), policy, payload)
        .await
    {
        Ok(created) => {
            let url = format!(
                "{}/guest/{}",
                state.public_base_url.trim_end_matches('/'),
                created.token.expose_secret()
            );
            info!(link_id = %created.link.id, "link created via API");
            (
                StatusCode::CREATED,
                Json(CreateLinkResponse {
                    id: created.link.id,
                    url,
                    conversation_id: created.link.conversation_id,
                    expires_at: created.link.expires_at,
                    max_sessions: created.link.max_sessions,
                    max_messages_per_session: created.link.max_messages_per_session,
                    rate_per_minute: created.link.rate_per_minute,
                    created_at: created.link.created_at,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// POST /v1/links/{id}/revoke (owner-authenticated)
pub async fn post_revoke_link(
    State(state): State<GatewayState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(link_id): Path<String>,
) -> Response {
    match state.registry.revoke_link(&owner, &link_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        // Ownership mismatch and unknown id look the same: not found.
        Err(GuestlinkError::Validation(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "link not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Request body for POST /v1/guest/sessions.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// The opaque redeemable token from the link URL.
    pub token: String,
    #[serde(default)]
    pub participant_name: Option<String>,
}

/// Response body for POST /v1/guest/sessions.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub session_id: String,
    /// The session bearer token. Shown once.
    pub session_token: String,
    pub conversation_id: String,
    /// Auto-sent opening message, if the link configured one.
    pub opening_message: Option<String>,
}

/// POST /v1/guest/sessions (public)
pub async fn post_redeem(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<RedeemRequest>,
) -> Response {
    let header_str =
        |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let meta = ParticipantMeta {
        name: body.participant_name,
        origin_addr: addr.ip().to_string(),
        user_agent: header_str("user-agent"),
        referrer: header_str("referer"),
        origin: header_str("origin"),
    };

    match state.manager.create_session(&body.token, meta).await {
        Ok(session) => (
            StatusCode::CREATED,
            Json(RedeemResponse {
                session_id: session.session_id.0,
                session_token: session.token.expose_secret().to_string(),
                conversation_id: session.conversation_id,
                opening_message: session.opening_message,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Request body for POST /v1/guest/messages.
#[derive(Debug, Deserialize)]
pub struct GuestMessageRequest {
    pub session_token: String,
    pub content: String,
    /// Attachments the guest wants to send; declared content types are
    /// checked against the guard's allow-list.
    #[serde(default)]
    pub attachments: Vec<GuestAttachment>,
}

/// One attachment declared on a guest message.
#[derive(Debug, Deserialize)]
pub struct GuestAttachment {
    pub content_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response body for POST /v1/guest/messages.
#[derive(Debug, Serialize)]
pub struct GuestMessageResponse {
    pub message_id: String,
    /// The assistant's reply to the guest message.
    pub reply: String,
}

/// POST /v1/guest/messages (session-token-authenticated)
///
/// Appends the guest message to the fused conversation, asks the reasoning
/// engine for a reply with link-derived augmentation, and appends that
/// reply before returning it.
pub async fn post_guest_message(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<GuestMessageRequest>,
) -> Response {
    let incoming = IncomingMessage {
        content: body.content,
        origin_addr: addr.ip().to_string(),
        attachment_types: body
            .attachments
            .iter()
            .map(|a| a.content_type.clone())
            .collect(),
    };
    let accepted = match state
        .manager
        .append_guest_message(&body.session_token, incoming)
        .await
    {
        Ok(accepted) => accepted,
        Err(e) => return error_response(&e),
    };

    let request = match state
        .manager
        .fuser()
        .engine_request(&accepted.link, &accepted.session.conversation_id)
        .await
    {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    let reply = match state.engine.respond(request).await {
        Ok(reply) => reply,
        Err(e) => return error_response(&e),
    };

    let tags = MessageTags {
        session_id: accepted.session.id.clone(),
        link_id: accepted.link.id.clone(),
        guest_greeting: false,
        intent: accepted.link.intent.clone(),
        participant_name: None,
    };
    if let Err(e) = state
        .manager
        .fuser()
        .append_assistant(&accepted.session.conversation_id, &reply.content, &tags, false)
        .await
    {
        return error_response(&e);
    }

    Json(GuestMessageResponse {
        message_id: accepted.message.id,
        reply: reply.content,
    })
    .into_response()
}

/// Response body for POST /v1/webhooks/inbound.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Ids of the rules that matched, in evaluation order.
    pub matched_rules: Vec<String>,
}

/// POST /v1/webhooks/inbound (signed, unauthenticated transport)
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(ref public_key) = state.webhook_key else {
        // No provider key configured: the route does not exist.
        return StatusCode::NOT_FOUND.into_response();
    };

    let signature = headers.get("x-signature").and_then(|v| v.to_str().ok());
    let timestamp = headers.get("x-timestamp").and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        return error_response(&GuestlinkError::Unauthorized);
    };
    if let Err(e) =
        guestlink_webhook::verify(&body, signature, timestamp, public_key, Utc::now())
    {
        return error_response(&e);
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "malformed payload".to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.rules.evaluate(&event).await {
        Ok(outcomes) => Json(WebhookResponse {
            matched_rules: outcomes.into_iter().map(|o| o.rule_id).collect(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health (public)
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
