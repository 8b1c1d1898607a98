// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Guestlink engine.
//!
//! Public-facing surfaces must never leak which internal condition produced
//! an error. [`GuestlinkError::public_message`] is the single place where
//! errors are normalized for callers; the full variant detail is only ever
//! written to server-side logs.

use thiserror::Error;

/// The primary error type used across all Guestlink crates.
#[derive(Debug, Error)]
pub enum GuestlinkError {
    /// Malformed or oversized input, rejected synchronously.
    #[error("validation error: {0}")]
    Validation(String),

    /// Generic catch-all for missing/expired/revoked/malformed link tokens.
    ///
    /// Intentionally carries no detail: callers must not be able to
    /// distinguish a wrong-format token from an expired or revoked link.
    #[error("invalid link")]
    InvalidLink,

    /// The link's concurrent session cap has been reached.
    #[error("link capacity reached")]
    CapacityExceeded,

    /// The session has used up its per-session message allowance.
    #[error("message limit reached")]
    LimitExceeded,

    /// Per-origin or per-link throttling rejected the request.
    #[error("rate limited")]
    RateLimited,

    /// Signature or timestamp verification failed on an inbound event.
    #[error("unauthorized")]
    Unauthorized,

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Token vault errors (crypto failure, corrupted entries).
    #[error("vault error: {0}")]
    Vault(String),

    /// Reasoning engine errors (the external response-generation collaborator).
    #[error("engine error: {message}")]
    Engine {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GuestlinkError {
    /// Generic message safe to return to unauthenticated callers.
    ///
    /// Infrastructure failures all collapse to the same string so a caller
    /// cannot learn which subsystem failed.
    pub fn public_message(&self) -> &'static str {
        match self {
            GuestlinkError::Validation(_) => "invalid request",
            GuestlinkError::InvalidLink => "invalid link",
            GuestlinkError::CapacityExceeded => "link capacity reached",
            GuestlinkError::LimitExceeded => "message limit reached",
            GuestlinkError::RateLimited => "rate limited",
            GuestlinkError::Unauthorized => "unauthorized",
            GuestlinkError::Config(_)
            | GuestlinkError::Storage { .. }
            | GuestlinkError::Vault(_)
            | GuestlinkError::Engine { .. }
            | GuestlinkError::Internal(_) => "internal error",
        }
    }

    /// Whether a retry with backoff may succeed.
    ///
    /// Only infrastructure failures are transient; everything in the request
    /// taxonomy (validation, capacity, rate limits, auth) is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GuestlinkError::Storage { .. }
                | GuestlinkError::Vault(_)
                | GuestlinkError::Internal(_)
        )
    }
}
