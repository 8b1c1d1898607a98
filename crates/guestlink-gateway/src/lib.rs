// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Guestlink engine.
//!
//! Exposes the owner link-management surface (authenticated), the guest
//! redemption and message surface (token-authenticated), and the signed
//! inbound webhook surface.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::{AuthConfig, AuthenticatedOwner};
pub use server::{build_router, start_server, GatewayState};
