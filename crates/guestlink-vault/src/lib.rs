// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM token vault for Guestlink.
//!
//! Mints opaque bearer tokens for links and guest sessions, stores only
//! digests and sealed subjects, and resolves presented tokens back to the
//! subject they grant. The raw token is available exactly once, at mint time.

pub mod crypto;
pub mod vault;

pub use vault::{mask_token, MintedToken, TokenSubject, TokenVault};
