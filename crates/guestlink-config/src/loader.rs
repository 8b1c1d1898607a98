// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./guestlink.toml` > `~/.config/guestlink/guestlink.toml`
//! > `/etc/guestlink/guestlink.toml` with environment variable overrides via
//! the `GUESTLINK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GuestlinkConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/guestlink/guestlink.toml` (system-wide)
/// 3. `~/.config/guestlink/guestlink.toml` (user XDG config)
/// 4. `./guestlink.toml` (local directory)
/// 5. `GUESTLINK_*` environment variables
pub fn load_config() -> Result<GuestlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuestlinkConfig::default()))
        .merge(Toml::file("/etc/guestlink/guestlink.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("guestlink/guestlink.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("guestlink.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<GuestlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuestlinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GuestlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuestlinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `GUESTLINK_SERVER_BEARER_TOKEN` must map
/// to `server.bearer_token`, not `server.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("GUESTLINK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: GUESTLINK_SERVER_BEARER_TOKEN -> "server_bearer_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("vault_", "vault.", 1)
            .replacen("guard_", "guard.", 1)
            .replacen("links_", "links.", 1)
            .replacen("sessions_", "sessions.", 1)
            .replacen("webhook_", "webhook.", 1);
        mapped.into()
    })
}
