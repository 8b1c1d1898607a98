// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Guestlink engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Guestlink configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuestlinkConfig {
    /// HTTP server and owner-auth settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Token vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Rate & abuse guard settings.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Link policy bounds.
    #[serde(default)]
    pub links: LinksConfig,

    /// Guest session lifecycle settings.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Inbound webhook verification settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL used when rendering public redeemable link URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Bearer token for owner-authenticated routes. `None` disables bearer auth.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Hex-encoded Ed25519 public key for owner keypair auth. `None` disables it.
    #[serde(default)]
    pub keypair_public_key: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            bearer_token: None,
            keypair_public_key: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8470
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8470".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("guestlink").join("guestlink.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "guestlink.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Token vault configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Hex-encoded 32-byte master key. When unset, a key is generated on
    /// first open and persisted in `vault_meta` (development only).
    #[serde(default)]
    pub master_key: Option<String>,
}

/// Rate & abuse guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Per-origin-address ceiling, events per minute, across all links.
    #[serde(default = "default_origin_rate")]
    pub origin_rate_per_minute: u32,

    /// Maximum guest message payload size in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Attachment content types accepted from guests.
    #[serde(default = "default_attachment_types")]
    pub allowed_attachment_types: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            origin_rate_per_minute: default_origin_rate(),
            max_message_bytes: default_max_message_bytes(),
            allowed_attachment_types: default_attachment_types(),
        }
    }
}

fn default_origin_rate() -> u32 {
    100
}

fn default_max_message_bytes() -> usize {
    16 * 1024
}

fn default_attachment_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "text/plain".to_string(),
        "application/pdf".to_string(),
    ]
}

/// Link policy bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    /// Expiry applied when a create-link request omits one, in hours.
    #[serde(default = "default_expiry_hours")]
    pub default_expiry_hours: u32,

    /// Hard ceiling on requested expiry, in hours.
    #[serde(default = "default_max_expiry_hours")]
    pub max_expiry_hours: u32,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            default_expiry_hours: default_expiry_hours(),
            max_expiry_hours: default_max_expiry_hours(),
        }
    }
}

fn default_expiry_hours() -> u32 {
    1
}

fn default_max_expiry_hours() -> u32 {
    168
}

/// Guest session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Inactivity timeout after which a session is lazily ended, in minutes.
    #[serde(default = "default_session_timeout_minutes")]
    pub timeout_minutes: u32,

    /// Interval of the background expiry sweep, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_session_timeout_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_session_timeout_minutes() -> u32 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Inbound webhook verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Hex-encoded DER public key (ECDSA P-256) of the event provider.
    /// `None` disables the inbound webhook route.
    #[serde(default)]
    pub public_key: Option<String>,
}
