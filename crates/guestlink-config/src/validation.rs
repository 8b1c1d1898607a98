// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, hex-encoded keys, and sane
//! policy bounds.

use crate::diagnostic::ConfigError;
use crate::model::GuestlinkConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GuestlinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.links.default_expiry_hours == 0 {
        errors.push(ConfigError::Validation {
            message: "links.default_expiry_hours must be at least 1".to_string(),
        });
    }

    if config.links.max_expiry_hours < config.links.default_expiry_hours {
        errors.push(ConfigError::Validation {
            message: format!(
                "links.max_expiry_hours ({}) must be >= links.default_expiry_hours ({})",
                config.links.max_expiry_hours, config.links.default_expiry_hours
            ),
        });
    }

    if config.guard.origin_rate_per_minute == 0 {
        errors.push(ConfigError::Validation {
            message: "guard.origin_rate_per_minute must be at least 1".to_string(),
        });
    }

    if config.guard.max_message_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "guard.max_message_bytes must be at least 1".to_string(),
        });
    }

    if config.sessions.timeout_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "sessions.timeout_minutes must be at least 1".to_string(),
        });
    }

    // Hex-encoded key material must decode before the server starts serving.
    if let Some(ref key) = config.vault.master_key {
        match hex::decode(key) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(bytes) => errors.push(ConfigError::Validation {
                message: format!(
                    "vault.master_key must decode to 32 bytes, got {}",
                    bytes.len()
                ),
            }),
            Err(_) => errors.push(ConfigError::Validation {
                message: "vault.master_key is not valid hex".to_string(),
            }),
        }
    }

    if let Some(ref key) = config.server.keypair_public_key {
        match hex::decode(key) {
            Ok(bytes) if bytes.len() == 32 => {}
            _ => errors.push(ConfigError::Validation {
                message: "server.keypair_public_key must be 32 bytes of hex (Ed25519)"
                    .to_string(),
            }),
        }
    }

    if let Some(ref key) = config.webhook.public_key {
        if hex::decode(key).is_err() {
            errors.push(ConfigError::Validation {
                message: "webhook.public_key is not valid hex".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
