// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link policy and behavioral payload validation.

use chrono::{DateTime, Duration, Utc};
use guestlink_config::model::LinksConfig;
use guestlink_core::GuestlinkError;
use serde::{Deserialize, Serialize};

/// Length cap on a link's free-text intent, in characters.
pub const INTENT_MAX_CHARS: usize = 2000;
/// Length cap on a link's system-instruction override, in characters.
pub const OVERRIDE_MAX_CHARS: usize = 4000;
/// Length cap on a link's auto-sent opening message, in characters.
pub const OPENING_MAX_CHARS: usize = 2000;

/// Quantitative limits applied to a link's guest sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPolicy {
    /// Requested lifetime in hours. `None` uses the configured default.
    pub expires_in_hours: Option<u32>,
    pub max_sessions: u32,
    pub max_messages_per_session: u32,
    pub rate_per_minute: u32,
    /// Origins allowed to redeem this link. `None` = unrestricted.
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            expires_in_hours: None,
            max_sessions: 1,
            max_messages_per_session: 50,
            rate_per_minute: 10,
            allowed_origins: None,
        }
    }
}

impl LinkPolicy {
    pub fn validate(&self) -> Result<(), GuestlinkError> {
        if self.max_sessions < 1 {
            return Err(GuestlinkError::Validation(
                "max_sessions must be at least 1".to_string(),
            ));
        }
        if self.max_messages_per_session < 1 {
            return Err(GuestlinkError::Validation(
                "max_messages_per_session must be at least 1".to_string(),
            ));
        }
        if self.rate_per_minute < 1 {
            return Err(GuestlinkError::Validation(
                "rate_per_minute must be at least 1".to_string(),
            ));
        }
        if let Some(hours) = self.expires_in_hours
            && hours == 0
        {
            return Err(GuestlinkError::Validation(
                "expires_in_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Compute the expiry timestamp: default when unspecified, clamped to
    /// the configured ceiling. The result is always in the future.
    pub fn resolve_expiry(&self, config: &LinksConfig, now: DateTime<Utc>) -> DateTime<Utc> {
        let requested = self.expires_in_hours.unwrap_or(config.default_expiry_hours);
        let hours = requested.min(config.max_expiry_hours);
        now + Duration::hours(i64::from(hours))
    }
}

/// What the link instructs the assistant to do, and how the chat opens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehavioralPayload {
    /// Free-text purpose of the chat, surfaced to the reasoning engine.
    pub intent: String,
    pub system_prompt_override: Option<String>,
    pub opening_message: Option<String>,
    /// When set, the opening message is appended automatically at session
    /// creation, attributed to the assistant.
    pub send_opening_message: bool,
}

impl BehavioralPayload {
    pub fn validate(&self) -> Result<(), GuestlinkError> {
        if self.intent.chars().count() > INTENT_MAX_CHARS {
            return Err(GuestlinkError::Validation(format!(
                "intent exceeds {INTENT_MAX_CHARS} characters"
            )));
        }
        if let Some(ref text) = self.system_prompt_override
            && text.chars().count() > OVERRIDE_MAX_CHARS
        {
            return Err(GuestlinkError::Validation(format!(
                "system_prompt_override exceeds {OVERRIDE_MAX_CHARS} characters"
            )));
        }
        if let Some(ref text) = self.opening_message
            && text.chars().count() > OPENING_MAX_CHARS
        {
            return Err(GuestlinkError::Validation(format!(
                "opening_message exceeds {OPENING_MAX_CHARS} characters"
            )));
        }
        Ok(())
    }
}
