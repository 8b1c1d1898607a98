// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The abuse guard evaluated on every guest-originated write.
//!
//! Ordering is fixed: payload validation runs first, then the per-origin
//! counter, then the per-link counter. A request rejected for shape never
//! charges a rate counter, and a request rejected by the origin ceiling
//! never charges the link's own counter.

use chrono::{DateTime, Utc};
use guestlink_config::model::GuardConfig;
use guestlink_core::GuestlinkError;
use guestlink_storage::LinkRecord;
use tracing::debug;

use crate::limiter::RateLimiter;
use crate::validate;

/// Rate and payload guard shared across all request handlers.
#[derive(Debug)]
pub struct AbuseGuard {
    limiter: RateLimiter,
    config: GuardConfig,
}

impl AbuseGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            limiter: RateLimiter::new(),
            config,
        }
    }

    /// Admit one link-redemption attempt from `origin_addr`.
    pub fn admit_redeem(
        &self,
        origin_addr: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GuestlinkError> {
        self.charge_origin(origin_addr, now)
    }

    /// Admit one guest message: validate the payload, then charge both
    /// counters.
    pub fn admit_message(
        &self,
        origin_addr: &str,
        link: &LinkRecord,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GuestlinkError> {
        validate::validate_message(content, self.config.max_message_bytes)?;
        self.charge_origin(origin_addr, now)?;

        let link_key = format!("link:{}", link.id);
        if !self.limiter.try_acquire(&link_key, link.rate_per_minute, now) {
            debug!(link_id = %link.id, "per-link rate cap hit");
            return Err(GuestlinkError::RateLimited);
        }
        Ok(())
    }

    /// Validate an attachment's declared media type against the allow-list.
    pub fn admit_attachment_type(&self, media_type: &str) -> Result<(), GuestlinkError> {
        validate::validate_attachment_type(media_type, &self.config.allowed_attachment_types)
    }

    /// Whether `origin` satisfies the link's origin allow-list.
    pub fn origin_allowed(&self, link: &LinkRecord, origin: Option<&str>) -> bool {
        validate::origin_allowed(link.allowed_origins.as_deref(), origin)
    }

    /// Drop rate counters older than the previous window.
    pub fn evict_stale(&self, now: DateTime<Utc>) {
        self.limiter.evict_stale(now);
    }

    fn charge_origin(&self, origin_addr: &str, now: DateTime<Utc>) -> Result<(), GuestlinkError> {
        let origin_key = format!("origin:{origin_addr}");
        if !self
            .limiter
            .try_acquire(&origin_key, self.config.origin_rate_per_minute, now)
        {
            debug!(origin = %origin_addr, "per-origin rate ceiling hit");
            return Err(GuestlinkError::RateLimited);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_link(rate_per_minute: u32) -> LinkRecord {
        LinkRecord {
            id: "lnk-1".to_string(),
            owner_id: "owner-1".to_string(),
            conversation_id: Some("conv-1".to_string()),
            active: true,
            expires_at: "2099-01-01T00:00:00.000Z".to_string(),
            max_sessions: 3,
            max_messages_per_session: 50,
            rate_per_minute,
            allowed_origins: None,
            intent: String::new(),
            system_prompt_override: None,
            opening_message: None,
            send_opening_message: false,
            token_handle: "hdl-1".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            revoked_at: None,
        }
    }

    #[test]
    fn per_link_cap_yields_exactly_one_rejection() {
        let guard = AbuseGuard::new(GuardConfig::default());
        let link = make_link(5);
        let now = Utc::now();

        let mut rejections = 0;
        for _ in 0..6 {
            if guard.admit_message("203.0.113.7", &link, "hi", now).is_err() {
                rejections += 1;
            }
        }
        assert_eq!(rejections, 1);

        // The counter resets after the window elapses.
        let later = now + Duration::seconds(60);
        guard.admit_message("203.0.113.7", &link, "hi", later).unwrap();
    }

    #[test]
    fn origin_ceiling_applies_across_links() {
        let guard = AbuseGuard::new(GuardConfig {
            origin_rate_per_minute: 2,
            ..GuardConfig::default()
        });
        let mut link_a = make_link(100);
        let mut link_b = make_link(100);
        link_b.id = "lnk-2".to_string();
        let now = Utc::now();

        guard.admit_message("10.0.0.1", &link_a, "a", now).unwrap();
        guard.admit_message("10.0.0.1", &link_b, "b", now).unwrap();
        // Third event from the same origin is refused no matter the link.
        link_a.id = "lnk-3".to_string();
        let err = guard.admit_message("10.0.0.1", &link_a, "c", now).unwrap_err();
        assert!(matches!(err, GuestlinkError::RateLimited));

        // A different origin is unaffected.
        guard.admit_message("10.0.0.2", &link_b, "d", now).unwrap();
    }

    #[test]
    fn invalid_payload_does_not_charge_counters() {
        let guard = AbuseGuard::new(GuardConfig::default());
        let link = make_link(1);
        let now = Utc::now();

        // An oversized message is rejected as validation, not rate.
        let big = "x".repeat(20000);
        let err = guard.admit_message("10.0.0.1", &link, &big, now).unwrap_err();
        assert!(matches!(err, GuestlinkError::Validation(_)));

        // The link's single slot is still available.
        guard.admit_message("10.0.0.1", &link, "ok", now).unwrap();
    }

    #[test]
    fn redeem_attempts_share_the_origin_counter() {
        let guard = AbuseGuard::new(GuardConfig {
            origin_rate_per_minute: 1,
            ..GuardConfig::default()
        });
        let now = Utc::now();
        guard.admit_redeem("10.0.0.9", now).unwrap();
        assert!(guard.admit_redeem("10.0.0.9", now).is_err());
    }
}
