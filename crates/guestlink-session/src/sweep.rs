// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic reclamation of expired links and abandoned sessions.
//!
//! Expiry is always enforced lazily on the request path; the sweep only
//! reclaims resources sooner and keeps rate-counter memory bounded.

use std::sync::Arc;

use chrono::{Duration, Utc};
use guestlink_config::model::SessionsConfig;
use guestlink_core::GuestlinkError;
use guestlink_guard::AbuseGuard;
use guestlink_registry::LinkRegistry;
use guestlink_storage::models::now_rfc3339;
use guestlink_storage::queries::sessions;
use guestlink_storage::Database;
use tracing::{debug, error, info};

/// One pass: deactivate expired links, expire their sessions, end idle
/// sessions, evict stale rate counters.
pub async fn run_sweep(
    db: &Database,
    registry: &LinkRegistry,
    guard: &AbuseGuard,
    config: &SessionsConfig,
) -> Result<SweepReport, GuestlinkError> {
    let now = Utc::now();
    let now_str = now_rfc3339(now);

    let links_expired = registry.sweep_expired().await?;
    let sessions_expired = sessions::expire_sessions_for_expired_links(db, &now_str).await?;

    let cutoff = now_rfc3339(now - Duration::minutes(i64::from(config.timeout_minutes)));
    let sessions_ended = sessions::end_idle_sessions(db, &cutoff, &now_str).await?;

    guard.evict_stale(now);

    let report = SweepReport {
        links_expired,
        sessions_expired,
        sessions_ended,
    };
    if report.links_expired + report.sessions_expired + report.sessions_ended > 0 {
        info!(
            links_expired = report.links_expired,
            sessions_expired = report.sessions_expired,
            sessions_ended = report.sessions_ended,
            "sweep pass reclaimed resources"
        );
    } else {
        debug!("sweep pass found nothing to reclaim");
    }
    Ok(report)
}

/// What one sweep pass reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub links_expired: usize,
    pub sessions_expired: usize,
    pub sessions_ended: usize,
}

/// Run sweeps forever at the configured interval. Spawn as a task.
pub async fn run_periodic(
    db: Database,
    registry: LinkRegistry,
    guard: Arc<AbuseGuard>,
    config: SessionsConfig,
) {
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(config.sweep_interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(e) = run_sweep(&db, &registry, &guard, &config).await {
            // A failed pass is retried at the next tick; it never kills the
            // process.
            error!(error = %e, "sweep pass failed");
        }
    }
}
