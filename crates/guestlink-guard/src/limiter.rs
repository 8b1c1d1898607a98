// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window rate counters, sharded by key.
//!
//! Counters live in a `DashMap` keyed by an arbitrary string (an origin
//! address or a link id), so unrelated traffic never contends on the same
//! entry. Each entry holds `(window, count)` for a 60-second window; the
//! increment-and-check runs under the entry's shard lock, which keeps the
//! limit exact under concurrent access. Stale entries are evicted
//! periodically to bound memory.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Length of one counting window in seconds.
pub const WINDOW_SECS: i64 = 60;

/// Sharded fixed-window rate limiter.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, (i64, u32)>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Charge one event against `key`, refusing above `limit` per window.
    ///
    /// Returns `true` if the event was admitted. With a limit of N, the
    /// (N+1)-th call within one window returns `false`; a fresh window
    /// starts the count over.
    pub fn try_acquire(&self, key: &str, limit: u32, now: DateTime<Utc>) -> bool {
        let window = now.timestamp().div_euclid(WINDOW_SECS);
        let mut entry = self.windows.entry(key.to_string()).or_insert((window, 0));
        if entry.0 != window {
            *entry = (window, 0);
        }
        if entry.1 >= limit {
            return false;
        }
        entry.1 += 1;
        true
    }

    /// Drop counters older than the previous window.
    pub fn evict_stale(&self, now: DateTime<Utc>) {
        let current = now.timestamp().div_euclid(WINDOW_SECS);
        self.windows.retain(|_, (window, _)| *window >= current - 1);
    }

    /// Number of live counter entries, for observability.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn limit_is_exact_within_a_window() {
        let limiter = RateLimiter::new();
        let now = Utc::now();

        for _ in 0..10 {
            assert!(limiter.try_acquire("link:lnk-1", 10, now));
        }
        // The 11th event in the same window is the first rejection.
        assert!(!limiter.try_acquire("link:lnk-1", 10, now));
    }

    #[test]
    fn counter_resets_when_window_elapses() {
        let limiter = RateLimiter::new();
        let now = Utc::now();

        for _ in 0..3 {
            limiter.try_acquire("k", 3, now);
        }
        assert!(!limiter.try_acquire("k", 3, now));

        let next_window = now + Duration::seconds(WINDOW_SECS);
        assert!(limiter.try_acquire("k", 3, next_window));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        let now = Utc::now();

        assert!(limiter.try_acquire("origin:10.0.0.1", 1, now));
        assert!(!limiter.try_acquire("origin:10.0.0.1", 1, now));
        // A different key has its own counter.
        assert!(limiter.try_acquire("origin:10.0.0.2", 1, now));
    }

    #[test]
    fn eviction_drops_old_windows_only() {
        let limiter = RateLimiter::new();
        let now = Utc::now();

        limiter.try_acquire("old", 5, now - Duration::seconds(WINDOW_SECS * 3));
        limiter.try_acquire("recent", 5, now);
        assert_eq!(limiter.len(), 2);

        limiter.evict_stale(now);
        assert_eq!(limiter.len(), 1);
        // The surviving counter still enforces its limit.
        for _ in 0..4 {
            limiter.try_acquire("recent", 5, now);
        }
        assert!(!limiter.try_acquire("recent", 5, now));
    }

    #[test]
    fn concurrent_acquires_never_exceed_limit() {
        let limiter = std::sync::Arc::new(RateLimiter::new());
        let now = Utc::now();
        let admitted = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let admitted = admitted.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    if limiter.try_acquire("shared", 50, now) {
                        admitted.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 200 attempts against a limit of 50: exactly 50 admitted.
        assert_eq!(admitted.load(std::sync::atomic::Ordering::Relaxed), 50);
    }
}
