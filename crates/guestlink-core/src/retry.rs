// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff for transient infrastructure failures.
//!
//! Datastore and vault failures are retried a small fixed number of times
//! before being surfaced. Request-taxonomy errors (validation, capacity,
//! rate limits, auth) are never retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::GuestlinkError;

/// Retry policy: attempt count and base delay for exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Minimum 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

/// Run `op` with bounded exponential backoff on transient errors.
///
/// Non-transient errors and the final transient error are returned as-is.
/// `op_name` is used only for logging.
pub async fn with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    op_name: &str,
    mut op: F,
) -> Result<T, GuestlinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GuestlinkError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.base_delay;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(
                    op = op_name,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "transient failure, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    // The loop always returns on the last attempt.
    unreachable!("retry loop exited without a result")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(fast_policy(), "test-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GuestlinkError::Internal("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(fast_policy(), "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GuestlinkError::Internal("always down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(fast_policy(), "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GuestlinkError::RateLimited) }
        })
        .await;
        assert!(matches!(result, Err(GuestlinkError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
