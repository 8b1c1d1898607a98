// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate and abuse guard for guest-originated traffic.
//!
//! Sharded fixed-window rate counters (per origin address and per link) plus
//! payload validation, evaluated before any guest write reaches storage.

pub mod guard;
pub mod limiter;
pub mod validate;

pub use guard::AbuseGuard;
pub use limiter::RateLimiter;
