// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guest session lifecycle for the Guestlink engine.
//!
//! Redemption of link tokens into bound sessions, session-token validation
//! with lazy timeout, guest message admission, and the periodic expiry
//! sweep.

pub mod manager;
pub mod sweep;

pub use manager::{
    AcceptedMessage, CreatedSession, IncomingMessage, ParticipantMeta, SessionManager,
};
pub use sweep::{run_periodic, run_sweep, SweepReport};
