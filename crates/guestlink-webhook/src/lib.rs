// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event handling for the Guestlink engine.
//!
//! Stateless signature/freshness verification followed by priority-ordered
//! routing rule evaluation.

pub mod rules;
pub mod verify;

pub use rules::{RuleAction, RuleEngine, RuleOutcome};
pub use verify::{verify, REPLAY_WINDOW_SECS};
