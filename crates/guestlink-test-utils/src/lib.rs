// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Guestlink integration tests.
//!
//! Provides a mock reasoning engine and a full-stack harness for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockEngine`] - Mock reasoning engine with pre-configured replies
//! - [`TestStack`] - Fully wired engine stack over a temporary database

pub mod harness;
pub mod mock_engine;

pub use harness::TestStack;
pub use mock_engine::MockEngine;
