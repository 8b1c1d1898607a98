// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait boundaries to external collaborators.
//!
//! Guestlink consumes its collaborators (the reasoning engine that produces
//! assistant replies) through narrow `#[async_trait]` contracts so the engine
//! itself stays out of scope.

pub mod engine;

pub use engine::{EngineMessage, EngineReply, EngineRequest, ReasoningEngine};
