// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Guestlink ephemeral linked-session engine.
//!
//! Provides the workspace-wide error taxonomy, identifier types, the
//! reasoning-engine collaborator trait, and the bounded-backoff retry helper
//! used at the datastore/vault I/O boundary.

pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::GuestlinkError;
pub use traits::{EngineMessage, EngineReply, EngineRequest, ReasoningEngine};
pub use types::{
    ConversationId, GuestSessionId, LinkId, MessageId, MessageRole, OwnerId, SessionStatus,
};
