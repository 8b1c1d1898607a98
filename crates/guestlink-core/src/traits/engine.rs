// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract to the external reasoning/response-generation engine.
//!
//! The engine is handed the bound conversation transcript plus two
//! request-scoped augmentation fields derived from the link: a system-prompt
//! override (appended verbatim to the engine's base instructions) and the
//! chat intent (appended as a goal statement). Neither is ever persisted into
//! the conversation transcript -- they are recomputed from the link on every
//! guest message.

use async_trait::async_trait;

use crate::error::GuestlinkError;
use crate::types::ConversationId;

/// One transcript entry handed to the engine.
#[derive(Debug, Clone)]
pub struct EngineMessage {
    /// "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

/// A request for one assistant reply.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// The conversation this reply belongs to.
    pub conversation_id: ConversationId,
    /// Full transcript in timeline order, most recent last.
    pub messages: Vec<EngineMessage>,
    /// Link-scoped system instruction override. Request-scoped only.
    pub system_prompt_override: Option<String>,
    /// Link-scoped goal statement. Request-scoped only.
    pub chat_intent: Option<String>,
}

/// The engine's reply.
#[derive(Debug, Clone)]
pub struct EngineReply {
    /// Assistant reply text.
    pub content: String,
}

/// The external collaborator that produces assistant replies.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Produce one assistant reply for the given request.
    async fn respond(&self, request: EngineRequest) -> Result<EngineReply, GuestlinkError>;
}
