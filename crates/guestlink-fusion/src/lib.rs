// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context fusion layer for the Guestlink engine.
//!
//! Binds guest session message streams into owner conversation timelines
//! and derives the per-request prompt augmentation handed to the reasoning
//! engine.

pub mod fuser;

pub use fuser::{ConversationFuser, MessageTags, PromptAugmentation};
