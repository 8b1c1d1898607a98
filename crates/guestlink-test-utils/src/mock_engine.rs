// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reasoning engine for deterministic testing.
//!
//! `MockEngine` implements `ReasoningEngine` with pre-configured replies
//! and records every request it receives, so tests can assert on the
//! transcript and augmentation fields handed to the engine.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use guestlink_core::traits::{EngineReply, EngineRequest, ReasoningEngine};
use guestlink_core::GuestlinkError;
use tokio::sync::Mutex;

/// A mock engine that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty, a
/// default "mock reply" text is returned. All received requests are
/// recorded for inspection.
pub struct MockEngine {
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<EngineRequest>>>,
}

impl MockEngine {
    /// Create a mock engine with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock engine pre-loaded with the given replies.
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a reply to the end of the queue.
    pub async fn add_reply(&self, text: String) {
        self.replies.lock().await.push_back(text);
    }

    /// All requests received so far, in order.
    pub async fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningEngine for MockEngine {
    async fn respond(&self, request: EngineRequest) -> Result<EngineReply, GuestlinkError> {
        self.requests.lock().await.push(request);
        let content = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock reply".to_string());
        Ok(EngineReply { content })
    }
}
