//! Mock backend for testing without a live LLM.
//!
//! [`MockBackend`] plays back a script of [`MockReply`] values in order and
//! records every request it receives, so tests can assert both what the
//! pipeline sent and how it reacts to provider failures.
//!
//! # Example
//!
//! ```
//! use story_pipeline::backend::{MockBackend, MockReply};
//!
//! let ok = MockBackend::fixed("Hello, world!");
//! let flaky = MockBackend::scripted(vec![
//!     MockReply::text("first"),
//!     MockReply::fail(500, "boom"),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::PipelineError;

/// One scripted outcome of a [`MockBackend`] call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with this text and status 200.
    Text(String),
    /// Fail as if the provider returned this HTTP status and body.
    Fail { status: u16, body: String },
}

impl MockReply {
    /// Shorthand for [`MockReply::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// Shorthand for [`MockReply::Fail`].
    pub fn fail(status: u16, body: impl Into<String>) -> Self {
        MockReply::Fail {
            status,
            body: body.into(),
        }
    }
}

/// A test backend that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given canned text responses.
    ///
    /// Responses are returned in order. When exhausted, cycles from the beginning.
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockReply::Text).collect())
    }

    /// Create a mock from an explicit script of successes and failures.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::scripted(vec![MockReply::text(response)])
    }

    /// Create a mock whose every call fails with `status`.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self::scripted(vec![MockReply::fail(status, body)])
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    /// Copies of every request received, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::Fail { status, body } => Err(PipelineError::HttpError {
                status,
                body,
                retry_after: None,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
