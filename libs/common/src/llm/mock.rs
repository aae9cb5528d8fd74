//! Mock backend for tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{CompletionRequest, LlmBackend, LlmError};

/// Backend returning a fixed reply and recording every request it receives.
pub struct MockBackend {
    reply: Result<String, LlmError>,
    call_count: AtomicU32,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    pub fn with_response(content: impl Into<String>) -> Self {
        Self {
            reply: Ok(content.into()),
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_error(error: LlmError) -> Self {
        Self {
            reply: Err(error),
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of times `complete` was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .ok()
            .and_then(|requests| requests.last().cloned())
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.reply.clone()
    }
}
