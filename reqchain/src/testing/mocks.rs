//! Mock adapter for testing.

use crate::adapter::RequestAdapter;
use crate::errors::TransportError;
use crate::guard::UrlGuard;
use crate::request::RequestDescriptor;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// A scripted [`RequestAdapter`] that records every descriptor it dispatches.
///
/// Outcomes are served from a FIFO script. When the script runs dry, the
/// adapter answers `{"status": 200, "url": <target>}` so unscripted chains
/// still execute. Descriptors are recorded only when a dispatch reaches the
/// transport, so guard-rejected requests leave no trace here.
#[derive(Debug)]
pub struct MockAdapter {
    guard: UrlGuard,
    script: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<RequestDescriptor>>,
}

impl MockAdapter {
    /// Creates a mock with an empty script and the strict default guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            guard: UrlGuard::default(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the URL guard.
    #[must_use]
    pub fn with_guard(mut self, guard: UrlGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Appends a success outcome to the script.
    #[must_use]
    pub fn with_response(self, response: Value) -> Self {
        self.push_response(response);
        self
    }

    /// Appends a failure outcome to the script.
    #[must_use]
    pub fn with_error(self, error: TransportError) -> Self {
        self.push_error(error);
        self
    }

    /// Appends a success outcome to the script.
    pub fn push_response(&self, response: Value) {
        self.script.lock().push_back(Ok(response));
    }

    /// Appends a failure outcome to the script.
    pub fn push_error(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns every descriptor that reached the transport, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().clone()
    }

    /// Returns the number of dispatches that reached the transport.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Clears the script and recorded calls.
    pub fn reset(&self) {
        self.script.lock().clear();
        self.calls.lock().clear();
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestAdapter for MockAdapter {
    async fn create_request(&self, config: &RequestDescriptor) -> Result<Value, TransportError> {
        self.calls.lock().push(config.clone());
        match self.script.lock().pop_front() {
            Some(outcome) => outcome,
            None => Ok(json!({"status": 200, "url": config.url})),
        }
    }

    fn guard(&self) -> &UrlGuard {
        &self.guard
    }
}
