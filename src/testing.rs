//! Test doubles and assertion helpers.
//!
//! Enabled with the `testing` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use postageapp::testing::*;
//! use postageapp::{PostageApp, Projects};
//!
//! #[tokio::test]
//! async fn test_receipt_flow() {
//!     let transport = MockTransport::new();
//!     let mut client = PostageApp::new(Projects::new().with("main", "key"))
//!         .with_transport(transport.clone())
//!         .with_project("main")
//!         .unwrap();
//!
//!     // ... code under test sends a message ...
//!
//!     assert_method_called(&transport, "send_message");
//!     assert_argument(&transport, "/arguments/template", "welcome");
//! }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::PostageError;
use crate::fetch::Fetcher;
use crate::transport::{ApiResponse, Transport};

/// One call seen by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub payload: Value,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    replies: VecDeque<Result<ApiResponse, PostageError>>,
}

/// Transport that records calls and answers from a script.
///
/// Clones share state, so keep one clone for assertions and hand the other to
/// the client. Once scripted replies run out, every call answers `ok` echoing
/// the request uid.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw JSON envelope as the next reply.
    ///
    /// # Panics
    ///
    /// Panics if `envelope` is not a valid response envelope.
    pub fn reply_json(&self, envelope: Value) -> &Self {
        let response: ApiResponse =
            serde_json::from_value(envelope).expect("invalid response envelope");
        self.state.lock().replies.push_back(Ok(response));
        self
    }

    /// Queue a transport failure as the next reply.
    pub fn reply_error(&self, error: PostageError) -> &Self {
        self.state.lock().replies.push_back(Err(error));
        self
    }

    /// Queue `{"response": {"status": status, "message": message}}`.
    pub fn reply_remote_error(&self, status: &str, message: &str) -> &Self {
        self.reply_json(json!({"response": {"status": status, "message": message}}))
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.state.lock().calls.last().cloned()
    }

    /// Forget recorded calls and pending replies.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.replies.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, method: &str, payload: &Value) -> Result<ApiResponse, PostageError> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            method: method.to_string(),
            payload: payload.clone(),
        });

        if let Some(reply) = state.replies.pop_front() {
            return reply;
        }

        let mut response = ApiResponse::ok();
        response.response.uid = payload
            .pointer("/arguments/uid")
            .or_else(|| payload.get("uid"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(response)
    }

    fn transport_name(&self) -> &'static str {
        "mock"
    }
}

/// Fetcher serving content from memory.
///
/// Unknown locations fail with [`PostageError::AttachmentFetch`].
#[derive(Clone, Default)]
pub struct StaticFetcher {
    content: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` at `location`.
    pub fn serve(self, location: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.content.lock().insert(location.into(), data.into());
        self
    }

    /// Locations requested so far, oldest first.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, PostageError> {
        self.fetched.lock().push(location.to_string());
        self.content
            .lock()
            .get(location)
            .cloned()
            .ok_or_else(|| PostageError::fetch(location, "not found"))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn format_call_summary(calls: &[RecordedCall]) -> String {
    if calls.is_empty() {
        return "  (no calls made)".to_string();
    }

    calls
        .iter()
        .enumerate()
        .map(|(i, call)| {
            let uid = call
                .payload
                .pointer("/arguments/uid")
                .or_else(|| call.payload.get("uid"))
                .and_then(Value::as_str)
                .unwrap_or("<none>");
            format!("  {}. {} (uid: {})", i + 1, call.method, uid)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Assertions
// ============================================================================

/// Assert that no API call was made.
///
/// # Panics
///
/// Panics if any call was recorded.
pub fn assert_no_calls(transport: &MockTransport) {
    let calls = transport.calls();
    assert!(
        calls.is_empty(),
        "Expected no API calls, but {} were made.\n\nCalls:\n{}",
        calls.len(),
        format_call_summary(&calls)
    );
}

/// Assert that exactly `expected` API calls were made.
///
/// # Panics
///
/// Panics if the count doesn't match.
pub fn assert_call_count(transport: &MockTransport, expected: usize) {
    let calls = transport.calls();
    assert!(
        calls.len() == expected,
        "Expected {} API call(s), but {} were made.\n\nCalls:\n{}",
        expected,
        calls.len(),
        format_call_summary(&calls)
    );
}

/// Assert that `method` was called at least once.
///
/// # Panics
///
/// Panics if no call used that method.
pub fn assert_method_called(transport: &MockTransport, method: &str) {
    let calls = transport.calls();
    assert!(
        calls.iter().any(|c| c.method == method),
        "Expected a call to '{}'.\n\nCalls:\n{}",
        method,
        format_call_summary(&calls)
    );
}

/// Assert that the last call's payload has `expected` at JSON `pointer`.
///
/// # Panics
///
/// Panics if there was no call or the value differs.
pub fn assert_argument(transport: &MockTransport, pointer: &str, expected: impl Into<Value>) {
    let expected = expected.into();
    let Some(call) = transport.last_call() else {
        panic!("Expected an API call with {} = {}, but none were made", pointer, expected);
    };
    let actual = call.payload.pointer(pointer);
    assert!(
        actual == Some(&expected),
        "Expected {} = {} in the last '{}' call, got {}",
        pointer,
        expected,
        call.method,
        actual.map_or("<missing>".to_string(), Value::to_string)
    );
}
