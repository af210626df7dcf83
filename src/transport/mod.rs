//! Transport trait and the API response envelope.
//!
//! # Why `async_trait`?
//!
//! The client holds its transport as `Arc<dyn Transport>` so tests and staging
//! setups can swap in a different one at runtime. Native async trait methods
//! are not object safe, so the `#[async_trait]` macro boxes the futures. One
//! heap allocation per API call is noise next to a network round trip.
//!
//! ## Available Transports
//!
//! | Transport | Feature Flag | Description |
//! |-----------|-------------|-------------|
//! | [`HttpTransport`] | (none) | JSON over HTTPS via reqwest |
//! | [`LoggerTransport`] | (none) | Logs requests, answers `ok` without sending |
//! | [`MockTransport`](crate::testing::MockTransport) | `testing` | Records calls, scripted replies |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PostageError;

mod http;
pub use http::HttpTransport;

mod logger;
pub use logger::LoggerTransport;

/// Trait for delivering one API call.
///
/// Implementations POST `payload` to the endpoint for `method` and return the
/// parsed envelope whatever its status; the client decides success from
/// `response.status`. A failure to reach the API or to parse its answer is a
/// [`PostageError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform an API call such as `send_message` or `get_metrics`.
    async fn call(&self, method: &str, payload: &Value) -> Result<ApiResponse, PostageError>;

    /// Get the transport name (for logging/debugging).
    fn transport_name(&self) -> &'static str {
        "unknown"
    }
}

/// Status block of every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// `"ok"` on success, an error code otherwise
    pub status: String,
    /// Human readable error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// uid of the message the call concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Parsed API response: `{"response": {...}, "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub response: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    /// Envelope with status `ok` and no data.
    pub fn ok() -> Self {
        Self {
            response: ResponseStatus {
                status: "ok".into(),
                message: None,
                uid: None,
            },
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.response.status == "ok"
    }

    /// Keep a successful envelope, or turn a refusal into [`PostageError::Remote`].
    ///
    /// The error message falls back to the status text when the API sent none.
    pub fn into_result(self) -> Result<Self, PostageError> {
        if self.is_ok() {
            return Ok(self);
        }
        let ResponseStatus {
            status, message, ..
        } = self.response;
        Err(PostageError::Remote {
            message: message.unwrap_or_else(|| status.clone()),
            status,
        })
    }

    /// Value under `data` at a JSON pointer (e.g. `"/metrics"`).
    pub fn data_at(&self, pointer: &str) -> Option<&Value> {
        self.data.as_ref()?.pointer(pointer)
    }
}

/// Result of a successful `send_message` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    /// uid the API recorded the message under
    pub uid: String,
    /// Full response envelope
    pub response: ApiResponse,
}
