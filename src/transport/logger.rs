//! Transport that only logs API calls.
//!
//! Useful for staging environments or when you want to see what would be sent
//! without contacting PostageApp.

use async_trait::async_trait;
use serde_json::Value;

use super::{ApiResponse, Transport};
use crate::error::PostageError;

/// Logger transport that emits tracing events instead of calling the API.
///
/// Every call succeeds with an `ok` envelope echoing the request's uid.
pub struct LoggerTransport {
    /// If true, log the whole payload. If false, just a summary.
    log_full: bool,
}

impl LoggerTransport {
    /// Create a logger transport with brief output.
    pub fn new() -> Self {
        Self { log_full: false }
    }

    /// Create a logger transport that logs full payloads.
    pub fn full() -> Self {
        Self { log_full: true }
    }

    /// Set whether to log full payloads.
    pub fn log_full(mut self, full: bool) -> Self {
        self.log_full = full;
        self
    }
}

impl Default for LoggerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoggerTransport {
    async fn call(&self, method: &str, payload: &Value) -> Result<ApiResponse, PostageError> {
        let uid = payload
            .pointer("/arguments/uid")
            .or_else(|| payload.get("uid"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if self.log_full {
            // The API key stays out of the log.
            let mut redacted = payload.clone();
            if let Some(key) = redacted.get_mut("api_key") {
                *key = Value::String("[redacted]".into());
            }
            tracing::info!(method = %method, payload = %redacted, "API call logged (full)");
        } else {
            let recipients = payload
                .pointer("/arguments/recipients")
                .map(|r| match r {
                    Value::Array(list) => list.len(),
                    Value::Object(map) => map.len(),
                    _ => 0,
                })
                .unwrap_or(0);
            tracing::info!(
                method = %method,
                uid = ?uid,
                recipients = recipients,
                "API call logged"
            );
        }

        let mut response = ApiResponse::ok();
        response.response.uid = uid;
        Ok(response)
    }

    fn transport_name(&self) -> &'static str {
        "logger"
    }
}
