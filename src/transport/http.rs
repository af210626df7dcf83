//! JSON-over-HTTPS transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use postageapp::transport::HttpTransport;
//! use std::time::Duration;
//!
//! let transport = HttpTransport::new()
//!     .base_url("https://api.postageapp.com")
//!     .timeout(Duration::from_secs(10));
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{ApiResponse, Transport};
use crate::config::{API_VERSION, DEFAULT_BASE_URL};
use crate::error::PostageError;

/// Default time limit for one API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport that POSTs to `<base_url>/v.1.0/<method>.json`.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom base URL (for testing or a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint URL for an API method.
    pub fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            API_VERSION,
            method
        )
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, payload: &Value) -> Result<ApiResponse, PostageError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("User-Agent", format!("postageapp-rs/{}", crate::VERSION))
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await?;

        // Error statuses still carry an envelope, so the body decides.
        let status = response.status();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            PostageError::Transport(format!("unparseable response (HTTP {}): {}", status, e))
        })
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let transport = HttpTransport::new();
        assert_eq!(
            transport.endpoint("send_message"),
            "https://api.postageapp.com/v.1.0/send_message.json"
        );

        let transport = HttpTransport::new().base_url("http://localhost:8080/");
        assert_eq!(
            transport.endpoint("get_metrics"),
            "http://localhost:8080/v.1.0/get_metrics.json"
        );
    }
}
