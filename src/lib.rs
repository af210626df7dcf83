//! # postageapp
//!
//! Assemble transactional email and send it through the
//! [PostageApp](https://postageapp.com) API, then query its delivery status.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use postageapp::{PostageApp, Projects};
//!
//! let projects = Projects::new().with("shop", "PROJECT_API_KEY");
//! let mut client = PostageApp::new(projects).with_project("shop")?;
//!
//! client
//!     .set_recipients(["ana@example.com", "ben@example.com"])?
//!     .set_from(("Shop", "orders@example.com"))
//!     .set_subject("Order confirmed")
//!     .set_body("Thanks! Your order is on its way.");
//!
//! let sent = client.send_custom_message(None).await?;
//! println!("queued as {}", sent.uid);
//! ```
//!
//! ## Template Messages
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! client
//!     .select_project("shop")?
//!     .set_recipients_with_vars(json!({
//!         "ana@example.com": {"first_name": "Ana"},
//!         "ben@example.com": {"first_name": "Ben"},
//!     }))?
//!     .set_template("order_shipped")
//!     .set_global_vars(json!({"carrier": "DHL"}))?;
//!
//! let sent = client.send_template_message(None).await?;
//! let transmissions = client.get_message_status(&sent.uid).await?;
//! ```
//!
//! ## Environment Variables
//!
//! Read by [`PostageApp::from_env`] and [`Projects::from_env`]:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `POSTAGEAPP_PROJECTS` | `name=key` pairs, comma separated |
//! | `POSTAGEAPP_API_KEY` | Single key, registered as project `default` |
//! | `POSTAGEAPP_PROJECT` | Project to select at startup |
//! | `POSTAGEAPP_BASE_URL` | API host (default `https://api.postageapp.com`) |
//!
//! ## Feature Flags
//!
//! - `testing` - [`testing::MockTransport`], [`testing::StaticFetcher`] and assertion helpers
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `postageapp_requests_total` | Counter | method, status | API calls made |
//! | `postageapp_request_duration_seconds` | Histogram | method | API call duration |
//!
//! Install a recorder (e.g., `metrics-exporter-prometheus`) in your app to collect them.

/// The version of the postageapp crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod attachment;
mod client;
mod config;
mod error;
mod fetch;
mod message;
mod recipients;

pub mod transport;

#[cfg(feature = "testing")]
pub mod testing;

// Re-exports
pub use address::{Address, ToAddress};
pub use attachment::{Attachment, AttachmentContent, EncodedAttachment, IntoAttachments};
pub use client::PostageApp;
pub use config::{Projects, API_VERSION, DEFAULT_BASE_URL, DEFAULT_PROJECT};
pub use error::{ErrorKind, PostageError};
pub use fetch::{DefaultFetcher, Fetcher, FtpFetcher, HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use message::{derive_uid, Message};
pub use recipients::{IntoRecipientList, Recipients, Variables};
pub use transport::{ApiResponse, ResponseStatus, SendResult, Transport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Address;
    pub use crate::ApiResponse;
    pub use crate::Attachment;
    pub use crate::ErrorKind;
    pub use crate::PostageApp;
    pub use crate::PostageError;
    pub use crate::Projects;
    pub use crate::SendResult;
    pub use crate::ToAddress;
    pub use crate::Transport;
}
