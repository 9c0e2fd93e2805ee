//! Resilient outbound HTTP client for retailer-facing service calls.
//!
//! The crate wraps a shared transport with the operational behavior outbound
//! integrations need: connect and response-header timeouts, a bounded retry
//! loop with pluggable backoff and retry policies, cooperative cancellation
//! and deadlines, mutual TLS, and content-type-aware payload encoding (JSON,
//! XML, pre-encoded multipart).
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use courier_http::{CallContext, ClientConfig, HttpClient, RequestAttributes};
//!
//! # async fn run() -> courier_http::Result<()> {
//! let client = HttpClient::new(
//!     ClientConfig::new()
//!         .with_header("Authorization", "Bearer token")
//!         .with_max_attempts(3)
//!         .with_min_wait(Duration::from_millis(500)),
//! );
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(10));
//! let request = RequestAttributes::new("GET", "https://api.example.com/configurations")
//!     .with_trace_id("req-42");
//!
//! let response = client.do_req(&ctx, &request).await?;
//! let configurations: serde_json::Value = response.json()?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;

pub use backoff::{BackoffStrategy, ExponentialBackoff, LinearJitterBackoff};
pub use client::HttpClient;
pub use config::{ClientConfig, TlsMaterial};
pub use context::CallContext;
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestAttributes, RequestBody};
pub use response::ResponseAttributes;
pub use retry::{DefaultRetryPolicy, RetryDecision, RetryPolicy};

/// `User-Agent` header name.
pub const HEADER_USER_AGENT: &str = "User-Agent";

/// `Content-Type` header name.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

/// `Authorization` header name.
pub const HEADER_AUTHORIZATION: &str = "Authorization";

/// JSON content type; also the encoding default when none is set.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// XML content type.
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// Multipart content-type prefix; bodies must be pre-encoded raw buffers.
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// Cap on buffered response bodies (1 MiB); bytes beyond it are discarded.
pub const BODY_CAP: usize = 1024 * 1024;
