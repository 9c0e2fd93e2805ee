//! Response attributes: the immutable result of a completed request.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Attributes of an HTTP response. Immutable once constructed; the body is
/// capped at [`crate::BODY_CAP`] bytes by the client before construction.
#[derive(Debug, Clone)]
pub struct ResponseAttributes {
    status: String,
    status_code: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseAttributes {
    /// Create response attributes from a status code, body, and headers.
    pub fn new(status_code: u16, body: impl Into<Bytes>, headers: HeaderMap) -> Self {
        let status = match StatusCode::from_u16(status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(reason) => format!("{status_code} {reason}"),
            None => status_code.to_string(),
        };

        Self {
            status,
            status_code,
            headers,
            body: body.into(),
        }
    }

    /// The HTTP status line, e.g. `200 OK`.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns true if the status is in the 2xx family.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The `Retry-After` header as a duration, when it is integer seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// The raw body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// The body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON into `T`.
    ///
    /// Failures surface as a [`crate::ErrorKind::Decode`] error, distinct
    /// from transport and policy errors.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }
}
