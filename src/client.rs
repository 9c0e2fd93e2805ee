//! Core HTTP client: lazy transport realization, bounded attempt loop,
//! capped body read.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, TlsMaterial};
use crate::context::CallContext;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{encode_payload, get_header, merge_headers, RequestAttributes};
use crate::response::ResponseAttributes;
use crate::retry::RetryDecision;
use crate::{BODY_CAP, HEADER_CONTENT_TYPE};

/// Resilient HTTP client with timeouts, retry-with-backoff, and
/// content-type-aware payload encoding.
///
/// One instance is meant to be shared: concurrent `do_req` calls read the
/// configuration and share the transport; the only mutation is the one-time
/// lazy transport construction, guarded by a mutex.
#[derive(Debug)]
pub struct HttpClient {
    config: ClientConfig,
    transport: Mutex<Option<reqwest::Client>>,
}

impl HttpClient {
    /// Create a client from a finished configuration. Performs no I/O.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a single logical request as a bounded attempt loop.
    #[instrument(
        skip(self, ctx, request),
        fields(
            method = %request.method,
            url = %request.url,
            trace_id = request.trace_id.as_deref().unwrap_or(""),
        )
    )]
    pub async fn do_req(
        &self,
        ctx: &CallContext,
        request: &RequestAttributes,
    ) -> Result<ResponseAttributes> {
        if request.method.is_empty() {
            return Err(Error::new(ErrorKind::InvalidRequest(
                "method must not be empty".to_string(),
            )));
        }
        if request.url.is_empty() {
            return Err(Error::new(ErrorKind::InvalidRequest(
                "URL must not be empty".to_string(),
            )));
        }
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidRequest(format!("invalid method {:?}", request.method)),
                e,
            )
        })?;

        let headers = merge_headers(&self.config.headers, &request.headers);
        let payload = encode_payload(
            get_header(&headers, HEADER_CONTENT_TYPE),
            request.body.as_ref(),
        )?;

        let transport = self.transport()?;

        let max_attempts = if request.retry {
            self.config.max_attempts.max(1)
        } else {
            1
        };

        let mut policy_error: Option<Error> = None;
        let mut last_error: Option<Error> = None;
        let mut last_response: Option<reqwest::Response> = None;

        for attempt in 0..max_attempts {
            let outcome = ctx
                .run(send_attempt(
                    &transport,
                    method.clone(),
                    &request.url,
                    &headers,
                    payload.clone(),
                ))
                .await;

            // Cancellation is fatal even when the attempt itself completed.
            if let Some(ctx_err) = ctx.err() {
                return Err(ctx_err);
            }

            match outcome {
                Ok(response) => {
                    last_response = Some(response);
                    last_error = None;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "request attempt failed");
                    last_error = Some(err);
                    last_response = None;
                }
            }

            let decision =
                self.config
                    .retry_policy
                    .evaluate(ctx, last_response.as_ref(), last_error.as_ref());
            let (should_retry, pending) = match decision {
                RetryDecision::Retry => (true, None),
                RetryDecision::RetryWith(err) => (true, Some(err)),
                RetryDecision::Halt => (false, None),
                RetryDecision::HaltWith(err) => (false, Some(err)),
            };
            policy_error = pending;

            if !should_retry {
                break;
            }

            let remaining = max_attempts - attempt - 1;
            if remaining == 0 {
                break;
            }

            let wait = self.config.backoff.wait(
                self.config.min_wait,
                self.config.max_wait,
                attempt,
                last_response.as_ref(),
            );
            if self.config.enable_tracing {
                debug!(
                    attempt,
                    remaining,
                    wait_ms = wait.as_millis() as u64,
                    status = last_response.as_ref().map_or(0, |r| r.status().as_u16()),
                    "retrying request"
                );
            }

            ctx.sleep(wait).await?;
        }

        if let Some(err) = policy_error {
            return Err(err);
        }
        if let Some(err) = last_error {
            return Err(err);
        }
        let Some(response) = last_response else {
            return Err(Error::new(ErrorKind::Transport(
                "no attempt produced a response".to_string(),
            )));
        };

        let status_code = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = read_capped_body(response).await?;

        if status_code >= 299 && self.config.enable_tracing {
            warn!(
                status = status_code,
                body_len = body.len(),
                "response status indicates failure"
            );
        }

        Ok(ResponseAttributes::new(status_code, body, response_headers))
    }

    /// Drop the lazily built transport, releasing its connection pool once
    /// in-flight calls finish. Safe to call any number of times; a later
    /// `do_req` realizes a fresh transport.
    pub fn close(&self) {
        self.transport
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }

    /// Realize the underlying transport exactly once under concurrent use.
    fn transport(&self) -> Result<reqwest::Client> {
        let mut slot = self
            .transport
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build_transport()?;
        *slot = Some(client.clone());
        Ok(client)
    }

    fn build_transport(&self) -> Result<reqwest::Client> {
        if let Some(custom) = &self.config.transport {
            return Ok(custom.clone());
        }

        let mut builder = reqwest::Client::builder();
        if let Some(connect) = self.config.connection_timeout() {
            builder = builder.connect_timeout(connect);
        }
        if let Some(read) = self.config.response_timeout() {
            builder = builder.read_timeout(read);
        }
        if let Some(total) = self.config.total_timeout() {
            builder = builder.timeout(total);
        }

        if let Some(tls) = &self.config.tls {
            if let Some(identity) = client_identity(tls) {
                builder = builder.identity(identity);
            }
            for root in ca_roots(&tls.ca_bundle) {
                builder = builder.add_root_certificate(root);
            }
        }

        builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))
    }
}

async fn send_attempt(
    transport: &reqwest::Client,
    method: reqwest::Method,
    url: &str,
    headers: &HashMap<String, String>,
    payload: Bytes,
) -> Result<reqwest::Response> {
    let mut builder = transport.request(method, url);
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if !payload.is_empty() {
        builder = builder.body(payload);
    }

    builder.send().await.map_err(Error::from)
}

/// Read the body up to [`BODY_CAP`]; bytes beyond the cap are discarded.
async fn read_capped_body(mut response: reqwest::Response) -> Result<Bytes> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(Error::from)? {
        let remaining = BODY_CAP - body.len();
        let take = chunk.len().min(remaining);
        body.extend_from_slice(&chunk[..take]);
        if take < chunk.len() {
            break;
        }
    }
    Ok(Bytes::from(body))
}

fn client_identity(tls: &TlsMaterial) -> Option<reqwest::Identity> {
    let cert = std::fs::read(&tls.cert_path).ok()?;
    let key = std::fs::read(&tls.key_path).ok()?;

    let mut pem = cert;
    pem.extend_from_slice(&key);
    match reqwest::Identity::from_pem(&pem) {
        Ok(identity) => Some(identity),
        Err(err) => {
            warn!(error = %err, "ignoring malformed client certificate material");
            None
        }
    }
}

fn ca_roots(pem: &[u8]) -> Vec<reqwest::Certificate> {
    if pem.is_empty() {
        return Vec::new();
    }
    match reqwest::Certificate::from_pem_bundle(pem) {
        Ok(roots) => roots,
        Err(err) => {
            warn!(error = %err, "ignoring malformed CA bundle");
            Vec::new()
        }
    }
}
