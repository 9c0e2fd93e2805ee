//! Retry policy: classification of attempt outcomes into transient and
//! permanent failures.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::context::CallContext;
use crate::error::{Error, ErrorKind};

// The interesting transport failures are not exposed as typed errors by the
// underlying stack, so permanent ones are recognized by their textual form,
// anywhere in the error's source chain.
static REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"stopped after \d+ redirects|too many redirects").expect("redirect pattern")
});
static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"unsupported protocol scheme|URL scheme is not allowed").expect("scheme pattern")
});
static UNTRUSTED_CERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"certificate is not trusted|unknown certificate authority|invalid peer certificate|UnknownIssuer",
    )
    .expect("certificate pattern")
});

/// The outcome of classifying one attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Try again after backoff.
    Retry,
    /// Try again; if no attempts remain, surface this error as the failure.
    RetryWith(Error),
    /// Stop; the caller inspects the response or transport error itself.
    Halt,
    /// Stop and surface this error.
    HaltWith(Error),
}

impl RetryDecision {
    /// Whether this decision asks for another attempt.
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry | RetryDecision::RetryWith(_))
    }
}

/// Policy classifying whether an attempt should be retried, given the
/// response and/or transport error.
pub trait RetryPolicy: fmt::Debug + Send + Sync {
    fn evaluate(
        &self,
        ctx: &CallContext,
        response: Option<&reqwest::Response>,
        error: Option<&Error>,
    ) -> RetryDecision;
}

/// Default policy.
///
/// Context cancellation is always fatal. Transport errors are transient
/// unless they match a permanent signature (redirect limit, bad URL scheme,
/// untrusted certificate). 429 and 5xx-except-501 responses are retried,
/// the latter surfacing an unexpected-status error once attempts run out;
/// every other status halts without an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn evaluate(
        &self,
        ctx: &CallContext,
        response: Option<&reqwest::Response>,
        error: Option<&Error>,
    ) -> RetryDecision {
        if let Some(ctx_err) = ctx.err() {
            return RetryDecision::HaltWith(ctx_err);
        }

        if let Some(err) = error {
            if is_permanent_failure(&err.message_chain()) {
                return RetryDecision::Halt;
            }
            // Likely recoverable (DNS, dial, timeout, reset).
            return RetryDecision::Retry;
        }

        if let Some(response) = response {
            let status = response.status().as_u16();

            if status == 429 {
                return RetryDecision::Retry;
            }

            if (500..=599).contains(&status) && status != 501 {
                let status_text = response
                    .status()
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_string();
                return RetryDecision::RetryWith(Error::new(ErrorKind::UnexpectedStatus {
                    status,
                    status_text,
                }));
            }
        }

        RetryDecision::Halt
    }
}

/// Whether a transport error message names a permanent failure.
fn is_permanent_failure(message: &str) -> bool {
    REDIRECT_RE.is_match(message)
        || SCHEME_RE.is_match(message)
        || UNTRUSTED_CERT_RE.is_match(message)
}
