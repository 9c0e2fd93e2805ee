//! Call-scoped cancellation and deadline handling.
//!
//! A [`CallContext`] bounds one logical request: the deadline covers every
//! attempt and every backoff sleep, and cancellation always wins over a
//! pending retry. Clones share the same cancellation state, so a caller can
//! keep one clone and cancel a `do_req` that is in flight on another task.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind, Result};

/// Cancellation token plus optional deadline for a single logical request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never cancels and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the whole call (all attempts and sleeps) by `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Bound the whole call by an absolute deadline.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Cancel the call. Visible to every clone of this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns the context error if the context is already done.
    ///
    /// Cancellation takes precedence over an elapsed deadline.
    pub fn err(&self) -> Option<Error> {
        if self.cancel.is_cancelled() {
            return Some(Error::new(ErrorKind::Cancelled));
        }
        if matches!(self.deadline, Some(d) if d <= Instant::now()) {
            return Some(Error::new(ErrorKind::DeadlineExceeded));
        }
        None
    }

    /// Returns true if the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Sleep for `wait`, aborting early with a context error on
    /// cancellation or deadline expiry. Whichever occurs first wins.
    pub async fn sleep(&self, wait: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::new(ErrorKind::Cancelled)),
            _ = self.deadline_elapsed() => Err(Error::new(ErrorKind::DeadlineExceeded)),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    /// Drive `fut` to completion unless the context finishes first.
    pub async fn run<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::new(ErrorKind::Cancelled)),
            _ = self.deadline_elapsed() => Err(Error::new(ErrorKind::DeadlineExceeded)),
            out = fut => out,
        }
    }

    async fn deadline_elapsed(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
