//! Error types for courier-http.

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this is a context error (cancellation or deadline).
    pub fn is_context(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Cancelled | ErrorKind::DeadlineExceeded
        )
    }

    /// Returns true if this is a transport-level failure (connect, TLS,
    /// read/write, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Timeout | ErrorKind::Connection(_) | ErrorKind::Transport(_)
        )
    }

    /// Returns true if this error was synthesized by the retry policy.
    pub fn is_policy(&self) -> bool {
        matches!(self.kind, ErrorKind::UnexpectedStatus { .. })
    }

    /// Render the error together with its full source chain.
    ///
    /// The retry policy matches permanent-failure signatures against this
    /// string, since the interesting detail ("too many redirects", an
    /// untrusted certificate) often lives several sources deep.
    pub fn message_chain(&self) -> String {
        let mut message = self.kind.to_string();
        let mut source = self
            .source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error));
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The call context was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// The call context deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// An attempt timed out (connect or response-header timeout).
    #[error("request timeout")]
    Timeout,

    /// Failed to establish a connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other transport-level failure (TLS, read/write, redirects).
    #[error("transport error: {0}")]
    Transport(String),

    /// Retries exhausted against a retryable-but-failing status.
    #[error("unexpected HTTP status {status} {status_text}")]
    UnexpectedStatus { status: u16, status_text: String },

    /// Payload encoding failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Payload decoding failure.
    #[error("decode error: {0}")]
    Decode(String),

    /// Request attributes that cannot be turned into a transport request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport construction failure.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection(err.to_string())
        } else {
            ErrorKind::Transport(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Decode(err.to_string()), err)
    }
}
