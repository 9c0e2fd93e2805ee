//! Client configuration.
//!
//! `ClientConfig` is an explicit struct with chainable `with_*` options; each
//! option is a pure function over the struct and the order of calls does not
//! matter, except that header options accumulate rather than replace. Once a
//! client is built from it, the configuration is never mutated again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{BackoffStrategy, ExponentialBackoff};
use crate::request::{get_header, set_header};
use crate::retry::{DefaultRetryPolicy, RetryPolicy};
use crate::HEADER_USER_AGENT;

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default timeout for waiting on response headers.
pub const DEFAULT_RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default minimum wait between attempts.
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_secs(1);

/// Default maximum wait between attempts.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

/// Default attempt bound: one attempt, no retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Default headers sent with every request. Per-request headers override
    /// these on key collision.
    pub headers: HashMap<String, String>,
    /// Connection timeout; `None` falls back to the default unless timeouts
    /// are disabled.
    pub connect_timeout: Option<Duration>,
    /// Response-header timeout; `None` falls back to the default unless
    /// timeouts are disabled.
    pub response_header_timeout: Option<Duration>,
    /// Disable all transport timeouts.
    pub disable_timeouts: bool,
    /// Minimum wait between attempts.
    pub min_wait: Duration,
    /// Maximum wait between attempts.
    pub max_wait: Duration,
    /// Attempt bound, counting the first try. `1` means no retry.
    pub max_attempts: u32,
    /// Strategy computing the wait between attempts.
    pub backoff: Arc<dyn BackoffStrategy>,
    /// Policy classifying whether an attempt outcome should be retried.
    pub retry_policy: Arc<dyn RetryPolicy>,
    /// Optional mutual-TLS material.
    pub tls: Option<TlsMaterial>,
    /// Caller-supplied transport, used as-is instead of building one.
    pub transport: Option<reqwest::Client>,
    /// Gate for the verbose per-attempt log lines.
    pub enable_tracing: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            connect_timeout: None,
            response_header_timeout: None,
            disable_timeouts: false,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Arc::new(ExponentialBackoff),
            retry_policy: Arc::new(DefaultRetryPolicy),
            tls: None,
            transport: None,
            enable_tracing: true,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `headers` into the default headers. Later writes win per key
    /// (case-insensitively); distinct keys accumulate across calls.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        for (name, value) in headers {
            set_header(&mut self.headers, &name, &value);
        }
        self
    }

    /// Set a single default header, replacing any existing value for the key.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, &name.into(), &value.into());
        self
    }

    /// Set the `User-Agent` default header, unless one is already present.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        if get_header(&self.headers, HEADER_USER_AGENT).is_none() {
            set_header(&mut self.headers, HEADER_USER_AGENT, &user_agent.into());
        }
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the response-header timeout.
    pub fn with_response_header_timeout(mut self, timeout: Duration) -> Self {
        self.response_header_timeout = Some(timeout);
        self
    }

    /// Disable or re-enable transport timeouts.
    pub fn with_timeouts_disabled(mut self, disable: bool) -> Self {
        self.disable_timeouts = disable;
        self
    }

    /// Set the minimum wait between attempts.
    pub fn with_min_wait(mut self, wait: Duration) -> Self {
        self.min_wait = wait;
        self
    }

    /// Set the maximum wait between attempts.
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Set the attempt bound, counting the first try.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: impl BackoffStrategy + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    /// Set the mutual-TLS material.
    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Supply the underlying transport instead of building one lazily.
    pub fn with_transport(mut self, transport: reqwest::Client) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Enable or disable the verbose per-attempt log lines.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Resolved connection timeout: explicit value, else the default, else
    /// `None` when timeouts are disabled.
    pub fn connection_timeout(&self) -> Option<Duration> {
        if let Some(timeout) = self.connect_timeout {
            return Some(timeout);
        }
        if self.disable_timeouts {
            return None;
        }
        Some(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Resolved response-header timeout, with the same fallback rules as
    /// [`connection_timeout`](Self::connection_timeout).
    pub fn response_timeout(&self) -> Option<Duration> {
        if let Some(timeout) = self.response_header_timeout {
            return Some(timeout);
        }
        if self.disable_timeouts {
            return None;
        }
        Some(DEFAULT_RESPONSE_HEADER_TIMEOUT)
    }

    /// Overall per-attempt timeout: connection + response timeouts summed.
    pub fn total_timeout(&self) -> Option<Duration> {
        match (self.connection_timeout(), self.response_timeout()) {
            (Some(connect), Some(response)) => Some(connect + response),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }
}

/// Mutual-TLS material: client certificate/key paths and a CA bundle.
///
/// Absence disables mutual TLS without error; malformed material is skipped
/// at transport construction rather than failing the build.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    /// Path to the PEM-encoded client certificate.
    pub cert_path: PathBuf,
    /// Path to the PEM-encoded private key.
    pub key_path: PathBuf,
    /// PEM bytes of the CA bundle used to verify the peer.
    pub ca_bundle: Vec<u8>,
}

impl TlsMaterial {
    /// Create TLS material from certificate and key paths.
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            ca_bundle: Vec::new(),
        }
    }

    /// Attach the CA bundle (PEM bytes).
    pub fn with_ca_bundle(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_bundle = pem.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.min_wait, Duration::from_secs(1));
        assert_eq!(config.max_wait, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.connection_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.response_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.total_timeout(), Some(Duration::from_secs(7)));
        assert!(config.headers.is_empty());
        assert!(config.tls.is_none());
        assert!(config.transport.is_none());
    }

    #[test]
    fn test_options_chain_in_any_order() {
        let config = ClientConfig::new()
            .with_max_attempts(3)
            .with_connect_timeout(Duration::from_secs(1))
            .with_min_wait(Duration::from_millis(100))
            .with_response_header_timeout(Duration::from_secs(4));

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.min_wait, Duration::from_millis(100));
        assert_eq!(config.connection_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(config.response_timeout(), Some(Duration::from_secs(4)));
        assert_eq!(config.total_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_disabled_timeouts() {
        let config = ClientConfig::new().with_timeouts_disabled(true);
        assert_eq!(config.connection_timeout(), None);
        assert_eq!(config.response_timeout(), None);
        assert_eq!(config.total_timeout(), None);

        // An explicit value still wins over the disable flag.
        let config = config.with_connect_timeout(Duration::from_secs(9));
        assert_eq!(config.connection_timeout(), Some(Duration::from_secs(9)));
        assert_eq!(config.total_timeout(), Some(Duration::from_secs(9)));
    }

    #[test]
    fn test_header_accumulation_last_write_wins() {
        let mut first = HashMap::new();
        first.insert("X-Token".to_string(), "a".to_string());
        let mut second = HashMap::new();
        second.insert("x-token".to_string(), "b".to_string());
        second.insert("X-Extra".to_string(), "1".to_string());

        let config = ClientConfig::new().with_headers(first).with_headers(second);

        assert_eq!(config.headers.len(), 2);
        assert_eq!(get_header(&config.headers, "X-Token"), Some("b"));
        assert_eq!(get_header(&config.headers, "X-Extra"), Some("1"));
    }

    #[test]
    fn test_user_agent_set_only_if_absent() {
        let config = ClientConfig::new()
            .with_header("User-Agent", "custom/1.0")
            .with_user_agent("default/0.1");
        assert_eq!(get_header(&config.headers, "user-agent"), Some("custom/1.0"));

        let config = ClientConfig::new().with_user_agent("default/0.1");
        assert_eq!(get_header(&config.headers, "User-Agent"), Some("default/0.1"));
    }

    #[test]
    fn test_tls_material() {
        let tls = TlsMaterial::new("/etc/ssl/client.crt", "/etc/ssl/client.key")
            .with_ca_bundle(b"-----BEGIN CERTIFICATE-----".to_vec());
        assert_eq!(tls.cert_path, PathBuf::from("/etc/ssl/client.crt"));
        assert!(!tls.ca_bundle.is_empty());
    }
}
