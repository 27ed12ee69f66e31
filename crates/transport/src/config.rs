//! Transport configuration.
//!
//! [`TransportConfig`] is a plain read-only value: build it once (through
//! [`TransportConfig::builder`] or by deserialising it from the caller's own
//! configuration file) and hand it to the transport. Durations are expressed
//! in milliseconds when (de)serialised; every field has a default.
//!
//! ```
//! use std::time::Duration;
//! use transport::TransportConfig;
//!
//! let config = TransportConfig::builder()
//!     .max_retries(5)
//!     .retry_delay(Duration::from_millis(250))
//!     .build();
//! assert_eq!(config.max_retries(), 5);
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use protocol::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of redirects followed when redirects are enabled.
pub const MAX_REDIRECTS: usize = 10;

/// HTTP protocol version preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersion {
    /// Speak HTTP/1.1 only.
    Http11,
    /// Prefer HTTP/2 where the server negotiates it, fall back to HTTP/1.1.
    #[default]
    Http2,
}

/// Immutable policy for the HTTP transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    #[serde(with = "millis")]
    connect_timeout: Duration,
    #[serde(with = "millis")]
    request_timeout: Duration,
    follow_redirects: bool,
    protocol_version: ProtocolVersion,
    max_retries: u32,
    #[serde(with = "millis")]
    retry_delay: Duration,
    default_headers: BTreeMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            follow_redirects: true,
            protocol_version: ProtocolVersion::default(),
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            default_headers: BTreeMap::new(),
        }
    }
}

impl TransportConfig {
    /// Starts a builder from the defaults.
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Maximum time to establish a connection.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Maximum time for a whole request/response exchange.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Whether 3xx responses are followed (up to [`MAX_REDIRECTS`]).
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Protocol version preference.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    /// Retries after the first attempt; `0` disables retry.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Base backoff unit, doubled for every further retry.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Headers sent with every attempt unless the caller sets the same name.
    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Checks the configuration before a transport is built from it.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if either timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::validation("connect_timeout must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::validation("request_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Enables or disables following redirects.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Sets the protocol version preference.
    pub fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.config.protocol_version = version;
        self
    }

    /// Sets the number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Sets the base backoff unit.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Adds a header sent with every attempt.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    /// Finishes the configuration. Validation happens when a transport is
    /// built from it.
    pub fn build(self) -> TransportConfig {
        self.config
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.follow_redirects());
        assert_eq!(config.protocol_version(), ProtocolVersion::Http2);
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(100));
        assert!(config.default_headers().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_every_field() {
        let config = TransportConfig::builder()
            .connect_timeout(Duration::from_secs(1))
            .request_timeout(Duration::from_secs(2))
            .follow_redirects(false)
            .protocol_version(ProtocolVersion::Http11)
            .max_retries(0)
            .retry_delay(Duration::from_millis(5))
            .default_header("User-Agent", "binrest-test")
            .build();

        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert!(!config.follow_redirects());
        assert_eq!(config.protocol_version(), ProtocolVersion::Http11);
        assert_eq!(config.max_retries(), 0);
        assert_eq!(config.retry_delay(), Duration::from_millis(5));
        assert_eq!(
            config.default_headers().get("User-Agent").map(String::as_str),
            Some("binrest-test")
        );
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let err = TransportConfig::builder()
            .connect_timeout(Duration::ZERO)
            .build()
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), protocol::ErrorKind::Validation);
        assert!(err.to_string().contains("connect_timeout"));

        let err = TransportConfig::builder()
            .request_timeout(Duration::ZERO)
            .build()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("request_timeout"));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: TransportConfig = serde_json::from_str(
            r#"{ "max_retries": 5, "retry_delay": 250, "protocol_version": "http11" }"#,
        )
        .unwrap();
        assert_eq!(config.max_retries(), 5);
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.protocol_version(), ProtocolVersion::Http11);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn json_round_trip_uses_milliseconds() {
        let config = TransportConfig::builder()
            .connect_timeout(Duration::from_millis(1500))
            .build();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["connect_timeout"], 1500);
        let back: TransportConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
