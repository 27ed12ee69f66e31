//! Error taxonomy and retry-policy types for binrest.
//!
//! [`Error`] is returned by every public operation in the workspace. It has
//! exactly three kinds (see [`ErrorKind`]):
//!
//! - **Validation**: the caller supplied structurally invalid input; raised
//!   before any I/O or decode attempt.
//! - **Serialization**: encoding or decoding failed, or the decoded type did
//!   not match the expected one.
//! - **Transport**: the HTTP exchange failed, or it succeeded with a non-2xx
//!   status.
//!
//! [`TransportFailure`] is the lower-level, categorised failure reported by a
//! [`crate::Transport`]. Retry decisions are made on it (see [`RetryPolicy`])
//! and it is normalised into a [`TransportError`] once no retry remains.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{body_snippet, TypeName};

/// Boxed error used as the preserved cause of a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failure is safe to retry and, if so, after what delay.
///
/// Produced by the retry classifier in the `transport` crate.
///
/// ## Rules
///
/// - `Retryable`: the connection could not be established (refused, reset
///   during connect, connect timeout).
/// - `NonRetryable`: anything that happened once bytes were in flight, and
///   any failure raised by an interceptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Structurally invalid input.
    Validation,
    /// Encode/decode failure or type mismatch.
    Serialization,
    /// HTTP exchange failure or non-2xx status.
    Transport,
}

/// Errors reported by the codec, the transports and the REST client.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller supplied structurally invalid input.
    ///
    /// Produced by: empty decode buffer, invalid transport configuration.
    #[error("{message}")]
    Validation {
        /// Human-readable description of the problem.
        message: String,
    },

    /// Encoding or decoding failed, or the decoded type did not match.
    #[error("{message}")]
    Serialization {
        /// Human-readable description of the problem.
        message: String,
        /// The source type (encode) or expected type (decode).
        type_name: TypeName,
        /// The underlying failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The HTTP exchange failed or returned a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Creates a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a [`Error::Serialization`] without a cause.
    pub fn serialization(type_name: TypeName, message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            type_name,
            source: None,
        }
    }

    /// Creates a [`Error::Serialization`] that preserves `source` as its cause.
    pub fn serialization_with_source(
        type_name: TypeName,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            type_name,
            source: Some(source.into()),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Returns the type name carried by a serialization error.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Self::Serialization { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Returns the HTTP status carried by a transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the transport error, if this is one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportFailure> for Error {
    fn from(failure: TransportFailure) -> Self {
        Self::Transport(failure.into())
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// A normalised transport-level failure.
///
/// Carries the HTTP status and raw response body when the exchange completed
/// with a non-2xx status, and the underlying failure when it did not.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    status: Option<u16>,
    body: Option<Vec<u8>>,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Creates a transport error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
            source: None,
        }
    }

    /// Creates a transport error that preserves `source` as its cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
            source: Some(source.into()),
        }
    }

    /// Creates the error for a completed exchange with a non-2xx `status`.
    ///
    /// The message embeds the status and a printable snippet of `body`; the
    /// raw bytes are kept unchanged for programmatic use.
    pub fn http_status(status: u16, body: Vec<u8>) -> Self {
        Self {
            message: format!("HTTP {status}: {}", body_snippet(&body)),
            status: Some(status),
            body: Some(body),
            source: None,
        }
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the exchange completed.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the raw response body, if the exchange completed.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Categorised failure reported by a [`crate::Transport`].
///
/// The category decides retryability; see `transport::retry::classify`.
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// The connection could not be established.
    #[error("could not connect to {url}")]
    Connect {
        /// Target URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// Establishing the connection took longer than the connect timeout.
    #[error("timed out connecting to {url}")]
    ConnectTimeout {
        /// Target URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// The request/response exchange exceeded the request timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Target URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// Reading or writing failed after the connection was established.
    #[error("I/O failure while exchanging with {url}")]
    Io {
        /// Target URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// The peer or the request violated HTTP (bad URL, redirect loop, ...).
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
        /// Underlying failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A request or response interceptor failed.
    #[error("interceptor failed: {message}")]
    Interceptor {
        /// Description supplied by the interceptor.
        message: String,
        /// Underlying failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A failure that was already normalised; passes through unchanged.
    #[error(transparent)]
    Transport(TransportError),

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Description of the failure.
        message: String,
        /// Underlying failure, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl TransportFailure {
    /// Creates a [`TransportFailure::Connect`].
    pub fn connect(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connect {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a [`TransportFailure::ConnectTimeout`].
    pub fn connect_timeout(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ConnectTimeout {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a [`TransportFailure::Timeout`].
    pub fn timeout(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Timeout {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a [`TransportFailure::Io`].
    pub fn io(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Io {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a [`TransportFailure::Interceptor`] without a cause.
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::Interceptor {
            message: message.into(),
            source: None,
        }
    }
}

impl From<TransportError> for TransportFailure {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<TransportFailure> for TransportError {
    fn from(failure: TransportFailure) -> Self {
        let message = match failure {
            TransportFailure::Transport(error) => return error,
            TransportFailure::Connect { .. } => format!("Connection failed: {failure}"),
            TransportFailure::ConnectTimeout { .. } | TransportFailure::Timeout { .. } => {
                format!("Request timed out: {failure}")
            }
            TransportFailure::Io { .. } => format!("I/O error: {failure}"),
            TransportFailure::Protocol { .. }
            | TransportFailure::Interceptor { .. }
            | TransportFailure::Other { .. } => format!("Request failed: {failure}"),
        };
        Self::with_source(message, failure)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    fn refused() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")
    }

    #[test]
    fn http_status_keeps_raw_body_and_embeds_snippet() {
        let error = TransportError::http_status(400, b"bad request".to_vec());
        assert_eq!(error.status(), Some(400));
        assert_eq!(error.body(), Some(&b"bad request"[..]));
        assert_eq!(error.message(), "HTTP 400: bad request");
    }

    #[test]
    fn normalising_a_connect_failure_preserves_the_cause() {
        let error: TransportError = TransportFailure::connect("http://localhost:1", refused()).into();
        assert!(error.message().starts_with("Connection failed"));
        assert!(error.status().is_none());

        let cause = error.source().expect("cause preserved");
        assert!(cause.downcast_ref::<TransportFailure>().is_some());
    }

    #[test]
    fn normalising_a_timeout_names_the_category() {
        let error: TransportError = TransportFailure::timeout("http://x", refused()).into();
        assert!(error.message().starts_with("Request timed out"));
    }

    #[test]
    fn already_normalised_errors_pass_through_unchanged() {
        let original = TransportError::http_status(503, b"busy".to_vec());
        let failure = TransportFailure::from(original);
        let error: TransportError = failure.into();
        assert_eq!(error.status(), Some(503));
        assert_eq!(error.message(), "HTTP 503: busy");
        assert!(error.source().is_none());
    }

    #[test]
    fn error_kind_and_accessors() {
        let validation = Error::validation("payload is empty");
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert!(validation.type_name().is_none());

        let serialization = Error::serialization(TypeName::of::<u32>(), "boom");
        assert_eq!(serialization.kind(), ErrorKind::Serialization);
        assert_eq!(serialization.type_name(), Some(&TypeName::of::<u32>()));

        let transport = Error::from(TransportError::http_status(404, Vec::new()));
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert_eq!(transport.status(), Some(404));
    }

    #[test]
    fn retry_policy_round_trips_through_json() {
        let policy = RetryPolicy::Retryable {
            after: Some(Duration::from_millis(250)),
        };
        let json = serde_json::to_string(&policy).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
        assert!(back.is_retryable());
        assert!(!RetryPolicy::NonRetryable.is_retryable());
    }
}
