//! Request and response interceptors.
//!
//! Interceptors run inside [`ResilientTransport`](crate::ResilientTransport)
//! once per attempt, in registration order, on the calling thread. A request
//! interceptor receives the in-flight [`HttpRequest`] just before dispatch; a
//! response interceptor receives each [`SimpleResponse`] just after it
//! arrives. Both return the (possibly modified) value they were given.
//!
//! Plain closures implement both traits:
//!
//! ```
//! use transport::{HttpRequest, InterceptorError};
//!
//! let add_auth = |request: HttpRequest| -> Result<HttpRequest, InterceptorError> {
//!     Ok(request.with_header("Authorization", "Bearer token"))
//! };
//! # let _ = add_auth;
//! ```

use protocol::{BoxError, HttpMethod, RequestHeaders, SimpleResponse, TransportFailure};
use thiserror::Error;

/// An outgoing request as seen by request interceptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: RequestHeaders,
    /// Encoded body; `None` for `GET`.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: RequestHeaders::new(),
            body: None,
        }
    }

    /// Returns this request with `name` set to `value`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns this request with `body` as its body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// Failure raised by an interceptor. Never retried.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InterceptorError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl InterceptorError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error that preserves `source` as its cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<InterceptorError> for TransportFailure {
    fn from(error: InterceptorError) -> Self {
        TransportFailure::Interceptor {
            message: error.message,
            source: error.source,
        }
    }
}

/// Transforms a request before it is dispatched.
pub trait RequestInterceptor: Send + Sync {
    /// Returns the request to send in place of `request`.
    fn intercept(&self, request: HttpRequest) -> Result<HttpRequest, InterceptorError>;
}

impl<F> RequestInterceptor for F
where
    F: Fn(HttpRequest) -> Result<HttpRequest, InterceptorError> + Send + Sync,
{
    fn intercept(&self, request: HttpRequest) -> Result<HttpRequest, InterceptorError> {
        self(request)
    }
}

/// Transforms a response after it is received.
pub trait ResponseInterceptor: Send + Sync {
    /// Returns the response to hand back in place of `response`.
    fn intercept(&self, response: SimpleResponse) -> Result<SimpleResponse, InterceptorError>;
}

impl<F> ResponseInterceptor for F
where
    F: Fn(SimpleResponse) -> Result<SimpleResponse, InterceptorError> + Send + Sync,
{
    fn intercept(&self, response: SimpleResponse) -> Result<SimpleResponse, InterceptorError> {
        self(response)
    }
}

#[cfg(test)]
mod tests {
    use protocol::ResponseHeaders;

    use super::*;

    #[test]
    fn closures_are_request_interceptors() {
        let interceptor = |r: HttpRequest| -> Result<HttpRequest, InterceptorError> {
            Ok(r.with_header("X-Trace", "abc"))
        };
        let request = HttpRequest::new(HttpMethod::Get, "http://h/");
        let out = RequestInterceptor::intercept(&interceptor, request).unwrap();
        assert_eq!(out.headers.get("x-trace"), Some("abc"));
        assert_eq!(out.url, "http://h/");
    }

    #[test]
    fn closures_are_response_interceptors() {
        let interceptor = |r: SimpleResponse| -> Result<SimpleResponse, InterceptorError> {
            Ok(r.with_status(299))
        };
        let response = SimpleResponse::new(200, ResponseHeaders::new(), b"x".to_vec());
        let out = ResponseInterceptor::intercept(&interceptor, response).unwrap();
        assert_eq!(out.status(), 299);
        assert_eq!(out.body(), b"x");
    }

    #[test]
    fn interceptor_errors_become_interceptor_failures() {
        let failure: TransportFailure = InterceptorError::new("token expired").into();
        assert!(matches!(
            failure,
            TransportFailure::Interceptor { ref message, .. } if message == "token expired"
        ));
    }
}
