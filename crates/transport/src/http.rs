//! [`Transport`] over `reqwest`'s blocking client.

use std::time::Instant;

use protocol::{
    Error, HttpMethod, RequestHeaders, ResponseHeaders, Result, SimpleResponse, Transport,
    TransportError, TransportFailure, CONTENT_TYPE, OCTET_STREAM,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::config::{ProtocolVersion, TransportConfig, MAX_REDIRECTS};

/// Blocking HTTP transport.
///
/// Honours the connect timeout, request timeout, redirect policy and
/// protocol version of the [`TransportConfig`] it was built from. Retry and
/// interception are not done here; wrap it in a
/// [`ResilientTransport`](crate::ResilientTransport) for those.
///
/// The underlying client keeps its own connection pool and is safe to share
/// between threads.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport from `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an invalid config, [`Error::Transport`] if
    /// the HTTP client cannot be initialised (e.g. no TLS backend).
    pub fn new(config: &TransportConfig) -> Result<Self> {
        config.validate()?;

        let redirect = if config.follow_redirects() {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .redirect(redirect);
        if config.protocol_version() == ProtocolVersion::Http11 {
            builder = builder.http1_only();
        }

        let client = builder.build().map_err(|e| {
            Error::Transport(TransportError::with_source("Failed to build HTTP client", e))
        })?;
        Ok(Self { client })
    }

    fn send(
        &self,
        method: HttpMethod,
        url: &str,
        request: RequestBuilder,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        let started = Instant::now();
        let response = request.send().map_err(|e| failure_from(url, e))?;

        let status = response.status().as_u16();
        let headers = ResponseHeaders::from(response.headers().clone());
        let body = response.bytes().map_err(|e| failure_from(url, e))?.to_vec();

        debug!(
            %method,
            url,
            status,
            len = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "HTTP exchange complete"
        );
        Ok(SimpleResponse::new(status, headers, body))
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        let mut request = self.client.post(url).body(body.to_vec());
        if !headers.contains(CONTENT_TYPE) {
            request = request.header(CONTENT_TYPE, OCTET_STREAM);
        }
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        self.send(HttpMethod::Post, url, request)
    }

    fn get(
        &self,
        url: &str,
        headers: &RequestHeaders,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        let mut request = self.client.get(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        self.send(HttpMethod::Get, url, request)
    }
}

/// Maps a `reqwest` failure onto its transport category.
///
/// A timeout counts as a connect timeout only when `reqwest` also flags it
/// as a connect error.
fn failure_from(url: &str, error: reqwest::Error) -> TransportFailure {
    if error.is_connect() && error.is_timeout() {
        TransportFailure::connect_timeout(url, error)
    } else if error.is_connect() {
        TransportFailure::connect(url, error)
    } else if error.is_timeout() {
        TransportFailure::timeout(url, error)
    } else if error.is_body() || error.is_decode() || error.is_request() {
        TransportFailure::io(url, error)
    } else if error.is_builder() || error.is_redirect() {
        TransportFailure::Protocol {
            message: format!("invalid exchange with {url}"),
            source: Some(Box::new(error)),
        }
    } else {
        TransportFailure::Other {
            message: format!("request to {url} failed"),
            source: Some(Box::new(error)),
        }
    }
}
