//! Retrying, intercepting transport decorator.
//!
//! ## Attempt loop
//!
//! ```text
//!            +-----------+  ok   +---------+
//!  start --> |  ATTEMPT  | ----> | SUCCESS |
//!            +-----------+       +---------+
//!              ^      | failure
//!              |      v
//!   +------------+   retryable and retries < max_retries?
//!   | RETRY_WAIT | <-- yes          | no
//!   +------------+                  v
//!                               +--------+
//!                               | FAILED |  normalised TransportError
//!                               +--------+
//! ```
//!
//! `max_retries` counts retries, not attempts: a call makes at most
//! `max_retries + 1` attempts and waits `retry_delay * 2^(n-1)` before retry
//! `n`.

use std::sync::Arc;

use protocol::{
    HttpMethod, RequestHeaders, Result, RetryPolicy, SimpleResponse, Transport, TransportError,
    TransportFailure, CONTENT_TYPE, OCTET_STREAM,
};
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::http::HttpTransport;
use crate::interceptor::{HttpRequest, RequestInterceptor, ResponseInterceptor};
use crate::retry::{backoff_delay, classify, Sleeper, ThreadSleeper};

/// Decorates a base [`Transport`] with default headers, interceptors and
/// bounded exponential-backoff retry.
///
/// Every failure that leaves this transport is a
/// [`TransportFailure::Transport`] holding the normalised error.
pub struct ResilientTransport<T = HttpTransport> {
    base: T,
    config: TransportConfig,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientTransport<HttpTransport> {
    /// Starts a builder with the default configuration and no interceptors.
    pub fn builder() -> ResilientTransportBuilder {
        ResilientTransportBuilder::default()
    }

    /// Builds a transport over a fresh [`HttpTransport`] using `config`.
    pub fn new(config: TransportConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }
}

impl<T> ResilientTransport<T> {
    /// The configuration this transport was built with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The decorated transport.
    pub fn base(&self) -> &T {
        &self.base
    }
}

impl<T: Transport> ResilientTransport<T> {
    fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        let max_retries = self.config.max_retries();
        let mut retries = 0u32;
        loop {
            let failure = match self.attempt(method, url, body, headers) {
                Ok(response) => {
                    debug!(%method, url, retries, status = response.status(), "transport call succeeded");
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            match classify(&failure) {
                RetryPolicy::Retryable { after } if retries < max_retries => {
                    retries += 1;
                    let backoff = backoff_delay(self.config.retry_delay(), retries);
                    let delay = after.map_or(backoff, |min| backoff.max(min));
                    warn!(
                        %method,
                        url,
                        attempt = retries,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "transient transport failure, retrying"
                    );
                    self.sleeper.sleep(delay);
                }
                policy => {
                    warn!(
                        %method,
                        url,
                        attempts = retries + 1,
                        retryable = policy.is_retryable(),
                        error = %failure,
                        "transport call failed"
                    );
                    return Err(TransportFailure::Transport(TransportError::from(failure)));
                }
            }
        }
    }

    /// One interceptor-wrapped exchange with the base transport.
    fn attempt(
        &self,
        method: HttpMethod,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        let mut request = HttpRequest::new(method, url);
        for (name, value) in self.config.default_headers() {
            request.headers.insert(name.as_str(), value.as_str());
        }
        for (name, value) in headers.iter() {
            request.headers.insert(name, value);
        }
        if method == HttpMethod::Post {
            request.headers.insert_if_absent(CONTENT_TYPE, OCTET_STREAM);
            request.body = Some(body.to_vec());
        }

        for interceptor in &self.request_interceptors {
            request = interceptor.intercept(request)?;
        }

        let mut response = match request.method {
            HttpMethod::Post => {
                let body = request.body.as_deref().unwrap_or(&[]);
                self.base.post(&request.url, body, &request.headers)?
            }
            HttpMethod::Get => self.base.get(&request.url, &request.headers)?,
        };

        for interceptor in &self.response_interceptors {
            response = interceptor.intercept(response)?;
        }
        Ok(response)
    }
}

impl<T: Transport> Transport for ResilientTransport<T> {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        self.execute(HttpMethod::Post, url, body, headers)
    }

    fn get(
        &self,
        url: &str,
        headers: &RequestHeaders,
    ) -> std::result::Result<SimpleResponse, TransportFailure> {
        self.execute(HttpMethod::Get, url, &[], headers)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResilientTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("base", &self.base)
            .field("config", &self.config)
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish()
    }
}

/// Builder for [`ResilientTransport`].
pub struct ResilientTransportBuilder {
    config: TransportConfig,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for ResilientTransportBuilder {
    fn default() -> Self {
        Self {
            config: TransportConfig::default(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            sleeper: Arc::new(ThreadSleeper),
        }
    }
}

impl ResilientTransportBuilder {
    /// Sets the configuration.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends a request interceptor; interceptors run in the order added.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends a response interceptor; interceptors run in the order added.
    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Replaces the backoff sleeper (defaults to [`ThreadSleeper`]).
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Builds over an [`HttpTransport`] configured from the same config.
    pub fn build(self) -> Result<ResilientTransport<HttpTransport>> {
        let base = HttpTransport::new(&self.config)?;
        self.build_with(base)
    }

    /// Builds over `base`. The config's timeouts, redirect and protocol
    /// settings only apply if `base` was built from them.
    pub fn build_with<T: Transport>(self, base: T) -> Result<ResilientTransport<T>> {
        self.config.validate()?;
        Ok(ResilientTransport {
            base,
            config: self.config,
            request_interceptors: self.request_interceptors,
            response_interceptors: self.response_interceptors,
            sleeper: self.sleeper,
        })
    }
}

impl std::fmt::Debug for ResilientTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientTransportBuilder")
            .field("config", &self.config)
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish()
    }
}
