//! The synchronous HTTP port.
//!
//! [`Transport`] is the minimal primitive the REST client depends on. It
//! carries no retry or interception behaviour; the `transport` crate layers
//! those on top by decorating another implementation.

use std::sync::Arc;

use crate::{RequestHeaders, SimpleResponse, TransportFailure};

/// A blocking HTTP request executor.
///
/// Implementations must surface the peer's exact status code, body bytes and
/// headers without alteration, and must be safe to call from several threads
/// at once.
pub trait Transport: Send + Sync {
    /// Sends `body` to `url` with a `POST` request.
    fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> Result<SimpleResponse, TransportFailure>;

    /// Fetches `url` with a `GET` request.
    fn get(&self, url: &str, headers: &RequestHeaders) -> Result<SimpleResponse, TransportFailure>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> Result<SimpleResponse, TransportFailure> {
        (**self).post(url, body, headers)
    }

    fn get(&self, url: &str, headers: &RequestHeaders) -> Result<SimpleResponse, TransportFailure> {
        (**self).get(url, headers)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> Result<SimpleResponse, TransportFailure> {
        (**self).post(url, body, headers)
    }

    fn get(&self, url: &str, headers: &RequestHeaders) -> Result<SimpleResponse, TransportFailure> {
        (**self).get(url, headers)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(
        &self,
        url: &str,
        body: &[u8],
        headers: &RequestHeaders,
    ) -> Result<SimpleResponse, TransportFailure> {
        (**self).post(url, body, headers)
    }

    fn get(&self, url: &str, headers: &RequestHeaders) -> Result<SimpleResponse, TransportFailure> {
        (**self).get(url, headers)
    }
}
