//! Typed request/response calls over a [`Transport`].

use codec::Codec;
use protocol::{
    Error, ErrorKind, RequestHeaders, Result, SimpleResponse, Transport, TransportError, TypeName,
    ACCEPT, KRYO_BINARY_V1, OCTET_STREAM, X_SERIALIZER,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use transport::{ResilientTransport, TransportConfig};

/// Sends encoded values over a transport and decodes typed replies.
///
/// Every request carries `Accept: application/octet-stream` and
/// `X-Serializer: kryo-binary-v1` unless the caller's headers set those
/// names (in any case). A response counts as successful when its status is
/// in `200..=299`.
///
/// The client holds no per-call state; share it between threads behind an
/// `Arc` when the transport allows.
#[derive(Debug, Clone)]
pub struct RestClient<T = ResilientTransport> {
    codec: Codec,
    transport: T,
}

impl RestClient<ResilientTransport> {
    /// Builds a client over a [`ResilientTransport`] created from `config`
    /// with a default [`Codec`].
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `config` is invalid.
    pub fn from_config(config: TransportConfig) -> Result<Self> {
        Ok(Self::new(Codec::new(), ResilientTransport::new(config)?))
    }
}

impl<T: Transport> RestClient<T> {
    /// Creates a client from its collaborators.
    pub fn new(codec: Codec, transport: T) -> Self {
        Self { codec, transport }
    }

    /// The codec used for request and response bodies.
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Encodes `value`, POSTs it to `url` and returns the raw response
    /// whatever its status.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] if `value` cannot be encoded (nothing is
    /// sent); [`Error::Transport`] if the exchange fails.
    #[instrument(level = "debug", skip(self, value, headers), fields(request_type = %TypeName::of::<V>()))]
    pub fn post<V>(&self, url: &str, value: &V, headers: &RequestHeaders) -> Result<SimpleResponse>
    where
        V: Serialize + ?Sized,
    {
        let payload = self.codec.encode(value)?;
        let headers = headers.merged_over(&protocol_headers());
        let response = self.transport.post(url, payload.as_bytes(), &headers)?;
        debug!(status = response.status(), len = response.body().len(), "POST answered");
        Ok(response)
    }

    /// POSTs `value` and decodes a successful reply as `R`.
    ///
    /// # Errors
    ///
    /// As [`post`](Self::post), plus [`Error::Transport`] carrying the status
    /// and raw body for a non-2xx reply, and [`Error::Serialization`] naming
    /// `R` if the reply cannot be decoded.
    #[instrument(level = "debug", skip(self, value, headers), fields(response_type = %TypeName::of::<R>()))]
    pub fn post_and_decode<V, R>(&self, url: &str, value: &V, headers: &RequestHeaders) -> Result<R>
    where
        V: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.post(url, value, headers)?;
        self.decode_success(response)
    }

    /// GETs `url` and decodes a successful reply as `R`.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] if the exchange fails or the reply is not 2xx;
    /// [`Error::Serialization`] naming `R` if the reply cannot be decoded.
    #[instrument(level = "debug", skip(self, headers), fields(response_type = %TypeName::of::<R>()))]
    pub fn get_and_decode<R>(&self, url: &str, headers: &RequestHeaders) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let headers = headers.merged_over(&protocol_headers());
        let response = self.transport.get(url, &headers)?;
        debug!(status = response.status(), len = response.body().len(), "GET answered");
        self.decode_success(response)
    }

    fn decode_success<R: DeserializeOwned>(&self, response: SimpleResponse) -> Result<R> {
        if !response.is_success() {
            let status = response.status();
            return Err(TransportError::http_status(status, response.into_body()).into());
        }

        self.codec.decode::<R>(response.body()).map_err(|e| match e.kind() {
            ErrorKind::Serialization => e,
            ErrorKind::Validation | ErrorKind::Transport => {
                let type_name = TypeName::of::<R>();
                let message = format!("Failed to decode response as {type_name}");
                Error::serialization_with_source(type_name, message, e)
            }
        })
    }
}

/// Headers every request starts from; caller headers are laid over them.
fn protocol_headers() -> RequestHeaders {
    RequestHeaders::new()
        .with(ACCEPT, OCTET_STREAM)
        .with(X_SERIALIZER, KRYO_BINARY_V1.to_string())
}
