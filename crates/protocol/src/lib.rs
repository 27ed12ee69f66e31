//! Shared domain for binrest.
//!
//! This crate contains the value types exchanged between the codec, the
//! transports and the REST client, the error taxonomy every public operation
//! reports through, and the [`Transport`] port trait. Infrastructure crates
//! implement the trait defined here; they never add protocol rules.
//!
//! ## Architectural Layer
//!
//! **Domain types + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a transport must provide; the `transport` crate defines
//! *how* it is supplied over HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`TypeName`) |
//! | [`types`] | Shared value types (`Payload`, `SimpleResponse`, headers, `WireFormat`) |
//! | [`errors`] | Error taxonomy and retry-policy types |
//! | [`transport`] | The synchronous [`Transport`] port |

pub mod errors;
pub mod identifiers;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{BoxError, Error, ErrorKind, Result, RetryPolicy, TransportError, TransportFailure};
pub use identifiers::TypeName;
pub use http::header::{HeaderMap, HeaderName, HeaderValue};
pub use transport::Transport;
pub use types::{
    body_snippet, HttpMethod, Payload, RequestHeaders, ResponseHeaders, SimpleResponse, WireFormat,
    ACCEPT, CONTENT_TYPE, KRYO_BINARY_V1, OCTET_STREAM, SNIPPET_LIMIT, X_SERIALIZER,
};
