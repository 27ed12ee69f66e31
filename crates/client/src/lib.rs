//! binrest REST client.
//!
//! [`RestClient`] composes a [`codec::Codec`] with a [`protocol::Transport`]:
//! it encodes the request value, adds the binary protocol headers, sends the
//! request, checks the status and decodes the typed reply. Every failure is
//! reported as a [`protocol::Error`].
//!
//! ```no_run
//! use client::RestClient;
//! use protocol::RequestHeaders;
//! use transport::TransportConfig;
//!
//! # fn main() -> protocol::Result<()> {
//! let client = RestClient::from_config(TransportConfig::default())?;
//! let greeting: String =
//!     client.post_and_decode("http://localhost:8080/greet", &"world".to_string(), &RequestHeaders::new())?;
//! # let _ = greeting;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architectural Layer
//!
//! **Application.** Owns no I/O of its own; retry, interception and
//! timeouts belong to the transport it is given.

pub mod rest_client;

pub use rest_client::RestClient;
