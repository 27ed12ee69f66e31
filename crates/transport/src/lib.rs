//! binrest HTTP transports.
//!
//! Two implementations of [`protocol::Transport`]:
//!
//! - [`HttpTransport`] performs one blocking HTTP exchange per call through
//!   `reqwest`, honouring the timeouts, redirect policy and protocol version
//!   of a [`TransportConfig`].
//! - [`ResilientTransport`] decorates any `Transport` with default headers,
//!   request/response interceptors and bounded exponential-backoff retry of
//!   connection-establishment failures.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This is the only crate that performs network I/O.
//! Callers depend on the [`protocol::Transport`] trait, so tests can swap in
//! an in-memory transport without touching this crate.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | `TransportConfig`, `ProtocolVersion` |
//! | [`http`] | `HttpTransport` |
//! | [`interceptor`] | `HttpRequest`, request/response interceptor traits |
//! | [`retry`] | failure classification, backoff, `Sleeper` |
//! | [`resilient`] | `ResilientTransport` and its builder |

pub mod config;
pub mod http;
pub mod interceptor;
pub mod resilient;
pub mod retry;

pub use config::{ProtocolVersion, TransportConfig, TransportConfigBuilder, MAX_REDIRECTS};
pub use http::HttpTransport;
pub use interceptor::{HttpRequest, InterceptorError, RequestInterceptor, ResponseInterceptor};
pub use resilient::{ResilientTransport, ResilientTransportBuilder};
pub use retry::{backoff_delay, classify, Sleeper, ThreadSleeper};
