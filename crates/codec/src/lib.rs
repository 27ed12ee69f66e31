//! binrest pooled codec.
//!
//! Turns typed values into binary [`protocol::Payload`]s and back. The
//! underlying [`BinarySerializer`] is stateful and not thread-safe, so it is
//! never shared: a [`SerializerPool`] gives every calling thread its own
//! long-lived instance, and the [`Codec`] borrows that instance for each call.
//!
//! ## Architectural Layer
//!
//! **Infrastructure (no I/O).** Byte-level encoding is delegated to
//! `rmp-serde`; this crate owns the per-thread instance management, the
//! runtime type tag check, and the mapping of engine failures onto
//! [`protocol::Error`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`engine`] | `BinarySerializer`, `TypeRegistry`, `EngineError` |
//! | [`pool`] | `SerializerPool`, `SerializerHandle` |
//! | [`codec`] | `Codec` |

pub mod codec;
pub mod engine;
pub mod pool;

pub use codec::Codec;
pub use engine::{BinarySerializer, EngineError, TypeRegistry};
pub use pool::{HandleInUse, SerializerHandle, SerializerPool};
