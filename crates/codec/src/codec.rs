//! Typed encode/decode on top of a pooled serializer.

use protocol::{Error, Payload, Result, TypeName};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::{BinarySerializer, EngineError, HandleInUse, SerializerPool};

/// Converts typed values to and from binary payloads.
///
/// Cheap to clone and safe to share between threads: every thread encodes
/// and decodes through its own [`BinarySerializer`] taken from the pool, so
/// no lock is held around the engine.
#[derive(Debug, Clone)]
pub struct Codec {
    pool: SerializerPool<BinarySerializer>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// Creates a codec whose engines start with an empty type registry.
    pub fn new() -> Self {
        Self::with_pool(SerializerPool::new(|| Ok(BinarySerializer::new())))
    }

    /// Creates a codec whose engines are set up by `configure`, typically to
    /// register types:
    ///
    /// ```
    /// use codec::Codec;
    ///
    /// let codec = Codec::with_registrations(|engine| {
    ///     engine.register::<String>();
    ///     Ok(())
    /// });
    /// let payload = codec.encode(&"hi".to_string()).unwrap();
    /// assert_eq!(codec.decode::<String>(payload.as_bytes()).unwrap(), "hi");
    /// ```
    pub fn with_registrations(
        configure: impl Fn(&mut BinarySerializer) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::with_pool(SerializerPool::new(|| Ok(BinarySerializer::new())).with_configurator(configure))
    }

    /// Creates a codec over an existing pool.
    pub fn with_pool(pool: SerializerPool<BinarySerializer>) -> Self {
        Self { pool }
    }

    /// The pool this codec borrows engines from.
    pub fn pool(&self) -> &SerializerPool<BinarySerializer> {
        &self.pool
    }

    /// Encodes `value` into a non-empty payload.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] naming `T` if the engine fails, with the
    /// engine failure as cause. Pool factory failures are returned as-is.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Payload> {
        let type_name = TypeName::of::<T>();
        let handle = self.pool.borrow()?;
        let bytes = handle
            .with(|engine| engine.write(value))
            .map_err(|busy| in_use(&type_name, busy))?
            .map_err(|e| {
                Error::serialization_with_source(
                    type_name.clone(),
                    format!("Failed to serialize value of type {type_name}"),
                    e,
                )
            })?;

        if bytes.is_empty() {
            return Err(Error::serialization(
                type_name.clone(),
                format!("Serializing {type_name} produced an empty payload"),
            ));
        }

        debug!(type_name = %type_name, len = bytes.len(), "encoded payload");
        Ok(Payload::new(bytes))
    }

    /// Decodes `bytes` as a `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `bytes` is empty; the engine is not touched.
    /// - [`Error::Serialization`] naming `T` if the payload holds a different
    ///   type or cannot be read.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let expected = TypeName::of::<T>();
        if bytes.is_empty() {
            return Err(Error::validation(format!(
                "Cannot decode {expected}: payload is empty"
            )));
        }

        let handle = self.pool.borrow()?;
        let value = handle
            .with(|engine| {
                let actual = engine
                    .read_type(bytes)
                    .map_err(|e| decode_failed(&expected, e))?;
                if actual != expected {
                    return Err(Error::serialization(
                        expected.clone(),
                        format!("Type mismatch: expected {expected}, payload holds {actual}"),
                    ));
                }
                engine.read::<T>(bytes).map_err(|e| decode_failed(&expected, e))
            })
            .map_err(|busy| in_use(&expected, busy))??;

        debug!(type_name = %expected, len = bytes.len(), "decoded payload");
        Ok(value)
    }
}

fn decode_failed(expected: &TypeName, cause: EngineError) -> Error {
    Error::serialization_with_source(
        expected.clone(),
        format!("Failed to deserialize payload as {expected}"),
        cause,
    )
}

fn in_use(type_name: &TypeName, busy: HandleInUse) -> Error {
    Error::serialization_with_source(
        type_name.clone(),
        format!("Cannot serialize {type_name} re-entrantly"),
        busy,
    )
}
