//! The binary serializer engine.
//!
//! [`BinarySerializer`] writes a value as a two-field envelope: a runtime type
//! tag followed by the value itself, both as MessagePack with named struct
//! fields. Named fields make the format tolerant of schema drift: a receiver
//! whose struct has extra optional fields, or fewer fields, than the sender
//! still decodes.
//!
//! An engine instance is stateful (type registry, size hint) and deliberately
//! `!Sync`; share it across threads through a
//! [`SerializerPool`](crate::SerializerPool), never directly.

use std::cell::Cell;
use std::collections::HashMap;
use std::marker::PhantomData;

use protocol::TypeName;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Initial output capacity before the engine has seen any payload.
const INITIAL_SIZE_HINT: usize = 64;

/// Failure inside the serializer engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The value could not be written.
    #[error("encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The bytes could not be read as the requested shape.
    #[error("decoding failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The payload's numeric type tag is not in this engine's registry.
    #[error("type id {0} is not registered")]
    UnknownTypeId(u32),

    /// The payload's type tag is an empty name.
    #[error("payload carries an empty type tag")]
    EmptyTag,
}

/// Runtime type tag written in front of every value.
///
/// Registered types travel as their compact id, everything else as its full
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum Tag {
    Id(u32),
    Name(String),
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T: ?Sized> {
    tag: Tag,
    value: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHead {
    tag: Tag,
}

#[derive(Deserialize)]
struct EnvelopeBody<T> {
    value: T,
}

/// Maps registered types to their wire tags and back.
///
/// A type registered with [`register`](Self::register) travels as a compact
/// numeric id. Ids are assigned in registration order starting at `0`, so two
/// engines interoperate on them only when both register the same types in
/// the same order.
///
/// A type registered with [`register_as`](Self::register_as) travels under a
/// caller-chosen wire name. Wire names do not depend on the Rust path or the
/// compiler, so peers built separately, or holding different Rust types for
/// the same message, agree on a type by using the same name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_name: HashMap<TypeName, u32>,
    by_id: Vec<TypeName>,
    wire_of: HashMap<TypeName, String>,
    by_wire: HashMap<String, TypeName>,
}

impl TypeRegistry {
    /// Registers `name`, returning its id. Re-registering returns the
    /// existing id.
    pub fn register(&mut self, name: TypeName) -> u32 {
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let id = self.by_id.len() as u32;
        self.by_id.push(name.clone());
        self.by_name.insert(name, id);
        id
    }

    /// Registers `name` under the stable wire name `wire`.
    ///
    /// A later registration replaces an earlier one for the same type or the
    /// same wire name.
    pub fn register_as(&mut self, name: TypeName, wire: impl Into<String>) {
        let wire = wire.into();
        if let Some(previous) = self.wire_of.remove(&name) {
            self.by_wire.remove(&previous);
        }
        if let Some(previous) = self.by_wire.remove(&wire) {
            self.wire_of.remove(&previous);
        }
        self.wire_of.insert(name.clone(), wire.clone());
        self.by_wire.insert(wire, name);
    }

    /// Returns the id registered for `name`.
    pub fn id_of(&self, name: &TypeName) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// Returns the name registered under `id`.
    pub fn name_of(&self, id: u32) -> Option<&TypeName> {
        self.by_id.get(id as usize)
    }

    /// Returns the wire name registered for `name`.
    pub fn wire_name_of(&self, name: &TypeName) -> Option<&str> {
        self.wire_of.get(name).map(String::as_str)
    }

    /// Returns the type registered under the wire name `wire`.
    pub fn name_for_wire(&self, wire: &str) -> Option<&TypeName> {
        self.by_wire.get(wire)
    }

    /// Number of registered types, by id or by wire name.
    pub fn len(&self) -> usize {
        self.by_id.len() + self.wire_of.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.wire_of.is_empty()
    }
}

/// A stateful, non-thread-safe binary serializer.
#[derive(Debug)]
pub struct BinarySerializer {
    registry: TypeRegistry,
    size_hint: usize,
    _not_sync: PhantomData<Cell<()>>,
}

impl Default for BinarySerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySerializer {
    /// Creates an engine with an empty registry.
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::default(),
            size_hint: INITIAL_SIZE_HINT,
            _not_sync: PhantomData,
        }
    }

    /// Registers `T` so it is tagged by a compact id instead of its name.
    pub fn register<T: ?Sized>(&mut self) -> u32 {
        self.registry.register(TypeName::of::<T>())
    }

    /// Registers `T` under the stable wire name `wire`, which then takes
    /// precedence over any numeric id.
    pub fn register_as<T: ?Sized>(&mut self, wire: impl Into<String>) {
        self.registry.register_as(TypeName::of::<T>(), wire);
    }

    /// Returns `true` if `T` has been registered, by id or by wire name.
    pub fn is_registered<T: ?Sized>(&self) -> bool {
        let name = TypeName::of::<T>();
        self.registry.id_of(&name).is_some() || self.registry.wire_name_of(&name).is_some()
    }

    /// The engine's type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Writes `value` together with the type tag of `T`.
    pub fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<Vec<u8>, EngineError> {
        let name = TypeName::of::<T>();
        let tag = match (self.registry.wire_name_of(&name), self.registry.id_of(&name)) {
            (Some(wire), _) => Tag::Name(wire.to_owned()),
            (None, Some(id)) => Tag::Id(id),
            (None, None) => Tag::Name(name.as_str().to_owned()),
        };

        let mut out = Vec::with_capacity(self.size_hint);
        rmp_serde::encode::write_named(&mut out, &EnvelopeOut { tag, value })?;
        self.size_hint = out.len().max(INITIAL_SIZE_HINT);
        Ok(out)
    }

    /// Reads the runtime type tag of a payload without decoding the value.
    pub fn read_type(&self, bytes: &[u8]) -> Result<TypeName, EngineError> {
        let head: EnvelopeHead = rmp_serde::from_slice(bytes)?;
        match head.tag {
            Tag::Id(id) => self
                .registry
                .name_of(id)
                .cloned()
                .ok_or(EngineError::UnknownTypeId(id)),
            Tag::Name(name) => match self.registry.name_for_wire(&name) {
                Some(registered) => Ok(registered.clone()),
                None => TypeName::new(name).ok_or(EngineError::EmptyTag),
            },
        }
    }

    /// Reads the value of a payload as `T`. The tag is not checked.
    pub fn read<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, EngineError> {
        let body: EnvelopeBody<T> = rmp_serde::from_slice(bytes)?;
        Ok(body.value)
    }
}
