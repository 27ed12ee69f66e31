//! Newtype identifiers.
//!
//! A type's default identity on the wire is its fully qualified Rust path.
//! Wrapping it in [`TypeName`] keeps it from being confused with arbitrary
//! message strings in error fields and log events.

use std::any::type_name;

use serde::{Deserialize, Serialize};

/// The fully qualified name of a Rust type, derived from
/// [`std::any::type_name`].
///
/// Used as the runtime type tag of an encoded payload and as the structured
/// "expected type" field of serialization errors.
///
/// Borrowed forms are folded onto the owned type they serialize as: `&T`
/// becomes `T`, `str` becomes `String` and a slice `[T]` becomes `Vec<T>`.
/// The compiler gives no stability guarantee for these names, so they only
/// identify a type between peers built by the same toolchain from the same
/// sources. Types exchanged across builds need a stable wire name registered
/// on the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(String);

impl TypeName {
    /// Returns the name of `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self(canonical(type_name::<T>()))
    }

    /// Creates a type name from a raw string, returning `None` if it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment, e.g. `Person` for `app::model::Person`.
    ///
    /// Generic arguments are kept: `Vec<app::Item>` stays `Vec<app::Item>`.
    pub fn short(&self) -> &str {
        let head = self.0.split('<').next().unwrap_or(&self.0);
        match head.rfind("::") {
            Some(idx) => &self.0[idx + 2..],
            None => &self.0,
        }
    }
}

fn canonical(raw: &str) -> String {
    let mut name = raw;
    loop {
        if let Some(rest) = name.strip_prefix("&mut ") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('&') {
            name = rest;
        } else {
            break;
        }
    }
    if name == "str" {
        return type_name::<String>().to_owned();
    }
    match name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        // `[T; N]` serializes as a tuple, not a sequence.
        Some(element) if !element.contains(';') => {
            let vec = type_name::<Vec<()>>();
            let vec = vec.strip_suffix("<()>").unwrap_or(vec);
            format!("{vec}<{}>", canonical(element))
        }
        _ => name.to_owned(),
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Local;

    #[test]
    fn of_uses_the_full_path() {
        let name = TypeName::of::<Local>();
        assert!(name.as_str().ends_with("identifiers::tests::Local"));
        assert_eq!(name.short(), "Local");
    }

    #[test]
    fn short_keeps_generic_arguments() {
        let name = TypeName::new("alloc::vec::Vec<app::Item>").unwrap();
        assert_eq!(name.short(), "Vec<app::Item>");
    }

    #[test]
    fn borrowed_forms_share_the_owned_name() {
        assert_eq!(TypeName::of::<str>(), TypeName::of::<String>());
        assert_eq!(TypeName::of::<&&str>(), TypeName::of::<String>());
        assert_eq!(TypeName::of::<[u8]>(), TypeName::of::<Vec<u8>>());
        assert_eq!(TypeName::of::<[&str]>(), TypeName::of::<Vec<String>>());
        assert_eq!(TypeName::of::<&Local>(), TypeName::of::<Local>());
        assert_ne!(TypeName::of::<[u8; 4]>(), TypeName::of::<Vec<u8>>());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(TypeName::new("").is_none());
    }
}
