//! Keys that identify values in the container, and the two group wrappers.

use crate::any::TypeInfo;
use std::fmt;

/// Identifies a node output in the container.
///
/// A `Value` key has exactly one provider. A `Group` key collects the outputs
/// of every provider that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Value(TypeInfo),
    Group(TypeInfo),
}

impl Key {
    pub fn value<T: 'static>() -> Self {
        Key::Value(TypeInfo::of::<T>())
    }

    pub fn group<T: 'static>() -> Self {
        Key::Group(TypeInfo::of::<T>())
    }

    pub fn type_info(&self) -> TypeInfo {
        match self {
            Key::Value(info) | Key::Group(info) => *info,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Key::Group(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Value(info) => write!(f, "{}", info),
            Key::Group(info) => write!(f, "group[{}]", info),
        }
    }
}

/// Consumer side of a value group: every `T` produced as [`Grouped<T>`].
///
/// Order follows provider registration but callers should not rely on it.
#[derive(Debug)]
pub struct Group<T>(Vec<T>);

impl<T> Group<T> {
    pub(crate) fn new(members: Vec<T>) -> Self {
        Self(members)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> IntoIterator for Group<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Producer side of a value group.
#[derive(Debug)]
pub struct Grouped<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_and_group_keys_differ() {
        assert_ne!(Key::value::<String>(), Key::group::<String>());
        assert_eq!(Key::value::<String>().type_info(), Key::group::<String>().type_info());
        assert!(Key::group::<u8>().is_group());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::value::<u32>().to_string(), "u32");
        assert_eq!(Key::group::<u32>().to_string(), "group[u32]");
    }
}
