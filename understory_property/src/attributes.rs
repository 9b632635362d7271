// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute maps.
//!
//! Every container carries a small map of named attributes: constraints such
//! as `minval` or `choices`, the `enabled` flag, and any metadata callers
//! attach. Attribute values are [`ErasedValue`]s so one map can hold
//! constraints of different types.
//!
//! # Implementation
//!
//! Like a sparse property store, the map is a sorted `SmallVec` searched with
//! binary search. Containers rarely carry more than a handful of attributes,
//! so the common case never touches the heap for the entry array.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::value::{ErasedValue, Value};

/// Inline capacity for attribute entries.
const INLINE_CAPACITY: usize = 8;

/// Shared attribute key.
pub type AttributeKey = Rc<str>;

/// An ordered-by-key map of attribute values.
///
/// # Example
///
/// ```rust
/// use understory_property::Attributes;
///
/// let attrs = Attributes::new()
///     .with("minval", Some(0_i64))
///     .with("enabled", true);
///
/// assert_eq!(attrs.value::<bool>("enabled"), Some(&true));
/// assert_eq!(attrs.value::<Option<i64>>("minval"), Some(&Some(0)));
/// assert_eq!(attrs.keys().collect::<Vec<_>>(), ["enabled", "minval"]);
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct Attributes {
    entries: SmallVec<[(AttributeKey, ErasedValue); INLINE_CAPACITY]>,
}

impl Attributes {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `key`, returning the map.
    #[must_use]
    pub fn with<T: Value>(mut self, key: &str, value: T) -> Self {
        self.insert(key, ErasedValue::new(value));
        self
    }

    #[inline]
    fn find(&self, key: &str) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| (**k).cmp(key))
    }

    /// Returns the number of attributes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no attributes are set.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_ok()
    }

    /// Returns the erased value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ErasedValue> {
        self.find(key).ok().map(|idx| &self.entries[idx].1)
    }

    /// Returns the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn value<T: 'static>(&self, key: &str) -> Option<&T> {
        self.get(key).and_then(ErasedValue::downcast_ref)
    }

    /// Returns the shared key for `key`, if present.
    pub(crate) fn key(&self, key: &str) -> Option<AttributeKey> {
        self.find(key).ok().map(|idx| self.entries[idx].0.clone())
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: ErasedValue) -> Option<ErasedValue> {
        match self.find(key) {
            Ok(idx) => Some(core::mem::replace(&mut self.entries[idx].1, value)),
            Err(idx) => {
                self.entries.insert(idx, (Rc::from(key), value));
                None
            }
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<ErasedValue> {
        self.find(key).ok().map(|idx| self.entries.remove(idx).1)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &ErasedValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| &**k)
    }
}

impl core::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (&**k, v)))
            .finish()
    }
}

/// Typed reads of the `Option<T>` constraints number and length kinds use.
pub(crate) fn optional<T: Copy + 'static>(attrs: &Attributes, key: &str) -> Option<T> {
    attrs.value::<Option<T>>(key).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_keys_sorted() {
        let mut attrs = Attributes::new();
        attrs.insert("maxval", ErasedValue::new(10_i64));
        attrs.insert("enabled", ErasedValue::new(true));
        attrs.insert("minval", ErasedValue::new(0_i64));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), ["enabled", "maxval", "minval"]);
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut attrs = Attributes::new().with("minval", 1_i64);
        let prev = attrs.insert("minval", ErasedValue::new(2_i64));
        assert_eq!(prev, Some(ErasedValue::new(1_i64)));
        assert_eq!(attrs.value::<i64>("minval"), Some(&2));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn remove_and_contains() {
        let mut attrs = Attributes::new().with("a", 1_u8).with("b", 2_u8);
        assert!(attrs.contains("a"));
        assert_eq!(attrs.remove("a"), Some(ErasedValue::new(1_u8)));
        assert!(!attrs.contains("a"));
        assert_eq!(attrs.remove("a"), None);
    }

    #[test]
    fn optional_reads_flatten() {
        let attrs = Attributes::new()
            .with("minval", Some(3_i64))
            .with("maxval", None::<i64>);
        assert_eq!(optional::<i64>(&attrs, "minval"), Some(3));
        assert_eq!(optional::<i64>(&attrs, "maxval"), None);
        assert_eq!(optional::<i64>(&attrs, "missing"), None);
        // Wrong type reads as absent.
        assert_eq!(optional::<f64>(&attrs, "minval"), None);
    }

    #[test]
    fn maps_compare_by_content() {
        let a = Attributes::new().with("x", 1_i32).with("y", 2_i32);
        let b = Attributes::new().with("y", 2_i32).with("x", 1_i32);
        assert_eq!(a, b);
        assert_ne!(a, b.with("x", 5_i32));
    }
}
