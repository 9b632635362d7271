// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Object`], [`Boolean`] and [`Str`].

use core::marker::PhantomData;
use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::Attributes;
use crate::container::ContainerParts;
use crate::error::ValidationError;
use crate::host::Context;
use crate::kind::PropertyKind;
use crate::kinds::list::check_length;
use crate::scalar::PropertyValue;
use crate::value::Value;

/// Minimum length attribute of [`Str`], an `Option<usize>`.
pub const MINLEN: &str = "minlen";
/// Maximum length attribute of [`Str`], an `Option<usize>`.
pub const MAXLEN: &str = "maxlen";

/// A property holding an arbitrary value.
///
/// Object values are never considered equal, so every write notifies.
#[derive(Clone, Debug, Default)]
pub struct Object<T> {
    _marker: PhantomData<T>,
}

impl<T: Value + Default> Object<T> {
    /// An object property.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Value + Default> PropertyKind for Object<T> {
    type Value = T;
    type Container = PropertyValue<T>;

    fn kind_name(&self) -> &'static str {
        "Object"
    }

    fn default_value(&self) -> T {
        T::default()
    }

    fn equals(&self, _a: &T, _b: &T) -> bool {
        false
    }

    fn build(&self, parts: ContainerParts<T>) -> PropertyValue<T> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<T>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}

/// A `bool` property, `false` by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Boolean;

impl Boolean {
    /// A boolean property.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PropertyKind for Boolean {
    type Value = bool;
    type Container = PropertyValue<bool>;

    fn kind_name(&self) -> &'static str {
        "Boolean"
    }

    fn default_value(&self) -> bool {
        false
    }

    fn build(&self, parts: ContainerParts<bool>) -> PropertyValue<bool> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<bool>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}

/// A `String` property.
///
/// Lengths count characters. The empty string counts as missing for
/// required descriptors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Str {
    minlen: Option<usize>,
    maxlen: Option<usize>,
}

impl Str {
    /// An unconstrained string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum length.
    #[must_use]
    pub fn min_len(mut self, len: usize) -> Self {
        self.minlen = Some(len);
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_len(mut self, len: usize) -> Self {
        self.maxlen = Some(len);
        self
    }
}

impl PropertyKind for Str {
    type Value = String;
    type Container = PropertyValue<String>;

    fn kind_name(&self) -> &'static str {
        "Str"
    }

    fn default_value(&self) -> String {
        String::new()
    }

    fn constraints(&self) -> Attributes {
        Attributes::new()
            .with(MINLEN, self.minlen)
            .with(MAXLEN, self.maxlen)
    }

    fn validate(
        &self,
        _ctx: &Context,
        attrs: &Attributes,
        value: &String,
    ) -> Result<(), ValidationError> {
        check_length(attrs, value.chars().count())
    }

    fn is_missing(&self, value: &String) -> bool {
        value.is_empty()
    }

    fn build(&self, parts: ContainerParts<String>) -> PropertyValue<String> {
        PropertyValue::from_parts(parts)
    }

    fn erase(container: &PropertyValue<String>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_lengths_count_characters() {
        let kind = Str::new().min_len(2).max_len(3);
        let attrs = kind.constraints();
        let ctx = Context::default();
        assert!(kind.validate(&ctx, &attrs, &"éé".to_owned()).is_ok());
        assert_eq!(
            kind.validate(&ctx, &attrs, &"é".to_owned())
                .unwrap_err()
                .message(),
            "Must have length at least 2"
        );
        assert_eq!(
            kind.validate(&ctx, &attrs, &"abcd".to_owned())
                .unwrap_err()
                .message(),
            "Must have length at most 3"
        );
    }

    #[test]
    fn empty_string_is_missing() {
        assert!(Str::new().is_missing(&String::new()));
        assert!(!Str::new().is_missing(&" ".to_owned()));
    }

    #[test]
    fn objects_are_never_equal() {
        let kind = Object::<Vec<u8>>::new();
        assert!(!kind.equals(&vec![1], &vec![1]));
        assert!(kind.default_value().is_empty());
    }
}
