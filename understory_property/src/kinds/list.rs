// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`List`] kind.

use std::rc::Rc;

use crate::any::AnyProperty;
use crate::attributes::{optional, Attributes};
use crate::container::ContainerParts;
use crate::error::ValidationError;
use crate::host::Context;
use crate::kind::{kind_rules, PropertyKind, DEFAULT};
use crate::kinds::basic::{MAXLEN, MINLEN};
use crate::list::{ItemTemplate, PropertyValueList};
use crate::value::ErasedValue;

/// The item rules and attributes a list of `K` items starts with.
pub(crate) fn item_template<K: PropertyKind>(item: &K) -> ItemTemplate<K::Value> {
    let mut attributes = item.constraints();
    attributes.insert(DEFAULT, ErasedValue::new(item.default_value()));
    ItemTemplate {
        rules: kind_rules(item),
        attributes,
        allow_invalid: item.allow_invalid(),
    }
}

pub(crate) fn check_length(attrs: &Attributes, len: usize) -> Result<(), ValidationError> {
    if let Some(min) = optional::<usize>(attrs, MINLEN)
        && len < min
    {
        return Err(ValidationError::new(format!(
            "Must have length at least {min}"
        )));
    }
    if let Some(max) = optional::<usize>(attrs, MAXLEN)
        && len > max
    {
        return Err(ValidationError::new(format!(
            "Must have length at most {max}"
        )));
    }
    Ok(())
}

/// A list of values of another kind.
///
/// Every item is its own container, cast and validated by the item kind.
/// The list itself only checks its length, through the `minlen` and `maxlen`
/// attributes.
///
/// ```rust
/// use understory_property::{Descriptor, HasProperties, Int, List, Schema};
///
/// let mut builder = Schema::builder("Series");
/// let points = builder
///     .register("points", &Descriptor::from(List::new(Int::new().min(0)).max_len(3)))
///     .unwrap();
/// let series = HasProperties::new(&builder.build());
/// let list = series.prop_val(points).unwrap();
/// list.extend(vec![1, 2, 3, 4]).unwrap();
/// assert!(!list.is_valid());
/// list.set_item(0, -1).unwrap();
/// assert!(!list.item(0).unwrap().is_valid());
/// ```
#[derive(Clone, Debug)]
pub struct List<K> {
    item: K,
    minlen: Option<usize>,
    maxlen: Option<usize>,
}

impl<K: PropertyKind> List<K> {
    /// A list of `item` values.
    #[must_use]
    pub fn new(item: K) -> Self {
        Self {
            item,
            minlen: None,
            maxlen: None,
        }
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

    /// The item kind.
    #[must_use]
    pub fn item(&self) -> &K {
        &self.item
    }
}

impl<K: PropertyKind> PropertyKind for List<K> {
    type Value = Vec<K::Value>;
    type Container = PropertyValueList<K::Value>;

    fn kind_name(&self) -> &'static str {
        "List"
    }

    fn default_value(&self) -> Vec<K::Value> {
        Vec::new()
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
        value: &Vec<K::Value>,
    ) -> Result<(), ValidationError> {
        check_length(attrs, value.len())
    }

    fn equals(&self, a: &Vec<K::Value>, b: &Vec<K::Value>) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.item.equals(x, y))
    }

    fn is_missing(&self, value: &Vec<K::Value>) -> bool {
        value.is_empty()
    }

    fn build(&self, parts: ContainerParts<Vec<K::Value>>) -> PropertyValueList<K::Value> {
        PropertyValueList::from_parts(parts, item_template(&self.item))
    }

    fn erase(container: &PropertyValueList<K::Value>) -> Rc<dyn AnyProperty> {
        Rc::new(container.clone())
    }
}
