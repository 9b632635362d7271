// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Schemas: the ordered property declarations of a host type.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::PropertyError;
use crate::id::{Property, PropertyId};
use crate::kind::{AnyDescriptor, Descriptor, PropertyKind};

pub(crate) type SchemaEntry = (Rc<str>, Rc<dyn AnyDescriptor>);

struct SchemaInner {
    name: Rc<str>,
    entries: Vec<SchemaEntry>,
}

/// The property declarations shared by every host of one type.
///
/// Schemas are immutable and cheap to clone. Registering a descriptor labels
/// it with `(schema name, property name)`; a descriptor can carry only one
/// label, so the same descriptor cannot be registered twice under different
/// names.
///
/// ```rust
/// use understory_property::{Boolean, Descriptor, Int, Schema};
///
/// let mut base = Schema::builder("Widget");
/// base.register("visible", &Descriptor::from(Boolean::new())).unwrap();
/// let base = base.build();
///
/// let mut builder = Schema::builder("Slider");
/// builder.inherit(&base).unwrap();
/// let value = builder.register("value", &Descriptor::from(Int::new())).unwrap();
/// let slider = builder.build();
///
/// assert_eq!(slider.names(), ["visible", "value"]);
/// assert_eq!(slider.property::<Int>("value"), Some(value));
/// ```
#[derive(Clone)]
pub struct Schema {
    inner: Rc<SchemaInner>,
}

impl Schema {
    /// Starts declaring a schema.
    #[must_use]
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: Rc::from(name),
            entries: Vec::new(),
        }
    }

    /// The schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if no properties are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Property names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.inner.entries.iter().map(|(name, _)| &**name).collect()
    }

    /// Returns `true` if `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The typed key of `name`, if it is declared with kind `K`.
    #[must_use]
    pub fn property<K: PropertyKind>(&self, name: &str) -> Option<Property<K>> {
        let index = self.position(name)?;
        let (_, descriptor) = &self.inner.entries[index];
        if descriptor.kind_type() != core::any::TypeId::of::<K>() {
            return None;
        }
        let index = u16::try_from(index).ok()?;
        Some(Property::from_id(PropertyId::new(index)))
    }

    /// Returns `true` if both handles refer to the same schema.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.inner.entries.iter().position(|(n, _)| &**n == name)
    }

    pub(crate) fn entries(&self) -> &[SchemaEntry] {
        &self.inner.entries
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.inner.name)
            .field(
                "properties",
                &self
                    .inner
                    .entries
                    .iter()
                    .map(|(name, descriptor)| (&**name, descriptor.kind_name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Schema`].
#[must_use]
pub struct SchemaBuilder {
    name: Rc<str>,
    entries: Vec<SchemaEntry>,
}

impl SchemaBuilder {
    /// Copies every property of `parent`, in order.
    ///
    /// Inherited descriptors keep their original label.
    pub fn inherit(&mut self, parent: &Schema) -> Result<(), PropertyError> {
        for (name, descriptor) in parent.entries() {
            self.check_free(name)?;
            self.entries.push((name.clone(), descriptor.clone()));
        }
        Ok(())
    }

    /// Declares a property and returns its typed key.
    pub fn register<K: PropertyKind>(
        &mut self,
        name: &str,
        descriptor: &Descriptor<K>,
    ) -> Result<Property<K>, PropertyError> {
        self.check_free(name)?;
        let index = u16::try_from(self.entries.len())
            .map_err(|_| PropertyError::structure("too many properties in one schema"))?;
        let name: Rc<str> = Rc::from(name);
        descriptor.assign_label(&self.name, &name)?;
        debug!(schema = %self.name, property = %name, kind = descriptor.kind().kind_name(), "register property");
        self.entries.push((name, Rc::new(descriptor.clone())));
        Ok(Property::from_id(PropertyId::new(index)))
    }

    fn check_free(&self, name: &str) -> Result<(), PropertyError> {
        if self.entries.iter().any(|(n, _)| &**n == name) {
            return Err(PropertyError::DuplicateProperty {
                name: Rc::from(name),
            });
        }
        Ok(())
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema {
        Schema {
            inner: Rc::new(SchemaInner {
                name: self.name,
                entries: self.entries,
            }),
        }
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("name", &self.name)
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Int, Str};

    #[test]
    fn duplicate_names_are_rejected() {
        let mut builder = Schema::builder("Thing");
        builder.register("a", &Descriptor::from(Int::new())).unwrap();
        let err = builder
            .register("a", &Descriptor::from(Str::new()))
            .unwrap_err();
        assert_eq!(err, PropertyError::DuplicateProperty { name: "a".into() });
    }

    #[test]
    fn a_descriptor_keeps_its_first_label() {
        let shared = Descriptor::from(Int::new());
        let mut builder = Schema::builder("Thing");
        builder.register("a", &shared).unwrap();
        let err = builder.register("b", &shared).unwrap_err();
        assert!(matches!(err, PropertyError::DuplicateBinding { .. }));
        assert_eq!(shared.label(), Some(("Thing".into(), "a".into())));
    }

    #[test]
    fn typed_lookup_checks_the_kind() {
        let mut builder = Schema::builder("Thing");
        let a = builder.register("a", &Descriptor::from(Int::new())).unwrap();
        let schema = builder.build();
        assert_eq!(schema.property::<Int>("a"), Some(a));
        assert_eq!(schema.property::<Str>("a"), None);
        assert_eq!(schema.property::<Int>("b"), None);
        assert!(schema.contains("a"));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn inheritance_conflicts() {
        let mut base = Schema::builder("Base");
        base.register("a", &Descriptor::from(Int::new())).unwrap();
        let base = base.build();
        let mut derived = Schema::builder("Derived");
        derived.register("a", &Descriptor::from(Int::new())).unwrap();
        assert!(derived.inherit(&base).is_err());
    }
}
