// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property kinds and descriptors.
//!
//! A [`PropertyKind`] fixes the value type of a property, its built-in
//! constraints and the container type hosts create for it. A [`Descriptor`]
//! wraps a kind with per-declaration settings (default value, `required`,
//! custom validation) and is labeled with exactly one `(schema, name)` pair
//! when it is registered.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use understory_callqueue::CallQueue;

use crate::any::AnyProperty;
use crate::attributes::Attributes;
use crate::container::{ContainerParts, EqualityFn, Rules, ValidateFn};
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::value::{ErasedValue, Value};

/// The `enabled` constraint every descriptor carries.
pub const ENABLED: &str = "enabled";

/// The `default` constraint every descriptor carries.
pub const DEFAULT: &str = "default";

/// A type of property.
///
/// Kinds are small configuration values (`Int::new().min(0)`) that know how to
/// cast, validate and compare values, and how to build the container a host
/// stores for them.
pub trait PropertyKind: Clone + fmt::Debug + 'static {
    /// The stored value type.
    type Value: Value;
    /// The container hosts hand out for this kind.
    type Container: Clone + fmt::Debug + 'static;

    /// Short human readable name, used in errors.
    fn kind_name(&self) -> &'static str;

    /// Value used when the descriptor does not set one.
    fn default_value(&self) -> Self::Value;

    /// Built-in constraints stored as container attributes.
    fn constraints(&self) -> Attributes {
        Attributes::new()
    }

    /// Whether containers of this kind store invalid values by default.
    fn allow_invalid(&self) -> bool {
        true
    }

    /// Converts an incoming value.
    fn cast(&self, _ctx: &Context, _attrs: &Attributes, value: Self::Value) -> Self::Value {
        value
    }

    /// Checks a value against the container's attributes.
    fn validate(
        &self,
        _ctx: &Context,
        _attrs: &Attributes,
        _value: &Self::Value,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Whether two values are the same for notification purposes.
    fn equals(&self, a: &Self::Value, b: &Self::Value) -> bool {
        a == b
    }

    /// Whether `value` counts as "no value" for `required`.
    fn is_missing(&self, _value: &Self::Value) -> bool {
        false
    }

    /// Builds the container.
    fn build(&self, parts: ContainerParts<Self::Value>) -> Self::Container;

    /// Exposes a container through the kind-independent surface.
    fn erase(container: &Self::Container) -> Rc<dyn AnyProperty>;
}

/// The cast, validation and equality rules a kind contributes on its own.
pub(crate) fn kind_rules<K: PropertyKind>(kind: &K) -> Rules<K::Value> {
    let cast = kind.clone();
    let validate = kind.clone();
    let equality = kind.clone();
    Rules {
        cast: Some(Rc::new(move |ctx: &Context, attrs: &Attributes, v| {
            cast.cast(ctx, attrs, v)
        })),
        validate: Some(Rc::new(move |ctx: &Context, attrs: &Attributes, v: &K::Value| {
            validate.validate(ctx, attrs, v)
        })),
        equality: Some(Rc::new(move |a: &K::Value, b: &K::Value| equality.equals(a, b))),
    }
}

#[derive(Clone)]
enum Required {
    No,
    Yes,
    If(Rc<dyn Fn(&Context) -> bool>),
}

impl Required {
    fn applies(&self, ctx: &Context) -> bool {
        match self {
            Self::No => false,
            Self::Yes => true,
            Self::If(f) => f(ctx),
        }
    }
}

struct DescriptorInner<K: PropertyKind> {
    kind: K,
    default: Option<K::Value>,
    required: Required,
    validate: Option<ValidateFn<K::Value>>,
    equality: Option<EqualityFn<K::Value>>,
    allow_invalid: Option<bool>,
    constraints: Attributes,
    label: RefCell<Option<(Rc<str>, Rc<str>)>>,
}

/// The declaration of one property.
///
/// ```rust
/// use understory_property::{Descriptor, Int, ValidationError};
///
/// let even = Descriptor::builder(Int::new().min(0))
///     .default(2)
///     .validate(|_, _, v: &i64| {
///         if v % 2 == 0 { Ok(()) } else { Err(ValidationError::new("Must be even")) }
///     })
///     .build();
/// assert_eq!(even.default_value(), 2);
/// assert!(even.label().is_none());
/// ```
pub struct Descriptor<K: PropertyKind> {
    inner: Rc<DescriptorInner<K>>,
}

impl<K: PropertyKind> Clone for Descriptor<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: PropertyKind> From<K> for Descriptor<K> {
    fn from(kind: K) -> Self {
        Self::builder(kind).build()
    }
}

impl<K: PropertyKind> Descriptor<K> {
    /// Starts building a descriptor of `kind`.
    pub fn builder(kind: K) -> DescriptorBuilder<K> {
        DescriptorBuilder {
            kind,
            default: None,
            required: Required::No,
            validate: None,
            equality: None,
            allow_invalid: None,
            constraints: Attributes::new(),
        }
    }

    /// The kind.
    #[must_use]
    pub fn kind(&self) -> &K {
        &self.inner.kind
    }

    /// The `(owner, name)` label, once registered.
    #[must_use]
    pub fn label(&self) -> Option<(Rc<str>, Rc<str>)> {
        self.inner.label.borrow().clone()
    }

    /// The initial value of new containers.
    #[must_use]
    pub fn default_value(&self) -> K::Value {
        self.inner
            .default
            .clone()
            .unwrap_or_else(|| self.inner.kind.default_value())
    }

    /// The attributes new containers start with.
    #[must_use]
    pub fn constraints(&self) -> Attributes {
        let mut attrs = self.inner.kind.constraints();
        for (key, value) in self.inner.constraints.iter() {
            attrs.insert(key, value.clone());
        }
        if !attrs.contains(ENABLED) {
            attrs.insert(ENABLED, ErasedValue::new(true));
        }
        attrs.insert(DEFAULT, ErasedValue::new(self.default_value()));
        attrs
    }

    /// Whether new containers store invalid values.
    #[must_use]
    pub fn allow_invalid(&self) -> bool {
        self.inner
            .allow_invalid
            .unwrap_or_else(|| self.inner.kind.allow_invalid())
    }

    fn rules(&self) -> Rules<K::Value> {
        let mut rules = kind_rules(&self.inner.kind);
        let kind = self.inner.kind.clone();
        let required = self.inner.required.clone();
        let custom = self.inner.validate.clone();
        rules.validate = Some(Rc::new(move |ctx: &Context, attrs: &Attributes, v: &K::Value| {
            if kind.is_missing(v) && required.applies(ctx) {
                return Err(ValidationError::new("A value is required"));
            }
            if let Some(custom) = &custom {
                custom(ctx, attrs, v)?;
            }
            kind.validate(ctx, attrs, v)
        }));
        if let Some(equality) = &self.inner.equality {
            rules.equality = Some(equality.clone());
        }
        rules
    }

    /// Builds a container for a host.
    pub(crate) fn instantiate(
        &self,
        name: Rc<str>,
        context: Context,
        queue: CallQueue,
    ) -> Instance {
        let container = self.inner.kind.build(ContainerParts {
            name,
            value: self.default_value(),
            rules: self.rules(),
            attributes: self.constraints(),
            allow_invalid: self.allow_invalid(),
            context,
            queue,
        });
        Instance {
            erased: K::erase(&container),
            typed: Rc::new(container),
        }
    }
}

impl<K: PropertyKind> fmt::Debug for Descriptor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("kind", &self.inner.kind)
            .field("label", &*self.inner.label.borrow())
            .field("default", &self.inner.default)
            .field("constraints", &self.inner.constraints)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Descriptor`].
#[must_use]
pub struct DescriptorBuilder<K: PropertyKind> {
    kind: K,
    default: Option<K::Value>,
    required: Required,
    validate: Option<ValidateFn<K::Value>>,
    equality: Option<EqualityFn<K::Value>>,
    allow_invalid: Option<bool>,
    constraints: Attributes,
}

impl<K: PropertyKind> DescriptorBuilder<K> {
    /// Overrides the kind's default value.
    pub fn default(mut self, value: K::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Rejects missing values.
    pub fn required(mut self, required: bool) -> Self {
        self.required = if required { Required::Yes } else { Required::No };
        self
    }

    /// Rejects missing values whenever `f` says so for the owning host.
    pub fn required_if(mut self, f: impl Fn(&Context) -> bool + 'static) -> Self {
        self.required = Required::If(Rc::new(f));
        self
    }

    /// Adds a validation rule that runs before the kind's own.
    pub fn validate(
        mut self,
        f: impl Fn(&Context, &Attributes, &K::Value) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.validate = Some(Rc::new(f));
        self
    }

    /// Overrides the kind's equality.
    pub fn equality(mut self, f: impl Fn(&K::Value, &K::Value) -> bool + 'static) -> Self {
        self.equality = Some(Rc::new(f));
        self
    }

    /// Overrides whether invalid values are stored.
    pub fn allow_invalid(mut self, allow: bool) -> Self {
        self.allow_invalid = Some(allow);
        self
    }

    /// Adds a default constraint.
    pub fn constraint<A: Value>(mut self, key: &str, value: A) -> Self {
        self.constraints.insert(key, ErasedValue::new(value));
        self
    }

    /// Builds the descriptor.
    pub fn build(self) -> Descriptor<K> {
        Descriptor {
            inner: Rc::new(DescriptorInner {
                kind: self.kind,
                default: self.default,
                required: self.required,
                validate: self.validate,
                equality: self.equality,
                allow_invalid: self.allow_invalid,
                constraints: self.constraints,
                label: RefCell::new(None),
            }),
        }
    }
}

impl<K: PropertyKind> fmt::Debug for DescriptorBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorBuilder")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// A freshly built container, typed and erased.
#[derive(Clone)]
pub(crate) struct Instance {
    pub(crate) typed: Rc<dyn Any>,
    pub(crate) erased: Rc<dyn AnyProperty>,
}

/// Descriptors of any kind, as stored by schemas and hosts.
pub(crate) trait AnyDescriptor {
    fn kind_name(&self) -> &'static str;
    fn kind_type(&self) -> TypeId;
    fn assign_label(&self, owner: &Rc<str>, name: &Rc<str>) -> Result<(), PropertyError>;
    fn instantiate(&self, name: Rc<str>, context: Context, queue: CallQueue) -> Instance;
}

impl<K: PropertyKind> AnyDescriptor for Descriptor<K> {
    fn kind_name(&self) -> &'static str {
        self.inner.kind.kind_name()
    }

    fn kind_type(&self) -> TypeId {
        TypeId::of::<K>()
    }

    fn assign_label(&self, owner: &Rc<str>, name: &Rc<str>) -> Result<(), PropertyError> {
        let mut label = self.inner.label.borrow_mut();
        match &*label {
            None => {
                *label = Some((owner.clone(), name.clone()));
                Ok(())
            }
            Some((o, n)) if o == owner && n == name => Ok(()),
            Some((o, n)) => Err(PropertyError::DuplicateBinding {
                label: format!("{o}.{n}"),
                requested: format!("{owner}.{name}"),
            }),
        }
    }

    fn instantiate(&self, name: Rc<str>, context: Context, queue: CallQueue) -> Instance {
        Self::instantiate(self, name, context, queue)
    }
}
