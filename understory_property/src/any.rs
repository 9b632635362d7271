// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased access to containers.
//!
//! Hosts keep their containers behind [`AnyProperty`] so that name-based
//! operations (listeners, attributes, binding, dumps) work the same way for
//! every property kind.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use understory_callqueue::CallResult;

use crate::attributes::Attributes;
use crate::bind::BindFlags;
use crate::container::AttributeListener;
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::id::ValueId;
use crate::list::PropertyValueList;
use crate::scalar::PropertyValue;
use crate::value::{ErasedValue, Value};

/// Payload delivered to listeners registered through the erased surface.
#[derive(Clone)]
pub struct ErasedChange {
    /// The value at notification time.
    pub value: ErasedValue,
    /// Whether `value` passed validation.
    pub valid: bool,
    /// Name of the notifying container.
    pub name: Rc<str>,
    /// The owning host, if any.
    pub context: Context,
}

impl fmt::Debug for ErasedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedChange")
            .field("value", &self.value)
            .field("valid", &self.valid)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A listener over erased values.
pub type ErasedListener = dyn Fn(&ErasedChange) -> CallResult;

/// A hook run before the listeners of a container.
pub type ErasedHook = dyn Fn() -> CallResult;

/// The kind-independent surface of a container.
pub trait AnyProperty: fmt::Debug {
    /// Upcasts for downcasting to the concrete container.
    fn as_any(&self) -> &dyn Any;
    /// Container identity.
    fn id(&self) -> ValueId;
    /// Container name.
    fn name(&self) -> Rc<str>;
    /// Rust type name of the stored value.
    fn value_type(&self) -> &'static str;
    /// Current value.
    fn value(&self) -> ErasedValue;
    /// Writes a value of the stored type.
    fn set_value(&self, value: ErasedValue) -> Result<(), PropertyError>;
    /// Value before the most recent change.
    fn last_value(&self) -> ErasedValue;
    /// Whether the current value passed validation.
    fn is_valid(&self) -> bool;
    /// Why the current value is invalid.
    fn validation_error(&self) -> Option<ValidationError>;
    /// Re-runs validation, notifying if validity flipped.
    fn revalidate(&self);
    /// Forces a notification cycle.
    fn notify(&self);
    /// Snapshot of the attributes.
    fn attributes(&self) -> Attributes;
    /// One attribute.
    fn attribute(&self, key: &str) -> Option<ErasedValue>;
    /// Sets one attribute.
    fn set_attribute(&self, key: &str, value: ErasedValue);
    /// Registers a value listener.
    fn add_listener(
        &self,
        name: &str,
        callback: Rc<ErasedListener>,
        overwrite: bool,
    ) -> Result<(), PropertyError>;
    /// Removes a value listener.
    fn remove_listener(&self, name: &str) -> bool;
    /// Whether a value listener is registered.
    fn has_listener(&self, name: &str) -> bool;
    /// Enables or disables a value listener.
    fn set_listener_enabled(&self, name: &str, enabled: bool) -> bool;
    /// Registers an attribute listener.
    fn add_attribute_listener(
        &self,
        name: &str,
        callback: Rc<AttributeListener>,
        overwrite: bool,
    ) -> Result<(), PropertyError>;
    /// Removes an attribute listener.
    fn remove_attribute_listener(&self, name: &str) -> bool;
    /// Whether notification is enabled.
    fn notification_enabled(&self) -> bool;
    /// Turns notification on or off.
    fn set_notification_enabled(&self, enabled: bool);
    /// Installs or clears the pre-notify hook.
    fn set_pre_notify_hook(&self, hook: Option<Rc<ErasedHook>>);
    /// Binds this container to `other`, which must be of the same type.
    fn bind_to(&self, other: &dyn AnyProperty, flags: BindFlags) -> Result<(), PropertyError>;
    /// Removes the `flags` part of a binding with `other`.
    fn unbind_from(&self, other: &dyn AnyProperty, flags: BindFlags) -> Result<(), PropertyError>;
    /// Whether a live value binding connects this container and `other`.
    fn is_bound_to(&self, other: &dyn AnyProperty) -> bool;
}

fn mismatch(left: &dyn AnyProperty, right: &dyn AnyProperty) -> PropertyError {
    PropertyError::TypeMismatch {
        left: left.value_type(),
        right: right.value_type(),
    }
}

macro_rules! impl_any_property {
    ($container:ident, $value:ty) => {
        impl<T: Value> AnyProperty for $container<T> {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn id(&self) -> ValueId {
                Self::id(self)
            }

            fn name(&self) -> Rc<str> {
                Self::name(self)
            }

            fn value_type(&self) -> &'static str {
                core::any::type_name::<$value>()
            }

            fn value(&self) -> ErasedValue {
                ErasedValue::new(self.get())
            }

            fn set_value(&self, value: ErasedValue) -> Result<(), PropertyError> {
                match value.get::<$value>() {
                    Some(value) => self.set(value),
                    None => Err(PropertyError::WrongType {
                        name: Self::name(self),
                        expected: core::any::type_name::<$value>(),
                    }),
                }
            }

            fn last_value(&self) -> ErasedValue {
                ErasedValue::new(self.last())
            }

            fn is_valid(&self) -> bool {
                Self::is_valid(self)
            }

            fn validation_error(&self) -> Option<ValidationError> {
                Self::validation_error(self)
            }

            fn revalidate(&self) {
                Self::revalidate(self);
            }

            fn notify(&self) {
                Self::notify(self);
            }

            fn attributes(&self) -> Attributes {
                Self::attributes(self)
            }

            fn attribute(&self, key: &str) -> Option<ErasedValue> {
                Self::attribute(self, key)
            }

            fn set_attribute(&self, key: &str, value: ErasedValue) {
                self.set_attribute_erased(key, value);
            }

            fn add_listener(
                &self,
                name: &str,
                callback: Rc<ErasedListener>,
                overwrite: bool,
            ) -> Result<(), PropertyError> {
                Self::add_listener(
                    self,
                    name,
                    move |change| {
                        callback(&ErasedChange {
                            value: ErasedValue::new(change.value.clone()),
                            valid: change.valid,
                            name: change.name.clone(),
                            context: change.context.clone(),
                        })
                    },
                    overwrite,
                )
            }

            fn remove_listener(&self, name: &str) -> bool {
                Self::remove_listener(self, name)
            }

            fn has_listener(&self, name: &str) -> bool {
                Self::has_listener(self, name)
            }

            fn set_listener_enabled(&self, name: &str, enabled: bool) -> bool {
                if enabled {
                    self.enable_listener(name)
                } else {
                    self.disable_listener(name)
                }
            }

            fn add_attribute_listener(
                &self,
                name: &str,
                callback: Rc<AttributeListener>,
                overwrite: bool,
            ) -> Result<(), PropertyError> {
                Self::add_attribute_listener(self, name, move |change| callback(change), overwrite)
            }

            fn remove_attribute_listener(&self, name: &str) -> bool {
                Self::remove_attribute_listener(self, name)
            }

            fn notification_enabled(&self) -> bool {
                Self::notification_enabled(self)
            }

            fn set_notification_enabled(&self, enabled: bool) {
                Self::set_notification_enabled(self, enabled);
            }

            fn set_pre_notify_hook(&self, hook: Option<Rc<ErasedHook>>) {
                self.set_pre_notify(hook.map(|hook| move |_: &crate::ValueChange<$value>| hook()));
            }

            fn bind_to(&self, other: &dyn AnyProperty, flags: BindFlags) -> Result<(), PropertyError> {
                match other.as_any().downcast_ref::<Self>() {
                    Some(other) => self.bind(other, flags),
                    None => Err(mismatch(self, other)),
                }
            }

            fn unbind_from(
                &self,
                other: &dyn AnyProperty,
                flags: BindFlags,
            ) -> Result<(), PropertyError> {
                match other.as_any().downcast_ref::<Self>() {
                    Some(other) => {
                        self.unbind(other, flags);
                        Ok(())
                    }
                    None => Err(mismatch(self, other)),
                }
            }

            fn is_bound_to(&self, other: &dyn AnyProperty) -> bool {
                other
                    .as_any()
                    .downcast_ref::<Self>()
                    .is_some_and(|other| self.is_bound(other))
            }
        }
    };
}

impl_any_property!(PropertyValue, T);
impl_any_property!(PropertyValueList, Vec<T>);
