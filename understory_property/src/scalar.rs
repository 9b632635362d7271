// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scalar value container.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use understory_callqueue::{Call, CallQueue};

use crate::attributes::{AttributeKey, Attributes};
use crate::bind::{self, BindFlags, Edges, SyncNode};
use crate::container::{
    listener_methods, CastFn, ContainerParts, EqualityFn, Rules, ValidateFn, ValueCore,
};
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::value::{ErasedValue, Value};

/// Receives change notifications from the items of a list.
pub(crate) trait ItemParent {
    fn item_changed(&self);
    fn item_attribute_changed(&self, key: &AttributeKey, value: &ErasedValue);
}

pub(crate) struct ScalarInner<T: Value> {
    core: ValueCore<T>,
    edges: RefCell<Edges<Weak<ScalarInner<T>>>>,
    parent: RefCell<Option<Weak<dyn ItemParent>>>,
}

/// A boxed, observable value.
///
/// Every write goes through cast, validation, storage and notification:
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_property::{PropertyValue, ValidationError};
///
/// let value = PropertyValue::builder("level", 5_i64)
///     .validate(|_, _, v: &i64| {
///         if *v < 0 { Err(ValidationError::new("Must be at least 0")) } else { Ok(()) }
///     })
///     .build();
///
/// let calls = Rc::new(Cell::new(0));
/// let seen = calls.clone();
/// value
///     .add_listener("count", move |_| { seen.set(seen.get() + 1); Ok(()) }, false)
///     .unwrap();
///
/// value.set(7).unwrap();
/// value.set(7).unwrap(); // unchanged, no notification
/// value.set(-1).unwrap(); // stored, but invalid
/// assert_eq!(calls.get(), 2);
/// assert_eq!(value.get(), -1);
/// assert!(!value.is_valid());
/// assert_eq!(value.last(), 7);
/// ```
///
/// Cloning yields another handle to the same container.
pub struct PropertyValue<T: Value> {
    inner: Rc<ScalarInner<T>>,
}

impl<T: Value> Clone for PropertyValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Value> PropertyValue<T> {
    /// Creates a container with no cast or validation rules.
    #[must_use]
    pub fn new(name: &str, value: T) -> Self {
        Self::builder(name, value).build()
    }

    /// Starts building a container.
    #[must_use]
    pub fn builder(name: &str, value: T) -> PropertyValueBuilder<T> {
        PropertyValueBuilder::new(name, value)
    }

    /// Builds a container from parts prepared by a host.
    #[must_use]
    pub fn from_parts(parts: ContainerParts<T>) -> Self {
        Self {
            inner: Rc::new(ScalarInner {
                core: ValueCore::new(parts),
                edges: RefCell::default(),
                parent: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn core(&self) -> &ValueCore<T> {
        &self.inner.core
    }

    listener_methods!(T);

    /// Returns `true` if both handles refer to the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` on the current value without cloning it.
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.core().borrow_value())
    }

    /// Writes a value.
    ///
    /// The value is cast and validated first. An invalid value is rejected
    /// with [`PropertyError::Validation`] (leaving the container untouched)
    /// unless the container allows invalid values. Listeners are notified if
    /// the value or its validity changed.
    pub fn set(&self, value: T) -> Result<(), PropertyError> {
        if self.core().write(value, true)? {
            self.notify();
        }
        Ok(())
    }

    /// Writes a value even if it is invalid.
    pub(crate) fn set_unchecked(&self, value: T) {
        let (value, error) = self.core().prepare(value);
        if self.core().commit(value, error) {
            self.notify();
        }
    }

    /// Runs a notification cycle for the current value.
    ///
    /// Bound partners are synchronized first. Does nothing while notification
    /// is disabled.
    pub fn notify(&self) {
        if self.core().quiet() {
            return;
        }
        if bind::has_partners(self, BindFlags::VALUE) {
            bind::propagate_value(self);
        } else {
            self.core().dispatch_value();
        }
        if let Some(parent) = self.parent() {
            parent.item_changed();
        }
    }

    /// Sets one attribute from an erased value.
    ///
    /// Does nothing if the attribute already holds an equal value. Otherwise
    /// attribute listeners are notified and the current value is revalidated.
    pub fn set_attribute_erased(&self, key: &str, value: ErasedValue) {
        if let Some(key) = self.core().store_attribute(key, value.clone()) {
            self.attribute_changed(&key, &value);
        }
    }

    fn attribute_changed(&self, key: &AttributeKey, value: &ErasedValue) {
        if self.core().is_syncing() {
            return;
        }
        if self.core().quiet() {
            self.revalidate();
        } else if bind::has_partners(self, BindFlags::ATTRIBUTES) {
            bind::propagate_attribute(self, key, value);
        } else {
            self.core().dispatch_attribute(key, value);
            self.finish_attribute_change(key, value);
        }
    }

    fn finish_attribute_change(&self, key: &AttributeKey, value: &ErasedValue) {
        if let Some(parent) = self.parent() {
            parent.item_attribute_changed(key, value);
        }
        self.revalidate();
    }

    fn parent(&self) -> Option<Rc<dyn ItemParent>> {
        self.inner.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_parent(&self, parent: Option<Weak<dyn ItemParent>>) {
        *self.inner.parent.borrow_mut() = parent;
    }

    /// Binds this container to `other`.
    ///
    /// This container immediately takes `other`'s attributes and value
    /// (invalid values are accepted for the copy), after which changes on
    /// either side propagate to the other.
    pub fn bind(&self, other: &Self, flags: BindFlags) -> Result<(), PropertyError> {
        if self.ptr_eq(other) {
            return Err(PropertyError::structure("cannot bind a property to itself"));
        }
        if flags.contains(BindFlags::ATTRIBUTES) {
            self.set_attributes(&other.attributes());
        }
        if flags.contains(BindFlags::VALUE) {
            self.set_unchecked(other.get());
        }
        bind::link(self, other, flags, None);
        Ok(())
    }

    /// Removes the `flags` part of the binding with `other`.
    pub fn unbind(&self, other: &Self, flags: BindFlags) {
        bind::unlink(self, other, flags);
    }

    /// Returns `true` if a live value binding connects the two containers.
    #[must_use]
    pub fn is_bound(&self, other: &Self) -> bool {
        bind::is_linked(self, other, BindFlags::VALUE)
    }

    /// Returns `true` if a live attribute binding connects the two containers.
    #[must_use]
    pub fn is_attribute_bound(&self, other: &Self) -> bool {
        bind::is_linked(self, other, BindFlags::ATTRIBUTES)
    }
}

impl<T: Value> SyncNode for PropertyValue<T> {
    type Handle = Weak<ScalarInner<T>>;

    fn node_id(&self) -> crate::ValueId {
        self.core().id()
    }

    fn node_name(&self) -> Rc<str> {
        self.core().name().clone()
    }

    fn downgrade(&self) -> Self::Handle {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(handle: &Self::Handle) -> Option<Self> {
        handle.upgrade().map(|inner| Self { inner })
    }

    fn edges(&self) -> &RefCell<Edges<Self::Handle>> {
        &self.inner.edges
    }

    fn queue(&self) -> CallQueue {
        self.core().queue().clone()
    }

    fn set_syncing(&self, syncing: bool) {
        self.core().set_syncing(syncing);
    }

    fn sync_value_from(&self, parent: &Self) -> Option<Vec<Call>> {
        let value = parent.get();
        if self.core().equals(&self.core().borrow_value(), &value) {
            return None;
        }
        let (value, error) = self.core().prepare(value);
        self.core().commit(value, error).then(Vec::new)
    }

    fn sync_attribute(&self, key: &str, value: &ErasedValue) -> bool {
        self.core().store_attribute(key, value.clone()).is_some()
    }

    fn value_calls(&self) -> Vec<Call> {
        self.core().value_calls()
    }

    fn attribute_calls(&self, key: &AttributeKey, value: &ErasedValue) -> Vec<Call> {
        self.core().attribute_calls(key, value)
    }

    fn after_attribute_change(&self, key: &AttributeKey, value: &ErasedValue) {
        self.finish_attribute_change(key, value);
    }
}

impl<T: Value> fmt::Debug for PropertyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValue")
            .field("name", self.core().name())
            .field("value", &*self.core().borrow_value())
            .field("valid", &self.core().is_valid())
            .finish_non_exhaustive()
    }
}

/// Builder for standalone [`PropertyValue`]s.
#[must_use]
pub struct PropertyValueBuilder<T: Value> {
    name: Rc<str>,
    value: T,
    rules: Rules<T>,
    attributes: Attributes,
    allow_invalid: bool,
    queue: Option<CallQueue>,
}

impl<T: Value> PropertyValueBuilder<T> {
    fn new(name: &str, value: T) -> Self {
        Self {
            name: Rc::from(name),
            value,
            rules: Rules::default(),
            attributes: Attributes::new(),
            allow_invalid: true,
            queue: None,
        }
    }

    /// Sets the cast function.
    pub fn cast(mut self, cast: impl Fn(&Context, &Attributes, T) -> T + 'static) -> Self {
        self.rules.cast = Some(Rc::new(cast) as CastFn<T>);
        self
    }

    /// Sets the validation function.
    pub fn validate(
        mut self,
        validate: impl Fn(&Context, &Attributes, &T) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.rules.validate = Some(Rc::new(validate) as ValidateFn<T>);
        self
    }

    /// Sets the equality function used to detect changes.
    pub fn equality(mut self, equality: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.rules.equality = Some(Rc::new(equality) as EqualityFn<T>);
        self
    }

    /// Adds an initial attribute.
    pub fn attribute<A: Value>(mut self, key: &str, value: A) -> Self {
        self.attributes.insert(key, ErasedValue::new(value));
        self
    }

    /// Sets whether invalid values are stored (default) or rejected.
    pub fn allow_invalid(mut self, allow: bool) -> Self {
        self.allow_invalid = allow;
        self
    }

    /// Uses `queue` instead of the thread's default queue.
    pub fn queue(mut self, queue: CallQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Builds the container.
    pub fn build(self) -> PropertyValue<T> {
        PropertyValue::from_parts(ContainerParts {
            name: self.name,
            value: self.value,
            rules: self.rules,
            attributes: self.attributes,
            allow_invalid: self.allow_invalid,
            context: Context::default(),
            queue: self.queue.unwrap_or_else(CallQueue::global),
        })
    }
}

impl<T: Value> fmt::Debug for PropertyValueBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValueBuilder")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("attributes", &self.attributes)
            .field("allow_invalid", &self.allow_invalid)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use understory_callqueue::CallError;

    fn counter<T: Value>(value: &PropertyValue<T>, name: &str) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        value
            .add_listener(
                name,
                move |_| {
                    c.set(c.get() + 1);
                    Ok(())
                },
                false,
            )
            .unwrap();
        count
    }

    fn non_negative() -> PropertyValueBuilder<i64> {
        PropertyValue::builder("n", 0_i64).validate(|_, _, v: &i64| {
            if *v < 0 {
                Err(ValidationError::new("Must be at least 0"))
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn rejected_write_leaves_value_untouched() {
        let value = non_negative().allow_invalid(false).build();
        let calls = counter(&value, "c");
        let err = value.set(-1).unwrap_err();
        assert!(matches!(err, PropertyError::Validation { .. }));
        assert_eq!(value.get(), 0);
        assert!(value.is_valid());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn validity_flip_alone_notifies() {
        let value = PropertyValue::builder("n", 1_i64)
            .validate(|_, attrs, v: &i64| match attrs.value::<i64>("max") {
                Some(max) if v > max => Err(ValidationError::new("too big")),
                _ => Ok(()),
            })
            .build();
        let calls = counter(&value, "c");
        value.set_attribute("max", 0_i64);
        assert!(!value.is_valid());
        assert_eq!(calls.get(), 1, "revalidation must notify on validity change");
        value.set_attribute("max", 0_i64);
        assert_eq!(calls.get(), 1, "equal attribute is a no-op");
    }

    #[test]
    fn cast_runs_before_validation() {
        let value = PropertyValue::builder("clamped", 0_i64)
            .cast(|_, _, v: i64| v.clamp(0, 10))
            .build();
        value.set(99).unwrap();
        assert_eq!(value.get(), 10);
    }

    #[test]
    fn always_unequal_equality_notifies_every_time() {
        let value = PropertyValue::builder("obj", 1_u8)
            .equality(|_, _| false)
            .build();
        let calls = counter(&value, "c");
        value.set(1).unwrap();
        value.set(1).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn disabled_notification_still_stores() {
        let value = PropertyValue::new("v", 0_u32);
        let calls = counter(&value, "c");
        value.disable_notification();
        value.set(4).unwrap();
        assert_eq!(value.get(), 4);
        assert_eq!(calls.get(), 0);
        value.enable_notification();
        value.notify();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn disabled_listener_is_skipped() {
        let value = PropertyValue::new("v", 0_u32);
        let calls = counter(&value, "c");
        assert!(value.disable_listener("c"));
        value.set(1).unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(value.listener_enabled("c"), Some(false));
        value.enable_listener("c");
        value.set(2).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn listener_errors_do_not_block_others() {
        let value = PropertyValue::new("v", 0_u32);
        value
            .add_listener("bad", |_| Err(CallError::msg("nope")), false)
            .unwrap();
        let calls = counter(&value, "good");
        value.set(3).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn weak_listener_stops_after_subscription_drops() {
        let value = PropertyValue::new("v", 0_u32);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = value
            .add_weak_listener(
                "weak",
                move |_| {
                    c.set(c.get() + 1);
                    Ok(())
                },
                false,
            )
            .unwrap();
        value.set(1).unwrap();
        drop(sub);
        value.set(2).unwrap();
        assert_eq!(count.get(), 1);
        assert!(!value.has_listener("weak"));
    }

    #[test]
    fn pre_notify_runs_first_and_cannot_renotify_itself() {
        let value = PropertyValue::new("v", 0_i32);
        let order = Rc::new(RefCell::new(Vec::new()));
        let handle = value.clone();
        let log = order.clone();
        value.set_pre_notify(Some(move |change: &crate::ValueChange<i32>| {
            log.borrow_mut().push(format!("pre {}", change.value));
            // Nested write on the same container is stored silently.
            handle.set(change.value * 10).ok();
            Ok(())
        }));
        let log = order.clone();
        value
            .add_listener(
                "l",
                move |change| {
                    log.borrow_mut().push(format!("listener {}", change.value));
                    Ok(())
                },
                false,
            )
            .unwrap();

        value.set(2).unwrap();
        assert_eq!(*order.borrow(), ["pre 2", "listener 2"]);
        assert_eq!(value.get(), 20);
    }

    #[test]
    fn attribute_listeners_receive_key_and_value() {
        let value = PropertyValue::new("v", 0_i32);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        value
            .add_attribute_listener(
                "a",
                move |change| {
                    s.borrow_mut()
                        .push((change.key.to_string(), change.value.get::<i32>()));
                    Ok(())
                },
                false,
            )
            .unwrap();
        value.set_attribute("limit", 3_i32);
        assert_eq!(*seen.borrow(), [("limit".to_string(), Some(3))]);
        assert_eq!(value.attribute_as::<i32>("limit"), Some(3));
    }

    #[test]
    fn listeners_receive_value_and_validity() {
        let value = non_negative().build();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        value
            .add_listener(
                "l",
                move |change| {
                    s.borrow_mut().push((change.value, change.valid));
                    Ok(())
                },
                false,
            )
            .unwrap();
        value.set(5).unwrap();
        value.set(-5).unwrap();
        assert_eq!(*seen.borrow(), [(5, true), (-5, false)]);
        assert_eq!(
            value.validation_error().map(|e| e.message().to_owned()),
            Some("Must be at least 0".to_owned())
        );
    }
}
