// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State and notification machinery shared by scalar and list containers.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use understory_callqueue::{Call, CallQueue, CallResult};

use crate::attributes::{AttributeKey, Attributes};
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::id::ValueId;
use crate::listeners::ListenerTable;
use crate::value::{ErasedValue, Value};

/// Converts an incoming value before validation, e.g. clamping.
pub type CastFn<T> = Rc<dyn Fn(&Context, &Attributes, T) -> T>;

/// Checks a value against the container's attributes.
pub type ValidateFn<T> = Rc<dyn Fn(&Context, &Attributes, &T) -> Result<(), ValidationError>>;

/// Decides whether two values are the same for notification purposes.
pub type EqualityFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// A value listener.
pub type Listener<T> = dyn Fn(&ValueChange<T>) -> CallResult;

/// An attribute listener.
pub type AttributeListener = dyn Fn(&AttributeChange) -> CallResult;

/// Hook run before ordinary listeners on every notification.
pub type PreNotify<T> = dyn Fn(&ValueChange<T>) -> CallResult;

/// Payload delivered to value listeners.
#[derive(Clone)]
pub struct ValueChange<T> {
    /// The value at notification time.
    pub value: T,
    /// Whether `value` passed validation.
    pub valid: bool,
    /// Name of the notifying container.
    pub name: Rc<str>,
    /// The owning host, if any.
    pub context: Context,
}

impl<T: fmt::Debug> fmt::Debug for ValueChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueChange")
            .field("value", &self.value)
            .field("valid", &self.valid)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Payload delivered to attribute listeners.
#[derive(Clone)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub key: AttributeKey,
    /// Its new value.
    pub value: ErasedValue,
    /// Name of the notifying container.
    pub name: Rc<str>,
    /// The owning host, if any.
    pub context: Context,
}

impl fmt::Debug for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeChange")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Cast, validation and equality rules of a container.
pub(crate) struct Rules<T> {
    pub(crate) cast: Option<CastFn<T>>,
    pub(crate) validate: Option<ValidateFn<T>>,
    pub(crate) equality: Option<EqualityFn<T>>,
}

impl<T> Default for Rules<T> {
    fn default() -> Self {
        Self {
            cast: None,
            validate: None,
            equality: None,
        }
    }
}

impl<T> Clone for Rules<T> {
    fn clone(&self) -> Self {
        Self {
            cast: self.cast.clone(),
            validate: self.validate.clone(),
            equality: self.equality.clone(),
        }
    }
}

impl<T: Value> Rules<T> {
    pub(crate) fn cast(&self, ctx: &Context, attrs: &Attributes, value: T) -> T {
        match &self.cast {
            Some(cast) => cast(ctx, attrs, value),
            None => value,
        }
    }

    pub(crate) fn validate(
        &self,
        ctx: &Context,
        attrs: &Attributes,
        value: &T,
    ) -> Result<(), ValidationError> {
        match &self.validate {
            Some(validate) => validate(ctx, attrs, value),
            None => Ok(()),
        }
    }

    pub(crate) fn equals(&self, a: &T, b: &T) -> bool {
        match &self.equality {
            Some(eq) => eq(a, b),
            None => a == b,
        }
    }
}

/// Everything needed to build a container.
///
/// Hosts assemble this from a descriptor and hand it to
/// [`PropertyKind::build`](crate::PropertyKind::build).
pub struct ContainerParts<T> {
    pub(crate) name: Rc<str>,
    pub(crate) value: T,
    pub(crate) rules: Rules<T>,
    pub(crate) attributes: Attributes,
    pub(crate) allow_invalid: bool,
    pub(crate) context: Context,
    pub(crate) queue: CallQueue,
}

impl<T: fmt::Debug> fmt::Debug for ContainerParts<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerParts")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("attributes", &self.attributes)
            .field("allow_invalid", &self.allow_invalid)
            .finish_non_exhaustive()
    }
}

struct State<T> {
    value: T,
    last: T,
    error: Option<ValidationError>,
    attributes: Attributes,
    allow_invalid: bool,
    notification: bool,
}

/// The value/validity/attribute cell behind every container.
///
/// `ValueCore` never decides whether to notify; the owning container does.
/// It only stores and builds the queued calls for a notification.
pub(crate) struct ValueCore<T: Value> {
    id: ValueId,
    name: Rc<str>,
    context: Context,
    queue: CallQueue,
    rules: Rules<T>,
    state: RefCell<State<T>>,
    writing: Rc<Cell<bool>>,
    syncing: Cell<bool>,
    listeners: RefCell<ListenerTable<Listener<T>>>,
    attribute_listeners: RefCell<ListenerTable<AttributeListener>>,
    pre_notify: RefCell<Option<Rc<PreNotify<T>>>>,
}

impl<T: Value> ValueCore<T> {
    pub(crate) fn new(parts: ContainerParts<T>) -> Self {
        let ContainerParts {
            name,
            value,
            rules,
            attributes,
            allow_invalid,
            context,
            queue,
        } = parts;
        let value = rules.cast(&context, &attributes, value);
        let error = rules.validate(&context, &attributes, &value).err();
        Self {
            id: ValueId::next(),
            name,
            context,
            queue,
            rules,
            state: RefCell::new(State {
                last: value.clone(),
                value,
                error,
                attributes,
                allow_invalid,
                notification: true,
            }),
            writing: Rc::new(Cell::new(false)),
            syncing: Cell::new(false),
            listeners: RefCell::default(),
            attribute_listeners: RefCell::default(),
            pre_notify: RefCell::new(None),
        }
    }

    pub(crate) fn id(&self) -> ValueId {
        self.id
    }

    pub(crate) fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub(crate) fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn queue(&self) -> &CallQueue {
        &self.queue
    }

    pub(crate) fn get(&self) -> T {
        self.state.borrow().value.clone()
    }

    pub(crate) fn borrow_value(&self) -> Ref<'_, T> {
        Ref::map(self.state.borrow(), |s| &s.value)
    }

    pub(crate) fn last(&self) -> T {
        self.state.borrow().last.clone()
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.state.borrow().error.is_none()
    }

    pub(crate) fn error(&self) -> Option<ValidationError> {
        self.state.borrow().error.clone()
    }

    pub(crate) fn equals(&self, a: &T, b: &T) -> bool {
        self.rules.equals(a, b)
    }

    pub(crate) fn allow_invalid(&self) -> bool {
        self.state.borrow().allow_invalid
    }

    pub(crate) fn set_allow_invalid(&self, allow: bool) {
        self.state.borrow_mut().allow_invalid = allow;
    }

    pub(crate) fn notification_enabled(&self) -> bool {
        self.state.borrow().notification
    }

    pub(crate) fn set_notification(&self, enabled: bool) {
        self.state.borrow_mut().notification = enabled;
    }

    pub(crate) fn is_writing(&self) -> bool {
        self.writing.get()
    }

    pub(crate) fn is_syncing(&self) -> bool {
        self.syncing.get()
    }

    pub(crate) fn set_syncing(&self, syncing: bool) {
        self.syncing.set(syncing);
    }

    /// Whether notifications should be suppressed right now.
    pub(crate) fn quiet(&self) -> bool {
        !self.notification_enabled() || self.is_writing() || self.is_syncing()
    }

    /// Casts and validates `value` against a snapshot of the attributes.
    ///
    /// No borrow is held while user callbacks run, so rules may read this
    /// container.
    pub(crate) fn prepare(&self, value: T) -> (T, Option<ValidationError>) {
        let attrs = self.attributes();
        let value = self.rules.cast(&self.context, &attrs, value);
        let error = self.rules.validate(&self.context, &attrs, &value).err();
        (value, error)
    }

    /// Stores a prepared value. Returns `true` if the value or its validity
    /// changed.
    pub(crate) fn commit(&self, value: T, error: Option<ValidationError>) -> bool {
        let mut state = self.state.borrow_mut();
        let changed = state.error.is_none() != error.is_none()
            || !self.rules.equals(&state.value, &value);
        state.error = error;
        if changed {
            state.last = core::mem::replace(&mut state.value, value);
        }
        changed
    }

    /// Cast, validate, gate and store. Returns whether anything changed.
    pub(crate) fn write(&self, value: T, gate: bool) -> Result<bool, PropertyError> {
        let (value, error) = self.prepare(value);
        if let Some(source) = error.as_ref().filter(|_| gate && !self.allow_invalid()) {
            return Err(PropertyError::Validation {
                name: self.name.clone(),
                source: source.clone(),
            });
        }
        Ok(self.commit(value, error))
    }

    /// Re-runs validation on the stored value. Returns `true` if validity
    /// flipped.
    pub(crate) fn revalidate(&self) -> bool {
        let attrs = self.attributes();
        let value = self.get();
        let error = self.rules.validate(&self.context, &attrs, &value).err();
        let mut state = self.state.borrow_mut();
        let flipped = state.error.is_none() != error.is_none();
        state.error = error;
        flipped
    }

    pub(crate) fn attributes(&self) -> Attributes {
        self.state.borrow().attributes.clone()
    }

    pub(crate) fn attribute(&self, key: &str) -> Option<ErasedValue> {
        self.state.borrow().attributes.get(key).cloned()
    }

    /// Stores an attribute. Returns the shared key if the value changed.
    pub(crate) fn store_attribute(&self, key: &str, value: ErasedValue) -> Option<AttributeKey> {
        let mut state = self.state.borrow_mut();
        if state.attributes.get(key) == Some(&value) {
            return None;
        }
        state.attributes.insert(key, value);
        state.attributes.key(key)
    }

    pub(crate) fn change(&self) -> ValueChange<T> {
        let state = self.state.borrow();
        ValueChange {
            value: state.value.clone(),
            valid: state.error.is_none(),
            name: self.name.clone(),
            context: self.context.clone(),
        }
    }

    /// Builds the queued calls of one value notification: the pre-notify
    /// hook first, then every enabled listener.
    pub(crate) fn value_calls(&self) -> Vec<Call> {
        if !self.notification_enabled() {
            return Vec::new();
        }
        let change = self.change();
        let mut calls = Vec::new();
        if let Some(hook) = self.pre_notify.borrow().clone() {
            let writing = self.writing.clone();
            let change = change.clone();
            calls.push(Call::from_fn(format!("{}.pre_notify", self.name), move || {
                writing.set(true);
                let result = hook(&change);
                writing.set(false);
                result
            }));
        }
        for (listener, callback) in self.listeners.borrow_mut().live() {
            calls.push(Call::new(
                format!("{}.{}", self.name, listener),
                callback,
                change.clone(),
            ));
        }
        calls
    }

    pub(crate) fn attribute_calls(&self, key: &AttributeKey, value: &ErasedValue) -> Vec<Call> {
        if !self.notification_enabled() {
            return Vec::new();
        }
        let change = AttributeChange {
            key: key.clone(),
            value: value.clone(),
            name: self.name.clone(),
            context: self.context.clone(),
        };
        self.attribute_listeners
            .borrow_mut()
            .live()
            .into_iter()
            .map(|(listener, callback)| {
                Call::new(
                    format!("{}.{}[{}]", self.name, listener, key),
                    callback,
                    change.clone(),
                )
            })
            .collect()
    }

    pub(crate) fn dispatch_value(&self) {
        self.queue.call_all(self.value_calls());
    }

    pub(crate) fn dispatch_attribute(&self, key: &AttributeKey, value: &ErasedValue) {
        self.queue.call_all(self.attribute_calls(key, value));
    }

    pub(crate) fn set_pre_notify(&self, hook: Option<Rc<PreNotify<T>>>) {
        *self.pre_notify.borrow_mut() = hook;
    }

    pub(crate) fn listeners(&self) -> &RefCell<ListenerTable<Listener<T>>> {
        &self.listeners
    }

    pub(crate) fn attribute_listeners(&self) -> &RefCell<ListenerTable<AttributeListener>> {
        &self.attribute_listeners
    }
}

/// Listener management shared by every container type.
macro_rules! listener_methods {
    ($value:ty) => {
        /// Registers a value listener under `name`.
        ///
        /// Fails with [`PropertyError::DuplicateListener`] if `name` is taken
        /// and `overwrite` is `false`.
        pub fn add_listener(
            &self,
            name: &str,
            callback: impl Fn(&$crate::ValueChange<$value>) -> understory_callqueue::CallResult + 'static,
            overwrite: bool,
        ) -> Result<(), $crate::PropertyError> {
            self.core()
                .listeners()
                .borrow_mut()
                .add(name, std::rc::Rc::new(callback), overwrite)
        }

        /// Registers a value listener that lives only as long as the
        /// returned [`Subscription`](crate::Subscription).
        pub fn add_weak_listener(
            &self,
            name: &str,
            callback: impl Fn(&$crate::ValueChange<$value>) -> understory_callqueue::CallResult + 'static,
            overwrite: bool,
        ) -> Result<$crate::Subscription, $crate::PropertyError> {
            self.core()
                .listeners()
                .borrow_mut()
                .add_weak(name, std::rc::Rc::new(callback), overwrite)
        }

        /// Removes a value listener. Returns `true` if it was registered.
        pub fn remove_listener(&self, name: &str) -> bool {
            self.core().listeners().borrow_mut().remove(name)
        }

        /// Returns `true` if a value listener named `name` is registered.
        #[must_use]
        pub fn has_listener(&self, name: &str) -> bool {
            self.core().listeners().borrow().contains(name)
        }

        /// Re-enables a disabled listener.
        pub fn enable_listener(&self, name: &str) -> bool {
            self.core().listeners().borrow_mut().set_enabled(name, true)
        }

        /// Keeps a listener registered but stops calling it.
        pub fn disable_listener(&self, name: &str) -> bool {
            self.core().listeners().borrow_mut().set_enabled(name, false)
        }

        /// Returns whether the listener is enabled, or `None` if unknown.
        #[must_use]
        pub fn listener_enabled(&self, name: &str) -> Option<bool> {
            self.core().listeners().borrow().is_enabled(name)
        }

        /// Returns the registered value listener names in order.
        #[must_use]
        pub fn listener_names(&self) -> Vec<std::rc::Rc<str>> {
            self.core().listeners().borrow().names()
        }

        /// Registers an attribute listener under `name`.
        pub fn add_attribute_listener(
            &self,
            name: &str,
            callback: impl Fn(&$crate::AttributeChange) -> understory_callqueue::CallResult + 'static,
            overwrite: bool,
        ) -> Result<(), $crate::PropertyError> {
            self.core()
                .attribute_listeners()
                .borrow_mut()
                .add(name, std::rc::Rc::new(callback), overwrite)
        }

        /// Removes an attribute listener. Returns `true` if it was registered.
        pub fn remove_attribute_listener(&self, name: &str) -> bool {
            self.core().attribute_listeners().borrow_mut().remove(name)
        }

        /// Returns `true` if notifications are enabled.
        #[must_use]
        pub fn notification_enabled(&self) -> bool {
            self.core().notification_enabled()
        }

        /// Turns notification on or off. Values are still stored while off.
        pub fn set_notification_enabled(&self, enabled: bool) {
            self.core().set_notification(enabled);
        }

        /// Shorthand for `set_notification_enabled(true)`.
        pub fn enable_notification(&self) {
            self.set_notification_enabled(true);
        }

        /// Shorthand for `set_notification_enabled(false)`.
        pub fn disable_notification(&self) {
            self.set_notification_enabled(false);
        }

        /// Returns whether invalid values are stored instead of rejected.
        #[must_use]
        pub fn allows_invalid(&self) -> bool {
            self.core().allow_invalid()
        }

        /// Changes whether invalid values are stored instead of rejected.
        pub fn set_allow_invalid(&self, allow: bool) {
            self.core().set_allow_invalid(allow);
        }

        /// Installs or clears the pre-notify hook.
        pub fn set_pre_notify(
            &self,
            hook: Option<impl Fn(&$crate::ValueChange<$value>) -> understory_callqueue::CallResult + 'static>,
        ) {
            self.core().set_pre_notify(
                hook.map(|h| std::rc::Rc::new(h) as std::rc::Rc<$crate::container::PreNotify<$value>>),
            );
        }

        /// Returns the identity of this container.
        #[must_use]
        pub fn id(&self) -> $crate::ValueId {
            self.core().id()
        }

        /// Returns the container name.
        #[must_use]
        pub fn name(&self) -> std::rc::Rc<str> {
            self.core().name().clone()
        }

        /// Returns the owning host context.
        #[must_use]
        pub fn context(&self) -> $crate::Context {
            self.core().context().clone()
        }

        /// Returns the current value.
        #[must_use]
        pub fn get(&self) -> $value {
            self.core().get()
        }

        /// Returns the value prior to the most recent change.
        #[must_use]
        pub fn last(&self) -> $value {
            self.core().last()
        }

        /// Returns `true` if the current value passed validation.
        #[must_use]
        pub fn is_valid(&self) -> bool {
            self.core().is_valid()
        }

        /// Returns why the current value is invalid, if it is.
        #[must_use]
        pub fn validation_error(&self) -> Option<$crate::ValidationError> {
            self.core().error()
        }

        /// Returns a snapshot of all attributes.
        #[must_use]
        pub fn attributes(&self) -> $crate::Attributes {
            self.core().attributes()
        }

        /// Returns one attribute.
        #[must_use]
        pub fn attribute(&self, key: &str) -> Option<$crate::ErasedValue> {
            self.core().attribute(key)
        }

        /// Returns one attribute as a `A`, if present with that type.
        #[must_use]
        pub fn attribute_as<A: $crate::Value>(&self, key: &str) -> Option<A> {
            self.core().attribute(key).and_then(|v| v.get::<A>())
        }

        /// Sets one attribute.
        pub fn set_attribute<A: $crate::Value>(&self, key: &str, value: A) {
            self.set_attribute_erased(key, $crate::ErasedValue::new(value));
        }

        /// Sets every attribute in `attributes`, one at a time.
        pub fn set_attributes(&self, attributes: &$crate::Attributes) {
            for (key, value) in attributes.iter() {
                self.set_attribute_erased(key, value.clone());
            }
        }

        /// Re-sends the current value of `key` to attribute listeners and
        /// bound partners.
        pub fn notify_attribute(&self, key: &str) {
            if let Some(value) = self.core().attribute(key) {
                if let Some(key) = self.core().attributes().key(key) {
                    self.attribute_changed(&key, &value);
                }
            }
        }

        /// Re-runs validation; notifies if validity flipped.
        pub fn revalidate(&self) {
            if self.core().revalidate() {
                self.notify();
            }
        }
    };
}

pub(crate) use listener_methods;

