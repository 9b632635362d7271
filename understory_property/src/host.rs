// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property hosts.
//!
//! A [`HasProperties`] owns one container per property of its [`Schema`],
//! plus any properties added at run time. Typed access goes through the
//! [`Property<K>`] keys a schema hands out; every other operation is also
//! available by property name over the erased [`AnyProperty`] surface.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};
use understory_callqueue::{CallQueue, CallResult};

use crate::any::{AnyProperty, ErasedChange, ErasedListener};
use crate::bind::BindFlags;
use crate::container::AttributeChange;
use crate::error::PropertyError;
use crate::id::{Property, PropertyId, ValueId};
use crate::kind::{AnyDescriptor, Descriptor, Instance, PropertyKind, ENABLED};
use crate::schema::Schema;
use crate::value::{ErasedValue, Value};

/// The host a container belongs to, as seen by validation rules and
/// listeners.
///
/// Standalone containers get a detached context whose [`host`](Self::host)
/// is `None`.
#[derive(Clone, Default)]
pub struct Context {
    host: Weak<HostInner>,
}

impl Context {
    /// The owning host, if it is still alive.
    #[must_use]
    pub fn host(&self) -> Option<HasProperties> {
        self.host.upgrade().map(|inner| HasProperties { inner })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host.upgrade() {
            Some(inner) => f
                .debug_struct("Context")
                .field("schema", &inner.schema.name())
                .field("host", &inner.id)
                .finish(),
            None => f.write_str("Context(detached)"),
        }
    }
}

/// Host construction options.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct HostOptions {
    validate_on_change: bool,
    queue: Option<CallQueue>,
}

impl HostOptions {
    /// Default options: no cross validation, the thread's global queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revalidates every other property whenever one property changes.
    ///
    /// Use this when validation rules read other properties of the host.
    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }

    /// The queue the host's containers dispatch notifications through.
    pub fn queue(mut self, queue: CallQueue) -> Self {
        self.queue = Some(queue);
        self
    }
}

#[derive(Clone)]
struct HostEntry {
    name: Rc<str>,
    descriptor: Rc<dyn AnyDescriptor>,
    typed: Rc<dyn Any>,
    erased: Rc<dyn AnyProperty>,
}

struct HostInner {
    id: ValueId,
    schema: Schema,
    options: HostOptions,
    queue: CallQueue,
    entries: RefCell<Vec<HostEntry>>,
    global_listeners: RefCell<Vec<(Rc<str>, Rc<ErasedListener>)>>,
}

/// An object with a set of properties.
///
/// Cloning yields another handle to the same host.
///
/// ```rust
/// use understory_property::{Descriptor, HasProperties, Int, Real, Schema};
///
/// let mut builder = Schema::builder("Circle");
/// let radius = builder
///     .register("radius", &Descriptor::from(Real::new().min(0.0)))
///     .unwrap();
/// let segments = builder
///     .register("segments", &Descriptor::from(Int::new().min(3).max(64)))
///     .unwrap();
/// let circle = HasProperties::new(&builder.build());
///
/// circle.set(radius, 2.5).unwrap();
/// assert_eq!(circle.get(segments).unwrap(), 33);
/// circle.set(segments, 100).unwrap(); // stored, but invalid
/// assert_eq!(circle.validate_all().len(), 1);
/// assert_eq!(circle.get_as::<f64>("radius").unwrap(), 2.5);
/// ```
#[derive(Clone)]
pub struct HasProperties {
    inner: Rc<HostInner>,
}

impl HasProperties {
    /// Creates a host with default options.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self::with_options(schema, HostOptions::default())
    }

    /// Creates a host.
    ///
    /// Every property starts at its descriptor's default value with the
    /// descriptor's constraints as attributes.
    #[must_use]
    pub fn with_options(schema: &Schema, options: HostOptions) -> Self {
        let queue = options.queue.clone().unwrap_or_else(CallQueue::global);
        let inner = Rc::new_cyclic(|this: &Weak<HostInner>| {
            let context = Context { host: this.clone() };
            let entries = schema
                .entries()
                .iter()
                .map(|(name, descriptor)| {
                    let instance =
                        descriptor.instantiate(name.clone(), context.clone(), queue.clone());
                    HostEntry::new(name.clone(), descriptor.clone(), instance)
                })
                .collect();
            HostInner {
                id: ValueId::next(),
                schema: schema.clone(),
                options,
                queue,
                entries: RefCell::new(entries),
                global_listeners: RefCell::new(Vec::new()),
            }
        });
        let host = Self { inner };
        if host.inner.options.validate_on_change {
            for entry in host.entries() {
                host.install_validation_hook(&entry);
            }
        }
        debug!(schema = %schema.name(), host = host.inner.id.get(), "create host");
        host
    }

    /// The schema the host was created from.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// The context containers of this host see.
    #[must_use]
    pub fn context(&self) -> Context {
        Context {
            host: Rc::downgrade(&self.inner),
        }
    }

    /// The queue the host's containers dispatch through.
    #[must_use]
    pub fn queue(&self) -> &CallQueue {
        &self.inner.queue
    }

    /// Returns `true` if both handles refer to the same host.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn entries(&self) -> Vec<HostEntry> {
        self.inner.entries.borrow().clone()
    }

    fn entry(&self, name: &str) -> Result<HostEntry, PropertyError> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|entry| &*entry.name == name)
            .cloned()
            .ok_or_else(|| PropertyError::UnknownProperty {
                name: Rc::from(name),
            })
    }

    fn entry_at(&self, id: PropertyId) -> Result<HostEntry, PropertyError> {
        self.inner
            .entries
            .borrow()
            .get(usize::from(id.index()))
            .cloned()
            .ok_or_else(|| PropertyError::UnknownProperty {
                name: Rc::from(id.to_string()),
            })
    }

    fn install_validation_hook(&self, entry: &HostEntry) {
        let host = Rc::downgrade(&self.inner);
        let name = entry.name.clone();
        entry.erased.set_pre_notify_hook(Some(Rc::new(move || {
            if let Some(inner) = host.upgrade() {
                Self { inner }.revalidate_others(&name);
            }
            Ok(())
        })));
    }

    fn revalidate_others(&self, changed: &str) {
        for entry in self.entries() {
            if &*entry.name != changed {
                entry.erased.revalidate();
            }
        }
    }

    // Typed access

    /// The value of `prop`.
    pub fn get<K: PropertyKind>(&self, prop: Property<K>) -> Result<K::Value, PropertyError> {
        let entry = self.entry_at(prop.id())?;
        entry.value::<K::Value>()
    }

    /// Writes `prop`.
    ///
    /// Disabled properties refuse writes with [`PropertyError::Disabled`].
    pub fn set<K: PropertyKind>(
        &self,
        prop: Property<K>,
        value: K::Value,
    ) -> Result<(), PropertyError> {
        let entry = self.entry_at(prop.id())?;
        entry.write(ErasedValue::new(value))
    }

    /// The container of `prop`.
    pub fn prop_val<K: PropertyKind>(&self, prop: Property<K>) -> Result<K::Container, PropertyError> {
        self.entry_at(prop.id())?.container::<K>()
    }

    // Access by name

    /// Declared and added property names, in order, without hidden (`_`
    /// prefixed) ones.
    #[must_use]
    pub fn all_properties(&self) -> Vec<Rc<str>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|entry| !entry.name.starts_with('_'))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Returns `true` if the host has a property called `name`.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.entry(name).is_ok()
    }

    /// The typed key of `name`, if it exists with kind `K`.
    #[must_use]
    pub fn property_key<K: PropertyKind>(&self, name: &str) -> Option<Property<K>> {
        let entries = self.inner.entries.borrow();
        let index = entries.iter().position(|entry| &*entry.name == name)?;
        if entries[index].descriptor.kind_type() != TypeId::of::<K>() {
            return None;
        }
        Some(Property::from_id(PropertyId::new(u16::try_from(index).ok()?)))
    }

    /// The erased container of `name`.
    pub fn property(&self, name: &str) -> Result<Rc<dyn AnyProperty>, PropertyError> {
        Ok(self.entry(name)?.erased)
    }

    /// The typed container of `name`.
    pub fn prop_val_named<K: PropertyKind>(&self, name: &str) -> Result<K::Container, PropertyError> {
        self.entry(name)?.container::<K>()
    }

    /// Kind name of `name`, such as `"Int"`.
    pub fn kind_name(&self, name: &str) -> Result<&'static str, PropertyError> {
        Ok(self.entry(name)?.descriptor.kind_name())
    }

    /// The erased value of `name`.
    pub fn get_value(&self, name: &str) -> Result<ErasedValue, PropertyError> {
        Ok(self.entry(name)?.erased.value())
    }

    /// Writes an erased value to `name`.
    pub fn set_value(&self, name: &str, value: ErasedValue) -> Result<(), PropertyError> {
        self.entry(name)?.write(value)
    }

    /// The value of `name` as a `T`.
    pub fn get_as<T: Value>(&self, name: &str) -> Result<T, PropertyError> {
        self.entry(name)?.value::<T>()
    }

    /// Writes a `T` to `name`.
    pub fn set_as<T: Value>(&self, name: &str, value: T) -> Result<(), PropertyError> {
        self.set_value(name, ErasedValue::new(value))
    }

    /// The value `name` had before its most recent change.
    pub fn last_value(&self, name: &str) -> Result<ErasedValue, PropertyError> {
        Ok(self.entry(name)?.erased.last_value())
    }

    /// Adds a property to this host only.
    ///
    /// The descriptor is labelled with a name unique to this host, so it
    /// cannot be shared with a schema or another host.
    pub fn add_property<K: PropertyKind>(
        &self,
        name: &str,
        descriptor: &Descriptor<K>,
    ) -> Result<Property<K>, PropertyError> {
        if self.has_property(name) {
            return Err(PropertyError::DuplicateProperty {
                name: Rc::from(name),
            });
        }
        let index = u16::try_from(self.inner.entries.borrow().len())
            .map_err(|_| PropertyError::structure("too many properties on one host"))?;
        let owner: Rc<str> = Rc::from(format!(
            "{}#{}",
            self.inner.schema.name(),
            self.inner.id.get()
        ));
        let name: Rc<str> = Rc::from(name);
        descriptor.assign_label(&owner, &name)?;
        let instance = descriptor.instantiate(name.clone(), self.context(), self.inner.queue.clone());
        let entry = HostEntry::new(name.clone(), Rc::new(descriptor.clone()), instance);
        if self.inner.options.validate_on_change {
            self.install_validation_hook(&entry);
        }
        let globals = self.inner.global_listeners.borrow().clone();
        for (listener, callback) in globals {
            entry.erased.add_listener(&listener, callback, true)?;
        }
        self.inner.entries.borrow_mut().push(entry);
        debug!(host = self.inner.id.get(), property = %name, "add property");
        Ok(Property::from_id(PropertyId::new(index)))
    }

    // Listeners

    /// Registers a value listener on `name`.
    pub fn add_listener(
        &self,
        name: &str,
        listener: &str,
        callback: impl Fn(&ErasedChange) -> CallResult + 'static,
        overwrite: bool,
    ) -> Result<(), PropertyError> {
        self.entry(name)?
            .erased
            .add_listener(listener, Rc::new(callback), overwrite)
    }

    /// Removes a value listener from `name`.
    pub fn remove_listener(&self, name: &str, listener: &str) -> Result<bool, PropertyError> {
        Ok(self.entry(name)?.erased.remove_listener(listener))
    }

    /// Enables or disables one value listener on `name`.
    pub fn set_listener_enabled(
        &self,
        name: &str,
        listener: &str,
        enabled: bool,
    ) -> Result<bool, PropertyError> {
        Ok(self.entry(name)?.erased.set_listener_enabled(listener, enabled))
    }

    /// Registers a value listener on every property, including ones added
    /// later.
    pub fn add_global_listener(
        &self,
        listener: &str,
        callback: impl Fn(&ErasedChange) -> CallResult + 'static,
        overwrite: bool,
    ) -> Result<(), PropertyError> {
        let callback: Rc<ErasedListener> = Rc::new(callback);
        {
            let mut globals = self.inner.global_listeners.borrow_mut();
            match globals.iter_mut().find(|(name, _)| &**name == listener) {
                Some(_) if !overwrite => {
                    return Err(PropertyError::DuplicateListener {
                        name: Rc::from(listener),
                    });
                }
                Some(slot) => slot.1 = callback.clone(),
                None => globals.push((Rc::from(listener), callback.clone())),
            }
        }
        for entry in self.entries() {
            entry.erased.add_listener(listener, callback.clone(), true)?;
        }
        trace!(host = self.inner.id.get(), listener, "add global listener");
        Ok(())
    }

    /// Removes a global listener. Returns `false` if it was not registered.
    pub fn remove_global_listener(&self, listener: &str) -> bool {
        let removed = {
            let mut globals = self.inner.global_listeners.borrow_mut();
            let before = globals.len();
            globals.retain(|(name, _)| &**name != listener);
            globals.len() != before
        };
        if removed {
            for entry in self.entries() {
                entry.erased.remove_listener(listener);
            }
        }
        removed
    }

    /// Registers an attribute listener on `name`.
    pub fn add_attribute_listener(
        &self,
        name: &str,
        listener: &str,
        callback: impl Fn(&AttributeChange) -> CallResult + 'static,
        overwrite: bool,
    ) -> Result<(), PropertyError> {
        self.entry(name)?
            .erased
            .add_attribute_listener(listener, Rc::new(callback), overwrite)
    }

    /// Removes an attribute listener from `name`.
    pub fn remove_attribute_listener(
        &self,
        name: &str,
        listener: &str,
    ) -> Result<bool, PropertyError> {
        Ok(self.entry(name)?.erased.remove_attribute_listener(listener))
    }

    // Attributes

    /// One attribute of `name`.
    pub fn attribute(&self, name: &str, key: &str) -> Result<Option<ErasedValue>, PropertyError> {
        Ok(self.entry(name)?.erased.attribute(key))
    }

    /// Sets one attribute of `name`.
    pub fn set_attribute<A: Value>(
        &self,
        name: &str,
        key: &str,
        value: A,
    ) -> Result<(), PropertyError> {
        self.entry(name)?
            .erased
            .set_attribute(key, ErasedValue::new(value));
        Ok(())
    }

    /// One attribute of `name` as an `A`, if present with that type.
    pub fn constraint<A: Value>(&self, name: &str, key: &str) -> Result<Option<A>, PropertyError> {
        Ok(self.attribute(name, key)?.and_then(|value| value.get::<A>()))
    }

    /// Allows writes to `name` again.
    pub fn enable_property(&self, name: &str) -> Result<(), PropertyError> {
        self.set_attribute(name, ENABLED, true)
    }

    /// Refuses further writes to `name` through the host.
    pub fn disable_property(&self, name: &str) -> Result<(), PropertyError> {
        self.set_attribute(name, ENABLED, false)
    }

    /// Whether `name` accepts writes.
    pub fn property_enabled(&self, name: &str) -> Result<bool, PropertyError> {
        Ok(self.entry(name)?.enabled())
    }

    // Notification and validation

    /// Turns notification on for every property.
    pub fn enable_all_notification(&self) {
        for entry in self.entries() {
            entry.erased.set_notification_enabled(true);
        }
    }

    /// Turns notification off for every property.
    pub fn disable_all_notification(&self) {
        for entry in self.entries() {
            entry.erased.set_notification_enabled(false);
        }
    }

    /// Disables notification of `name` until the guard drops.
    pub fn suppress(&self, name: &str) -> Result<NotificationGuard, PropertyError> {
        Ok(NotificationGuard::new(vec![self.entry(name)?.erased]))
    }

    /// Disables notification of every property until the guard drops.
    pub fn suppress_all(&self) -> NotificationGuard {
        NotificationGuard::new(self.entries().into_iter().map(|e| e.erased).collect())
    }

    /// Whether the value of `name` passed validation.
    pub fn is_valid(&self, name: &str) -> Result<bool, PropertyError> {
        Ok(self.entry(name)?.erased.is_valid())
    }

    /// `(name, message)` for every invalid property, in order.
    #[must_use]
    pub fn validate_all(&self) -> Vec<(Rc<str>, String)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| {
                entry
                    .erased
                    .validation_error()
                    .map(|error| (entry.name, error.message().to_owned()))
            })
            .collect()
    }

    // Binding

    fn bind_pair(
        &self,
        name: &str,
        other: &Self,
        other_name: &str,
    ) -> Result<(HostEntry, HostEntry), PropertyError> {
        let mine = self.entry(name)?;
        let theirs = other.entry(other_name)?;
        if mine.descriptor.kind_type() != theirs.descriptor.kind_type() {
            return Err(PropertyError::TypeMismatch {
                left: mine.descriptor.kind_name(),
                right: theirs.descriptor.kind_name(),
            });
        }
        Ok((mine, theirs))
    }

    /// Binds `name` on this host to `other_name` on `other`.
    ///
    /// Both properties must be of the same kind. This host's property takes
    /// the other's value (and attributes, with [`BindFlags::ATTRIBUTES`]).
    pub fn bind_props(
        &self,
        name: &str,
        other: &Self,
        other_name: &str,
        flags: BindFlags,
    ) -> Result<(), PropertyError> {
        let (mine, theirs) = self.bind_pair(name, other, other_name)?;
        mine.erased.bind_to(&*theirs.erased, flags)?;
        debug!(
            from = %mine.name,
            to = %theirs.name,
            flags = ?flags,
            "bind properties"
        );
        Ok(())
    }

    /// Removes the `flags` part of a binding made with [`bind_props`](Self::bind_props).
    pub fn unbind_props(
        &self,
        name: &str,
        other: &Self,
        other_name: &str,
        flags: BindFlags,
    ) -> Result<(), PropertyError> {
        let (mine, theirs) = self.bind_pair(name, other, other_name)?;
        mine.erased.unbind_from(&*theirs.erased, flags)?;
        debug!(from = %mine.name, to = %theirs.name, flags = ?flags, "unbind properties");
        Ok(())
    }

    /// Whether `name` is value-bound to `other_name` on `other`.
    pub fn is_bound(&self, name: &str, other: &Self, other_name: &str) -> Result<bool, PropertyError> {
        let mine = self.entry(name)?;
        let theirs = other.entry(other_name)?;
        Ok(mine.erased.is_bound_to(&*theirs.erased))
    }
}

impl HostEntry {
    fn new(name: Rc<str>, descriptor: Rc<dyn AnyDescriptor>, instance: Instance) -> Self {
        Self {
            name,
            descriptor,
            typed: instance.typed,
            erased: instance.erased,
        }
    }

    fn enabled(&self) -> bool {
        self.erased
            .attribute(ENABLED)
            .and_then(|value| value.get::<bool>())
            .unwrap_or(true)
    }

    fn value<T: Value>(&self) -> Result<T, PropertyError> {
        self.erased
            .value()
            .get::<T>()
            .ok_or_else(|| PropertyError::WrongType {
                name: self.name.clone(),
                expected: self.erased.value_type(),
            })
    }

    fn write(&self, value: ErasedValue) -> Result<(), PropertyError> {
        if !self.enabled() {
            return Err(PropertyError::Disabled {
                name: self.name.clone(),
            });
        }
        self.erased.set_value(value)
    }

    fn container<K: PropertyKind>(&self) -> Result<K::Container, PropertyError> {
        self.typed
            .downcast_ref::<K::Container>()
            .cloned()
            .ok_or_else(|| PropertyError::WrongType {
                name: self.name.clone(),
                expected: core::any::type_name::<K::Container>(),
            })
    }
}

impl fmt::Debug for HasProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasProperties")
            .field("schema", &self.inner.schema.name())
            .field("id", &self.inner.id)
            .field("properties", &self.inner.entries.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Dumps the host as its schema name followed by one `name = value` line per
/// visible property, with names padded to a common width.
impl fmt::Display for HasProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<_> = self
            .entries()
            .into_iter()
            .filter(|entry| !entry.name.starts_with('_'))
            .collect();
        let width = entries.iter().map(|e| e.name.chars().count()).max().unwrap_or(0);
        write!(f, "{}", self.inner.schema.name())?;
        for entry in entries {
            write!(f, "\n  {:>width$} = {:?}", entry.name, entry.erased.value())?;
        }
        Ok(())
    }
}

/// Restores the notification state of a set of properties when dropped.
///
/// Returned by [`HasProperties::suppress`] and
/// [`HasProperties::suppress_all`].
#[must_use = "notification is restored as soon as the guard is dropped"]
pub struct NotificationGuard {
    saved: Vec<(Rc<dyn AnyProperty>, bool)>,
}

impl NotificationGuard {
    fn new(properties: Vec<Rc<dyn AnyProperty>>) -> Self {
        let saved = properties
            .into_iter()
            .map(|property| {
                let state = property.notification_enabled();
                property.set_notification_enabled(false);
                (property, state)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for NotificationGuard {
    fn drop(&mut self) {
        for (property, state) in self.saved.drain(..).rev() {
            property.set_notification_enabled(state);
        }
    }
}

impl fmt::Debug for NotificationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.saved.iter().map(|(property, _)| property.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Boolean, Int, Str};
    use std::cell::Cell;

    fn widget() -> (HasProperties, Property<Int>, Property<Str>) {
        let mut builder = Schema::builder("Widget");
        let size = builder
            .register("size", &Descriptor::from(Int::new().min(0).max(10)))
            .unwrap();
        let label = builder.register("label", &Descriptor::from(Str::new())).unwrap();
        builder
            .register("_hidden", &Descriptor::from(Boolean::new()))
            .unwrap();
        let host = HasProperties::with_options(
            &builder.build(),
            HostOptions::new().queue(CallQueue::new(false)),
        );
        (host, size, label)
    }

    #[test]
    fn typed_and_named_access_agree() {
        let (host, size, label) = widget();
        host.set(size, 7).unwrap();
        host.set(label, "ok".to_owned()).unwrap();
        assert_eq!(host.get_as::<i64>("size").unwrap(), 7);
        assert_eq!(host.get_value("label").unwrap(), ErasedValue::new("ok".to_owned()));
        assert_eq!(host.last_value("size").unwrap().get::<i64>(), Some(5));
        assert!(matches!(
            host.get_as::<String>("size"),
            Err(PropertyError::WrongType { .. })
        ));
        assert!(matches!(
            host.get_value("nope"),
            Err(PropertyError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn hidden_properties_are_not_listed() {
        let (host, ..) = widget();
        let expected: [Rc<str>; 2] = ["size".into(), "label".into()];
        assert_eq!(host.all_properties(), expected);
        assert!(host.has_property("_hidden"));
    }

    #[test]
    fn disabled_properties_refuse_writes() {
        let (host, size, _) = widget();
        host.disable_property("size").unwrap();
        assert!(!host.property_enabled("size").unwrap());
        assert_eq!(
            host.set(size, 1),
            Err(PropertyError::Disabled { name: "size".into() })
        );
        host.enable_property("size").unwrap();
        host.set(size, 1).unwrap();
    }

    #[test]
    fn global_listeners_reach_added_properties() {
        let (host, size, _) = widget();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        host.add_global_listener(
            "all",
            move |_| {
                c.set(c.get() + 1);
                Ok(())
            },
            false,
        )
        .unwrap();
        assert!(host.add_global_listener("all", |_| Ok(()), false).is_err());
        let extra = host
            .add_property("extra", &Descriptor::from(Int::new()))
            .unwrap();
        host.set(size, 2).unwrap();
        host.set(extra, 2).unwrap();
        assert_eq!(count.get(), 2);
        assert!(host.remove_global_listener("all"));
        host.set(extra, 3).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn added_properties_are_private_to_the_host() {
        let (host, ..) = widget();
        let descriptor = Descriptor::from(Int::new());
        host.add_property("a", &descriptor).unwrap();
        assert!(host.add_property("a", &Descriptor::from(Int::new())).is_err());
        let (other, ..) = widget();
        assert!(matches!(
            other.add_property("a", &descriptor),
            Err(PropertyError::DuplicateBinding { .. })
        ));
        assert_eq!(host.property_key::<Int>("a").map(|p| p.id().index()), Some(3));
    }

    #[test]
    fn suppression_restores_previous_state() {
        let (host, size, _) = widget();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        host.add_listener(
            "size",
            "count",
            move |_| {
                c.set(c.get() + 1);
                Ok(())
            },
            false,
        )
        .unwrap();
        {
            let _guard = host.suppress_all();
            host.set(size, 1).unwrap();
        }
        assert_eq!(count.get(), 0);
        host.set(size, 2).unwrap();
        assert_eq!(count.get(), 1);
        host.disable_all_notification();
        drop(host.suppress("size").unwrap());
        host.set(size, 3).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn validate_all_lists_invalid_properties() {
        let (host, size, _) = widget();
        assert!(host.validate_all().is_empty());
        host.set(size, 11).unwrap();
        let expected: Vec<(Rc<str>, String)> = vec![("size".into(), "Must be at most 10".into())];
        assert_eq!(host.validate_all(), expected);
    }

    #[test]
    fn binding_requires_the_same_kind() {
        let (a, ..) = widget();
        let (b, ..) = widget();
        assert!(matches!(
            a.bind_props("size", &b, "label", BindFlags::all()),
            Err(PropertyError::TypeMismatch { .. })
        ));
        b.set_as("size", 9_i64).unwrap();
        a.bind_props("size", &b, "size", BindFlags::all()).unwrap();
        assert_eq!(a.get_as::<i64>("size").unwrap(), 9);
        a.set_as("size", 4_i64).unwrap();
        assert_eq!(b.get_as::<i64>("size").unwrap(), 4);
        assert!(a.is_bound("size", &b, "size").unwrap());
        a.unbind_props("size", &b, "size", BindFlags::all()).unwrap();
        a.set_as("size", 1_i64).unwrap();
        assert_eq!(b.get_as::<i64>("size").unwrap(), 4);
    }

    #[test]
    fn validate_on_change_rechecks_other_properties() {
        let mut builder = Schema::builder("Range");
        let lo = builder.register("lo", &Descriptor::from(Int::new())).unwrap();
        let hi = builder
            .register(
                "hi",
                &Descriptor::builder(Int::new())
                    .default(10)
                    .validate(|ctx, _, v: &i64| {
                        let lo = ctx
                            .host()
                            .and_then(|host| host.get_as::<i64>("lo").ok())
                            .unwrap_or(i64::MIN);
                        if *v >= lo {
                            Ok(())
                        } else {
                            Err(crate::ValidationError::new("Must be at least lo"))
                        }
                    })
                    .build(),
            )
            .unwrap();
        let host = HasProperties::with_options(
            &builder.build(),
            HostOptions::new()
                .validate_on_change(true)
                .queue(CallQueue::new(false)),
        );
        assert!(host.is_valid("hi").unwrap());
        host.set(lo, 20).unwrap();
        assert!(!host.is_valid("hi").unwrap());
        host.set(hi, 30).unwrap();
        assert!(host.is_valid("hi").unwrap());
    }

    #[test]
    fn display_aligns_names() {
        let (host, size, _) = widget();
        host.set(size, 3).unwrap();
        assert_eq!(host.to_string(), "Widget\n   size = 3\n  label = \"\"");
    }
}
