// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The list value container.
//!
//! A [`PropertyValueList`] holds one [`PropertyValue`] per element. Items keep
//! their identity across reorders, so listeners and bindings attached to an
//! item survive structural edits that merely move it.
//!
//! Structural operations update items silently, then refresh the list value
//! once. The list notifies at most once per operation; items whose value
//! changed in place notify afterwards.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use hashbrown::{HashMap, HashSet};
use understory_callqueue::{Call, CallQueue};

use crate::attributes::{AttributeKey, Attributes};
use crate::bind::{self, BindFlags, Edges, ItemMap, SyncNode};
use crate::container::{
    listener_methods, CastFn, ContainerParts, EqualityFn, Rules, ValidateFn, ValueCore,
};
use crate::error::{PropertyError, ValidationError};
use crate::host::Context;
use crate::id::ValueId;
use crate::scalar::{ItemParent, PropertyValue};
use crate::value::{ErasedValue, Value};

/// How new items of a list are built.
pub(crate) struct ItemTemplate<T> {
    pub(crate) rules: Rules<T>,
    pub(crate) attributes: Attributes,
    pub(crate) allow_invalid: bool,
}

impl<T> Clone for ItemTemplate<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            attributes: self.attributes.clone(),
            allow_invalid: self.allow_invalid,
        }
    }
}

impl<T> Default for ItemTemplate<T> {
    fn default() -> Self {
        Self {
            rules: Rules::default(),
            attributes: Attributes::new(),
            allow_invalid: true,
        }
    }
}

pub(crate) struct ListInner<T: Value> {
    core: ValueCore<Vec<T>>,
    items: RefCell<Vec<PropertyValue<T>>>,
    template: ItemTemplate<T>,
    item_name: Rc<str>,
    edges: RefCell<Edges<Weak<ListInner<T>>>>,
    this: Weak<ListInner<T>>,
}

impl<T: Value> ItemParent for ListInner<T> {
    fn item_changed(&self) {
        if let Some(inner) = self.this.upgrade() {
            PropertyValueList { inner }.refresh();
        }
    }

    fn item_attribute_changed(&self, key: &AttributeKey, value: &ErasedValue) {
        if !self.core.quiet() {
            self.core.dispatch_attribute(key, value);
        }
    }
}

/// An observable list whose elements are themselves containers.
///
/// ```rust
/// use understory_property::PropertyValueList;
///
/// let list = PropertyValueList::new("sizes", vec![1_i32, 2, 3]);
/// let first = list.item(0).unwrap();
///
/// list.reorder(&[2, 1, 0]).unwrap();
/// assert_eq!(list.get(), vec![3, 2, 1]);
/// // Same container, new position.
/// assert!(list.item(2).unwrap().ptr_eq(&first));
///
/// list.set(vec![7, 8]).unwrap();
/// assert_eq!(list.len(), 2);
/// ```
pub struct PropertyValueList<T: Value> {
    inner: Rc<ListInner<T>>,
}

impl<T: Value> Clone for PropertyValueList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn new_item<T: Value>(
    template: &ItemTemplate<T>,
    name: &Rc<str>,
    list: (&Context, &CallQueue),
    parent: Weak<dyn ItemParent>,
    value: T,
    attributes: Attributes,
) -> PropertyValue<T> {
    let item = PropertyValue::from_parts(ContainerParts {
        name: name.clone(),
        value,
        rules: template.rules.clone(),
        attributes,
        allow_invalid: template.allow_invalid,
        context: list.0.clone(),
        queue: list.1.clone(),
    });
    item.set_parent(Some(parent));
    item
}

fn elementwise<T: Value>(rules: Rules<T>) -> EqualityFn<Vec<T>> {
    Rc::new(move |a: &Vec<T>, b: &Vec<T>| {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| rules.equals(x, y))
    })
}

impl<T: Value> PropertyValueList<T> {
    /// Creates a list with no rules.
    #[must_use]
    pub fn new(name: &str, values: Vec<T>) -> Self {
        Self::builder(name, values).build()
    }

    /// Starts building a list.
    #[must_use]
    pub fn builder(name: &str, values: Vec<T>) -> PropertyValueListBuilder<T> {
        PropertyValueListBuilder::new(name, values)
    }

    pub(crate) fn from_parts(mut parts: ContainerParts<Vec<T>>, template: ItemTemplate<T>) -> Self {
        if parts.rules.equality.is_none() {
            parts.rules.equality = Some(elementwise(template.rules.clone()));
        }
        let item_name: Rc<str> = Rc::from(format!("{}_Item", parts.name));
        let inner = Rc::new_cyclic(|this: &Weak<ListInner<T>>| {
            let parent: Weak<dyn ItemParent> = this.clone();
            let items: Vec<_> = core::mem::take(&mut parts.value)
                .into_iter()
                .map(|value| {
                    new_item(
                        &template,
                        &item_name,
                        (&parts.context, &parts.queue),
                        parent.clone(),
                        value,
                        template.attributes.clone(),
                    )
                })
                .collect();
            parts.value = items.iter().map(PropertyValue::get).collect();
            ListInner {
                core: ValueCore::new(parts),
                items: RefCell::new(items),
                template,
                item_name,
                edges: RefCell::default(),
                this: this.clone(),
            }
        });
        Self { inner }
    }

    pub(crate) fn core(&self) -> &ValueCore<Vec<T>> {
        &self.inner.core
    }

    listener_methods!(Vec<T>);

    /// Returns `true` if both handles refer to the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    /// Returns `true` if the list has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of item `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<T> {
        self.item(index).map(|item| item.get())
    }

    /// The container of item `index`.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<PropertyValue<T>> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Every item container, in order.
    #[must_use]
    pub fn items(&self) -> Vec<PropertyValue<T>> {
        self.inner.items.borrow().clone()
    }

    /// Position of the item container `item`, by identity.
    #[must_use]
    pub fn position_of(&self, item: &PropertyValue<T>) -> Option<usize> {
        self.inner.items.borrow().iter().position(|i| i.ptr_eq(item))
    }

    fn snapshot(&self) -> Vec<T> {
        self.inner.items.borrow().iter().map(PropertyValue::get).collect()
    }

    fn make_item_with(&self, value: T, attributes: Attributes) -> PropertyValue<T> {
        new_item(
            &self.inner.template,
            &self.inner.item_name,
            (self.core().context(), self.core().queue()),
            self.inner.this.clone(),
            value,
            attributes,
        )
    }

    fn make_item(&self, value: T) -> PropertyValue<T> {
        self.make_item_with(value, self.inner.template.attributes.clone())
    }

    /// Releases a removed item: it loses its parent, its bindings and every
    /// pairing this list's edges hold for it.
    fn detach(&self, item: &PropertyValue<T>) {
        let me = self.id();
        for map in self.edges().borrow().item_maps() {
            map.borrow_mut().remove(me, item.id());
        }
        item.set_parent(None);
        bind::unlink_all(item);
    }

    /// Casts and validates a value for a new item, rejecting it if invalid
    /// items are not allowed.
    fn prepare_new(&self, value: T) -> Result<T, PropertyError> {
        let template = &self.inner.template;
        let ctx = self.core().context();
        let value = template.rules.cast(ctx, &template.attributes, value);
        match template.rules.validate(ctx, &template.attributes, &value) {
            Err(source) if !template.allow_invalid => Err(PropertyError::Validation {
                name: self.inner.item_name.clone(),
                source,
            }),
            _ => Ok(value),
        }
    }

    /// Casts, validates and gates a value for an existing item.
    fn prepare_existing(
        item: &PropertyValue<T>,
        value: T,
    ) -> Result<(T, Option<ValidationError>), PropertyError> {
        let (value, error) = item.core().prepare(value);
        match error {
            Some(source) if !item.core().allow_invalid() => Err(PropertyError::Validation {
                name: item.core().name().clone(),
                source,
            }),
            error => Ok((value, error)),
        }
    }

    /// Recomputes the list value from the items and notifies if it changed.
    pub(crate) fn refresh(&self) -> bool {
        let (value, error) = self.core().prepare(self.snapshot());
        let changed = self.core().commit(value, error);
        if changed {
            self.notify();
        }
        changed
    }

    fn finish(&self, item_calls: Vec<Call>) {
        self.refresh();
        self.core().queue().call_all(item_calls);
    }

    /// Runs a notification cycle for the current value.
    pub fn notify(&self) {
        if self.core().quiet() {
            return;
        }
        if bind::has_partners(self, BindFlags::VALUE) {
            bind::propagate_value(self);
        } else {
            self.core().dispatch_value();
        }
    }

    /// Inserts `value` before `index`.
    pub fn insert(&self, index: usize, value: T) -> Result<(), PropertyError> {
        self.insert_all(index, vec![value])
    }

    /// Inserts `values` before `index`, notifying the list once.
    pub fn insert_all(&self, index: usize, values: Vec<T>) -> Result<(), PropertyError> {
        let len = self.len();
        if index > len {
            return Err(PropertyError::Index { index, len });
        }
        let values = values
            .into_iter()
            .map(|v| self.prepare_new(v))
            .collect::<Result<Vec<_>, _>>()?;
        let new_items: Vec<_> = values.into_iter().map(|v| self.make_item(v)).collect();
        self.inner
            .items
            .borrow_mut()
            .splice(index..index, new_items);
        self.refresh();
        Ok(())
    }

    /// Appends `value`.
    pub fn append(&self, value: T) -> Result<(), PropertyError> {
        self.insert(self.len(), value)
    }

    /// Appends every value, notifying the list once.
    pub fn extend(&self, values: Vec<T>) -> Result<(), PropertyError> {
        self.insert_all(self.len(), values)
    }

    /// Removes and returns the last value.
    pub fn pop(&self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.remove(len - 1).ok()
    }

    /// Removes and returns the value at `index`.
    pub fn remove(&self, index: usize) -> Result<T, PropertyError> {
        PropertyError::check_index(index, self.len())?;
        let item = self.inner.items.borrow_mut().remove(index);
        self.detach(&item);
        self.refresh();
        Ok(item.get())
    }

    /// Removes the items in `range`, notifying the list once.
    pub fn remove_range(&self, range: Range<usize>) -> Result<(), PropertyError> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(PropertyError::Index {
                index: range.end.max(range.start),
                len,
            });
        }
        let removed: Vec<_> = self.inner.items.borrow_mut().drain(range).collect();
        removed.iter().for_each(|item| self.detach(item));
        self.refresh();
        Ok(())
    }

    fn find(&self, value: &T, skip: &HashSet<ValueId>) -> Option<usize> {
        let rules = &self.inner.template.rules;
        self.inner
            .items
            .borrow()
            .iter()
            .position(|item| !skip.contains(&item.id()) && item.with_value(|v| rules.equals(v, value)))
    }

    /// Removes the first item equal to `value`.
    pub fn remove_value(&self, value: &T) -> Result<(), PropertyError> {
        match self.find(value, &HashSet::new()) {
            Some(index) => self.remove(index).map(drop),
            None => Err(PropertyError::structure(format!(
                "{value:?} is not in `{}`",
                self.core().name()
            ))),
        }
    }

    /// Removes the first occurrence of each of `values`, notifying the list
    /// once. Values not in the list are ignored.
    pub fn remove_all(&self, values: &[T]) {
        let mut doomed = HashSet::new();
        for value in values {
            if let Some(index) = self.find(value, &doomed) {
                if let Some(item) = self.item(index) {
                    doomed.insert(item.id());
                }
            }
        }
        if doomed.is_empty() {
            return;
        }
        let mut removed = Vec::new();
        self.inner.items.borrow_mut().retain(|item| {
            let keep = !doomed.contains(&item.id());
            if !keep {
                removed.push(item.clone());
            }
            keep
        });
        removed.iter().for_each(|item| self.detach(item));
        self.refresh();
    }

    /// Moves the item at `from` so it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), PropertyError> {
        let len = self.len();
        PropertyError::check_index(from, len)?;
        PropertyError::check_index(to, len)?;
        let mut order: Vec<usize> = (0..len).collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        self.reorder(&order)
    }

    /// Permutes the items so that position `i` holds the item previously at
    /// `order[i]`.
    ///
    /// No item is recreated. An identity permutation is a no-op. Anything
    /// that is not a permutation of `0..len` is a structural error.
    pub fn reorder(&self, order: &[usize]) -> Result<(), PropertyError> {
        let len = self.len();
        let mut seen = vec![false; len];
        let is_permutation = order.len() == len
            && order
                .iter()
                .all(|&i| i < len && !core::mem::replace(&mut seen[i], true));
        if !is_permutation {
            return Err(PropertyError::structure(format!(
                "{order:?} is not a permutation of 0..{len}"
            )));
        }
        if order.iter().enumerate().all(|(i, &j)| i == j) {
            return Ok(());
        }
        {
            let mut items = self.inner.items.borrow_mut();
            let old = core::mem::take(&mut *items);
            *items = order.iter().map(|&i| old[i].clone()).collect();
        }
        // Equal values may swap without changing the list value; bound lists
        // still have to follow the new order.
        if !self.refresh() {
            self.notify();
        }
        Ok(())
    }

    /// Writes the value of item `index`.
    pub fn set_item(&self, index: usize, value: T) -> Result<(), PropertyError> {
        let len = self.len();
        let item = self.item(index).ok_or(PropertyError::Index { index, len })?;
        item.set(value)
    }

    /// Writes every item in `range` from `values`, which must have the same
    /// length. Nothing is written if any value is rejected.
    pub fn set_slice(&self, range: Range<usize>, values: Vec<T>) -> Result<(), PropertyError> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(PropertyError::Index {
                index: range.end.max(range.start),
                len,
            });
        }
        if range.len() != values.len() {
            return Err(PropertyError::structure(format!(
                "cannot assign {} values to a slice of length {}",
                values.len(),
                range.len()
            )));
        }
        let targets = self.items()[range].to_vec();
        let prepared = targets
            .iter()
            .zip(values)
            .map(|(item, value)| Self::prepare_existing(item, value))
            .collect::<Result<Vec<_>, _>>()?;
        let calls = Self::commit_items(&targets, prepared);
        self.finish(calls);
        Ok(())
    }

    fn commit_items(
        items: &[PropertyValue<T>],
        prepared: Vec<(T, Option<ValidationError>)>,
    ) -> Vec<Call> {
        let mut calls = Vec::new();
        for (item, (value, error)) in items.iter().zip(prepared) {
            if item.core().commit(value, error) {
                calls.extend(item.core().value_calls());
            }
        }
        calls
    }

    /// Replaces the whole list.
    ///
    /// Items that overlap the new values are updated in place. Extra items are
    /// removed or new ones appended. Nothing is written if any value is
    /// rejected.
    pub fn set(&self, values: Vec<T>) -> Result<(), PropertyError> {
        let current = self.items();
        let keep = current.len().min(values.len());
        let mut values = values.into_iter();
        let prepared = current[..keep]
            .iter()
            .zip(values.by_ref())
            .map(|(item, value)| Self::prepare_existing(item, value))
            .collect::<Result<Vec<_>, _>>()?;
        let added = values
            .map(|v| self.prepare_new(v))
            .collect::<Result<Vec<_>, _>>()?;

        let calls = Self::commit_items(&current[..keep], prepared);
        let removed = &current[keep..];
        removed.iter().for_each(|item| self.detach(item));
        let new_items: Vec<_> = added.into_iter().map(|v| self.make_item(v)).collect();
        {
            let mut items = self.inner.items.borrow_mut();
            items.truncate(keep);
            items.extend(new_items);
        }
        self.finish(calls);
        Ok(())
    }

    /// Sets one list-level attribute from an erased value.
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
            self.revalidate();
        }
    }

    /// Binds this list to `other`.
    ///
    /// This list is resized to `other`'s length and its items take the values
    /// and attributes of `other`'s items pairwise. Paired items are bound by
    /// attribute; their values are kept in sync through the lists. The list
    /// notifies once if its value changed, then every item whose value
    /// changed notifies.
    pub fn bind(&self, other: &Self, flags: BindFlags) -> Result<(), PropertyError> {
        if self.ptr_eq(other) {
            return Err(PropertyError::structure("cannot bind a property to itself"));
        }
        let mut item_calls = Vec::new();
        let mut items = None;
        if flags.contains(BindFlags::VALUE) {
            let (map, calls) = self.adopt_items(other);
            items = Some(Rc::new(RefCell::new(map)));
            item_calls = calls;
        }
        if flags.contains(BindFlags::ATTRIBUTES) {
            self.set_attributes(&other.attributes());
        }
        bind::link(self, other, flags, items);
        self.finish(item_calls);
        Ok(())
    }

    /// Makes this list structurally identical to `other` and pairs the items.
    fn adopt_items(&self, other: &Self) -> (ItemMap, Vec<Call>) {
        let theirs = other.items();
        let mut mine = self.items();
        if mine.len() > theirs.len() {
            mine.drain(theirs.len()..).for_each(|item| self.detach(&item));
        }
        let fresh = mine.len();
        for master in &theirs[fresh..] {
            mine.push(self.make_item_with(master.get(), master.attributes()));
        }

        let mut map = ItemMap::new(self.id());
        let mut calls = Vec::new();
        for (index, (slave, master)) in mine.iter().zip(&theirs).enumerate() {
            map.insert(self.id(), slave.id(), master.id());
            bind::link(slave, master, BindFlags::ATTRIBUTES, None);
            if index >= fresh {
                continue;
            }
            for (key, value) in master.attributes().iter() {
                slave.core().store_attribute(key, value.clone());
            }
            let (value, error) = slave.core().prepare(master.get());
            if slave.core().commit(value, error) {
                calls.extend(slave.core().value_calls());
            }
        }
        *self.inner.items.borrow_mut() = mine;
        (map, calls)
    }

    /// Removes the `flags` part of the binding with `other`.
    ///
    /// Dropping the value binding also unpairs the items and removes their
    /// attribute bindings.
    pub fn unbind(&self, other: &Self, flags: BindFlags) {
        let Some(map) = bind::unlink(self, other, flags) else {
            return;
        };
        let mine: HashMap<ValueId, PropertyValue<T>> =
            self.items().into_iter().map(|i| (i.id(), i)).collect();
        let theirs: HashMap<ValueId, PropertyValue<T>> =
            other.items().into_iter().map(|i| (i.id(), i)).collect();
        for (a, b) in map.borrow().pairs(self.id()) {
            if let (Some(a), Some(b)) = (mine.get(&a), theirs.get(&b)) {
                bind::unlink(a, b, BindFlags::ATTRIBUTES);
            }
        }
    }

    /// Returns `true` if a live value binding connects the two lists.
    #[must_use]
    pub fn is_bound(&self, other: &Self) -> bool {
        bind::is_linked(self, other, BindFlags::VALUE)
    }

    /// Returns `true` if a live attribute binding connects the two lists.
    #[must_use]
    pub fn is_attribute_bound(&self, other: &Self) -> bool {
        bind::is_linked(self, other, BindFlags::ATTRIBUTES)
    }

    /// Brings this list in line with `master`, following the item map of the
    /// edge between them.
    fn sync_from(&self, master: &Self) -> Option<Vec<Call>> {
        let Some(map) = self.edges().borrow().items_with(master.id()) else {
            panic!(
                "list binding between `{}` and `{}` has no item map",
                self.core().name(),
                master.core().name()
            );
        };
        let mut map = map.borrow_mut();
        let me = self.id();
        let theirs = master.items();
        let live: HashSet<ValueId> = theirs.iter().map(PropertyValue::id).collect();
        let mut mine = self.items();
        let before: Vec<ValueId> = mine.iter().map(PropertyValue::id).collect();

        // Shrink.
        let mut removed = Vec::new();
        for index in (0..mine.len()).rev() {
            let id = mine[index].id();
            if !map.partner(me, id).is_some_and(|m| live.contains(&m)) {
                map.remove(me, id);
                removed.push(mine.remove(index));
            }
        }

        // Grow. An unpaired item already tied to the master item through
        // another edge is paired again instead of replaced.
        let mut added = Vec::new();
        for (index, item) in theirs.iter().enumerate() {
            if map.partner(master.id(), item.id()).is_some() {
                continue;
            }
            let kept = removed
                .iter()
                .position(|old| bind::is_connected(old, item, BindFlags::ATTRIBUTES));
            let slave = match kept {
                Some(pos) => removed.swap_remove(pos),
                None => self.make_item_with(item.get(), item.attributes()),
            };
            map.insert(me, slave.id(), item.id());
            mine.insert(index.min(mine.len()), slave.clone());
            added.push((slave, item.clone()));
        }

        // Follow the master's order.
        let mut by_id: HashMap<ValueId, PropertyValue<T>> =
            mine.into_iter().map(|i| (i.id(), i)).collect();
        let mine: Vec<PropertyValue<T>> = theirs
            .iter()
            .map(|item| {
                map.partner(master.id(), item.id())
                    .and_then(|id| by_id.remove(&id))
                    .unwrap_or_else(|| {
                        panic!("item map of `{}` lost a pairing", self.core().name())
                    })
            })
            .collect();
        drop(map);
        let reordered = mine.iter().map(PropertyValue::id).ne(before.iter().copied());

        // Values.
        let mut calls = Vec::new();
        for (slave, item) in mine.iter().zip(&theirs) {
            let value = item.get();
            if slave.core().equals(&slave.core().borrow_value(), &value) {
                continue;
            }
            let (value, error) = slave.core().prepare(value);
            if slave.core().commit(value, error) {
                calls.extend(slave.core().value_calls());
            }
        }

        *self.inner.items.borrow_mut() = mine;
        removed.iter().for_each(|item| self.detach(item));
        for (slave, item) in &added {
            bind::link(slave, item, BindFlags::ATTRIBUTES, None);
        }

        let (value, error) = self.core().prepare(self.snapshot());
        let changed = self.core().commit(value, error);
        (changed || reordered || !calls.is_empty()).then_some(calls)
    }
}

impl<T: Value> SyncNode for PropertyValueList<T> {
    type Handle = Weak<ListInner<T>>;

    fn node_id(&self) -> ValueId {
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
        self.sync_from(parent)
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

    fn after_attribute_change(&self, _key: &AttributeKey, _value: &ErasedValue) {
        self.revalidate();
    }
}

impl<T: Value> fmt::Debug for PropertyValueList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValueList")
            .field("name", self.core().name())
            .field("value", &*self.core().borrow_value())
            .field("valid", &self.core().is_valid())
            .finish_non_exhaustive()
    }
}

/// Builder for standalone [`PropertyValueList`]s.
#[must_use]
pub struct PropertyValueListBuilder<T: Value> {
    name: Rc<str>,
    values: Vec<T>,
    rules: Rules<Vec<T>>,
    attributes: Attributes,
    allow_invalid: bool,
    item: ItemTemplate<T>,
    queue: Option<CallQueue>,
}

impl<T: Value> PropertyValueListBuilder<T> {
    fn new(name: &str, values: Vec<T>) -> Self {
        Self {
            name: Rc::from(name),
            values,
            rules: Rules::default(),
            attributes: Attributes::new(),
            allow_invalid: true,
            item: ItemTemplate::default(),
            queue: None,
        }
    }

    /// Sets the list-level validation function.
    pub fn validate(
        mut self,
        validate: impl Fn(&Context, &Attributes, &Vec<T>) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.rules.validate = Some(Rc::new(validate) as ValidateFn<Vec<T>>);
        self
    }

    /// Adds a list-level attribute.
    pub fn attribute<A: Value>(mut self, key: &str, value: A) -> Self {
        self.attributes.insert(key, ErasedValue::new(value));
        self
    }

    /// Sets whether invalid list values are stored (default) or rejected.
    pub fn allow_invalid(mut self, allow: bool) -> Self {
        self.allow_invalid = allow;
        self
    }

    /// Sets the cast function of every item.
    pub fn item_cast(mut self, cast: impl Fn(&Context, &Attributes, T) -> T + 'static) -> Self {
        self.item.rules.cast = Some(Rc::new(cast) as CastFn<T>);
        self
    }

    /// Sets the validation function of every item.
    pub fn item_validate(
        mut self,
        validate: impl Fn(&Context, &Attributes, &T) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.item.rules.validate = Some(Rc::new(validate) as ValidateFn<T>);
        self
    }

    /// Sets the equality function of every item.
    pub fn item_equality(mut self, equality: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.item.rules.equality = Some(Rc::new(equality) as EqualityFn<T>);
        self
    }

    /// Adds an initial attribute to every item.
    pub fn item_attribute<A: Value>(mut self, key: &str, value: A) -> Self {
        self.item.attributes.insert(key, ErasedValue::new(value));
        self
    }

    /// Sets whether invalid items are stored (default) or rejected.
    pub fn item_allow_invalid(mut self, allow: bool) -> Self {
        self.item.allow_invalid = allow;
        self
    }

    /// Uses `queue` instead of the thread's default queue.
    pub fn queue(mut self, queue: CallQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Builds the list.
    pub fn build(self) -> PropertyValueList<T> {
        PropertyValueList::from_parts(
            ContainerParts {
                name: self.name,
                value: self.values,
                rules: self.rules,
                attributes: self.attributes,
                allow_invalid: self.allow_invalid,
                context: Context::default(),
                queue: self.queue.unwrap_or_else(CallQueue::global),
            },
            self.item,
        )
    }
}

impl<T: Value> fmt::Debug for PropertyValueListBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValueListBuilder")
            .field("name", &self.name)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}
