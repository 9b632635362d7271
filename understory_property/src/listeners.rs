// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named listener tables with strong and weak registrations.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::PropertyError;

/// Keeps a weakly registered listener alive.
///
/// Weak registrations are pruned the next time their container notifies
/// after this guard is dropped.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    _guard: Rc<dyn Any>,
}

impl Subscription {
    pub(crate) fn new<F: ?Sized + 'static>(callback: Rc<F>) -> Self {
        Self {
            _guard: Rc::new(callback),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

enum Slot<F: ?Sized> {
    Strong(Rc<F>),
    Weak(Weak<F>),
}

impl<F: ?Sized> Slot<F> {
    fn upgrade(&self) -> Option<Rc<F>> {
        match self {
            Self::Strong(rc) => Some(rc.clone()),
            Self::Weak(weak) => weak.upgrade(),
        }
    }
}

struct Entry<F: ?Sized> {
    name: Rc<str>,
    slot: Slot<F>,
    enabled: bool,
}

/// An ordered table of named callbacks.
pub(crate) struct ListenerTable<F: ?Sized> {
    entries: Vec<Entry<F>>,
}

impl<F: ?Sized> Default for ListenerTable<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized + 'static> ListenerTable<F> {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| &*e.name == name)
    }

    fn insert(&mut self, name: &str, slot: Slot<F>, overwrite: bool) -> Result<(), PropertyError> {
        match self.position(name) {
            Some(_) if !overwrite => Err(PropertyError::DuplicateListener {
                name: Rc::from(name),
            }),
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.slot = slot;
                entry.enabled = true;
                Ok(())
            }
            None => {
                self.entries.push(Entry {
                    name: Rc::from(name),
                    slot,
                    enabled: true,
                });
                Ok(())
            }
        }
    }

    pub(crate) fn add(
        &mut self,
        name: &str,
        callback: Rc<F>,
        overwrite: bool,
    ) -> Result<(), PropertyError> {
        self.insert(name, Slot::Strong(callback), overwrite)
    }

    pub(crate) fn add_weak(
        &mut self,
        name: &str,
        callback: Rc<F>,
        overwrite: bool,
    ) -> Result<Subscription, PropertyError> {
        self.insert(name, Slot::Weak(Rc::downgrade(&callback)), overwrite)?;
        Ok(Subscription::new(callback))
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub(crate) fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.entries[idx].enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_enabled(&self, name: &str) -> Option<bool> {
        self.position(name).map(|idx| self.entries[idx].enabled)
    }

    pub(crate) fn names(&self) -> Vec<Rc<str>> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Returns the enabled, live callbacks in registration order, dropping
    /// weak registrations whose owner is gone.
    pub(crate) fn live(&mut self) -> Vec<(Rc<str>, Rc<F>)> {
        self.entries.retain(|e| e.slot.upgrade().is_some());
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .filter_map(|e| e.slot.upgrade().map(|cb| (e.name.clone(), cb)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Cb = dyn Fn() -> u32;

    fn cb(v: u32) -> Rc<Cb> {
        Rc::new(move || v)
    }

    fn values(table: &mut ListenerTable<Cb>) -> Vec<u32> {
        table.live().into_iter().map(|(_, f)| f()).collect()
    }

    #[test]
    fn duplicate_names_need_overwrite() {
        let mut table = ListenerTable::<Cb>::default();
        table.add("a", cb(1), false).unwrap();
        assert!(matches!(
            table.add("a", cb(2), false),
            Err(PropertyError::DuplicateListener { .. })
        ));
        table.add("a", cb(3), true).unwrap();
        assert_eq!(values(&mut table), [3]);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut table = ListenerTable::<Cb>::default();
        table.add("a", cb(1), false).unwrap();
        table.add("b", cb(2), false).unwrap();
        table.add("a", cb(9), true).unwrap();
        assert_eq!(values(&mut table), [9, 2]);
    }

    #[test]
    fn disabled_listeners_are_skipped_but_kept() {
        let mut table = ListenerTable::<Cb>::default();
        table.add("a", cb(1), false).unwrap();
        table.add("b", cb(2), false).unwrap();
        assert!(table.set_enabled("a", false));
        assert_eq!(values(&mut table), [2]);
        assert_eq!(table.is_enabled("a"), Some(false));
        assert!(table.set_enabled("a", true));
        assert_eq!(values(&mut table), [1, 2]);
        assert!(!table.set_enabled("zzz", true));
    }

    #[test]
    fn weak_registration_dies_with_its_subscription() {
        let mut table = ListenerTable::<Cb>::default();
        let sub = table.add_weak("w", cb(5), false).unwrap();
        assert_eq!(values(&mut table), [5]);
        drop(sub);
        assert_eq!(values(&mut table), Vec::<u32>::new());
        assert!(!table.contains("w"), "dead entry must be pruned");
    }

    #[test]
    fn remove_reports_presence() {
        let mut table = ListenerTable::<Cb>::default();
        table.add("a", cb(1), false).unwrap();
        assert!(table.remove("a"));
        assert!(!table.remove("a"));
        assert!(table.names().is_empty());
    }
}
