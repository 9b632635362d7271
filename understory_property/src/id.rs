// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property and container identification types.
//!
//! [`PropertyId`] indexes a property within a [`Schema`](crate::Schema) or
//! host, [`Property<K>`] adds the property kind as a phantom type, and
//! [`ValueId`] gives every value container a process-unique identity used by
//! the binding engine.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};

/// A runtime property identifier.
///
/// This is the position of the property in its host's declaration order.
///
/// # Example
///
/// ```rust
/// use understory_property::PropertyId;
///
/// let id = PropertyId::new(42);
/// assert_eq!(id.index(), 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    /// Creates a new property ID from the given index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying index of this property ID.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyId").field(&self.0).finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.0)
    }
}

/// A typed property key.
///
/// `K` is the property kind (for example [`Int`](crate::Int) or
/// [`Choice<T>`](crate::Choice)), which fixes both the value type and the
/// container type returned by [`HasProperties::prop_val`](crate::HasProperties::prop_val).
///
/// ```rust
/// use understory_property::{Descriptor, HasProperties, Int, Schema};
///
/// let mut builder = Schema::builder("Counter");
/// let count = builder.register("count", &Descriptor::from(Int::new())).unwrap();
/// let host = HasProperties::new(&builder.build());
///
/// host.set(count, 3).unwrap();
/// assert_eq!(host.get(count).unwrap(), 3);
/// // host.set(count, "three"); // Would not compile!
/// ```
pub struct Property<K> {
    id: PropertyId,
    _marker: PhantomData<fn() -> K>,
}

impl<K> Property<K> {
    /// Creates a typed key from a property ID.
    ///
    /// Keys are normally handed out by
    /// [`SchemaBuilder::register`](crate::SchemaBuilder::register). A key
    /// built with the wrong kind is rejected at lookup time.
    #[must_use]
    #[inline]
    pub const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying property ID.
    #[must_use]
    #[inline]
    pub const fn id(self) -> PropertyId {
        self.id
    }
}

impl<K> Copy for Property<K> {}

impl<K> Clone for Property<K> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> PartialEq for Property<K> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for Property<K> {}

impl<K> Hash for Property<K> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K> fmt::Debug for Property<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("kind", &core::any::type_name::<K>())
            .finish()
    }
}

/// Identity of a value container.
///
/// Two handles to the same container share a `ValueId`; distinct containers
/// never do.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ValueId(u64);

impl ValueId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}
