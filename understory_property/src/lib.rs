// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property: typed, validated, observable properties.
//!
//! This crate provides boxed values that cast and validate every write,
//! notify named listeners when they change, and can be bound to each other so
//! that a change on one side propagates to every connected container.
//!
//! ## Core Concepts
//!
//! ### Containers
//!
//! - [`PropertyValue<T>`] holds one value, its attributes (constraints such
//!   as `minval`), and value and attribute listeners.
//! - [`PropertyValueList<T>`] holds a list whose items are themselves
//!   [`PropertyValue`]s. Structural edits notify the list once; item edits
//!   notify the item, then the list.
//!
//! Every write runs `cast`, then `validate`. Invalid values are rejected
//! unless the container allows them, in which case they are stored and
//! flagged. Listeners run only when the value or its validity changes,
//! according to the container's equality.
//!
//! ### Declarations and hosts
//!
//! - A [`PropertyKind`] ([`Int`], [`Str`], [`Choice`], [`Bounds`], ...) fixes
//!   the value type, built-in constraints and container type.
//! - A [`Descriptor`] wraps a kind with a default, `required`, custom
//!   validation and extra constraints.
//! - A [`Schema`] is the ordered list of named descriptors of a host type.
//! - A [`HasProperties`] host owns one container per schema entry, and
//!   offers typed access through [`Property<K>`] keys as well as access by
//!   name.
//!
//! ### Binding
//!
//! Containers of the same type can be bound with [`BindFlags`]. Binding is
//! symmetric and transitive: a change spreads over the connected graph
//! exactly once, every reached container is updated before any listener runs,
//! and listeners are dispatched through a [`CallQueue`](understory_callqueue::CallQueue).
//! Bindings hold weak references; dropping a container removes it from the
//! graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_property::{
//!     BindFlags, Descriptor, HasProperties, Int, Schema, Str,
//! };
//!
//! let mut builder = Schema::builder("Person");
//! let name = builder
//!     .register("name", &Descriptor::builder(Str::new()).required(true).build())
//!     .unwrap();
//! let age = builder
//!     .register("age", &Descriptor::from(Int::new().min(0).max(150)))
//!     .unwrap();
//! let schema = builder.build();
//!
//! let alice = HasProperties::new(&schema);
//! assert!(!alice.is_valid("name").unwrap());
//! alice.set(name, "Alice".to_owned()).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! alice
//!     .add_listener("age", "log", move |change| {
//!         log.borrow_mut().push(change.value.get::<i64>());
//!         Ok(())
//!     }, false)
//!     .unwrap();
//!
//! // A second host mirrors Alice's age.
//! let mirror = HasProperties::new(&schema);
//! mirror.bind_props("age", &alice, "age", BindFlags::all()).unwrap();
//! mirror.set(age, 30).unwrap();
//!
//! assert_eq!(alice.get(age).unwrap(), 30);
//! assert_eq!(*seen.borrow(), [Some(30)]);
//! ```
//!
//! ## Threading
//!
//! Containers and hosts are single-threaded (`Rc`/`RefCell`). Each thread has
//! its own default [`CallQueue`](understory_callqueue::CallQueue).

mod any;
mod attributes;
mod bind;
mod container;
mod error;
mod host;
mod id;
mod kind;
mod list;
mod listeners;
mod scalar;
mod schema;
mod value;

pub mod kinds;

pub use any::{AnyProperty, ErasedChange, ErasedHook, ErasedListener};
pub use attributes::{AttributeKey, Attributes};
pub use bind::BindFlags;
pub use container::{
    AttributeChange, AttributeListener, CastFn, ContainerParts, EqualityFn, Listener, PreNotify,
    ValidateFn, ValueChange,
};
pub use error::{PropertyError, ValidationError};
pub use host::{Context, HasProperties, HostOptions, NotificationGuard};
pub use id::{Property, PropertyId, ValueId};
pub use kind::{DEFAULT, Descriptor, DescriptorBuilder, ENABLED, PropertyKind};
pub use kinds::basic::{Boolean, Object, Str};
pub use kinds::choice::{Choice, ChoiceItem, ChoiceValue};
pub use kinds::colour::{Colour, ColourValue};
pub use kinds::geometry::{Bounds, BoundsValue, Point, PointValue};
pub use kinds::list::List;
pub use kinds::number::{Int, Percentage, Real};
pub use kinds::path::FilePath;
pub use list::{PropertyValueList, PropertyValueListBuilder};
pub use listeners::Subscription;
pub use scalar::{PropertyValue, PropertyValueBuilder};
pub use schema::{Schema, SchemaBuilder};
pub use value::{ErasedValue, Value};
