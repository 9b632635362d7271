// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;
use core::ops::Deref;
use std::rc::Rc;

use hashbrown::HashSet;
use tracing::debug;
use understory_callqueue::{CallError, CallResult};
use understory_property::{
    BindFlags, Boolean, Context, Descriptor, ErasedChange, HasProperties, HostOptions,
    PropertyError, Schema, ValidationError,
};

use crate::error::SyncError;

/// Prefix of the hidden Boolean property that toggles syncing of a property.
pub const SYNC_PREFIX: &str = "_sync_";

const PARENT_LISTENER: &str = "_parent";

/// Name of the hidden property controlling whether `name` follows the parent.
#[must_use]
pub fn sync_property_name(name: &str) -> String {
    format!("{SYNC_PREFIX}{name}")
}

struct SyncInner {
    host: HasProperties,
    parent: Option<SyncableHost>,
    nobind: HashSet<Rc<str>>,
    nounbind: HashSet<Rc<str>>,
}

/// A property host that can follow a parent host of the same schema.
///
/// A root host behaves like a plain [`HasProperties`]. A child host carries
/// one hidden Boolean (`_sync_<name>`, see [`sync_property_name`]) per
/// public property; while it is `true` the property is bound to the parent's
/// property of the same name, value and attributes. Writing the hidden
/// property, or calling [`sync_to_parent`](Self::sync_to_parent) and
/// [`unsync_from_parent`](Self::unsync_from_parent), binds and unbinds.
///
/// ```rust
/// use understory_property::{Descriptor, Int, Schema};
/// use understory_syncable::SyncableHost;
///
/// let mut builder = Schema::builder("Layer");
/// let opacity = builder.register("opacity", &Descriptor::from(Int::new())).unwrap();
/// let schema = builder.build();
///
/// let parent = SyncableHost::builder(&schema).build().unwrap();
/// let child = SyncableHost::builder(&schema).parent(&parent).build().unwrap();
///
/// parent.set(opacity, 40).unwrap();
/// assert_eq!(child.get(opacity).unwrap(), 40);
///
/// child.unsync_from_parent("opacity").unwrap();
/// parent.set(opacity, 90).unwrap();
/// assert_eq!(child.get(opacity).unwrap(), 40);
///
/// child.sync_to_parent("opacity").unwrap();
/// assert_eq!(child.get(opacity).unwrap(), 90);
/// ```
#[derive(Clone)]
pub struct SyncableHost {
    inner: Rc<SyncInner>,
}

impl SyncableHost {
    /// Starts building a host of `schema`.
    pub fn builder(schema: &Schema) -> SyncableHostBuilder {
        SyncableHostBuilder {
            schema: schema.clone(),
            parent: None,
            nobind: HashSet::new(),
            nounbind: HashSet::new(),
            options: HostOptions::new(),
        }
    }

    /// The wrapped host.
    #[must_use]
    pub fn host(&self) -> &HasProperties {
        &self.inner.host
    }

    /// The parent this host syncs with, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.inner.parent.as_ref()
    }

    /// Binds `name` to the parent.
    pub fn sync_to_parent(&self, name: &str) -> Result<(), SyncError> {
        self.check_child(name)?;
        if !self.can_be_synced_to_parent(name) {
            return Err(SyncError::NoBind {
                name: Rc::from(name),
            });
        }
        self.inner.host.set_as(&sync_property_name(name), true)?;
        Ok(())
    }

    /// Unbinds `name` from the parent.
    pub fn unsync_from_parent(&self, name: &str) -> Result<(), SyncError> {
        self.check_child(name)?;
        if !self.can_be_unsynced_from_parent(name) {
            return Err(SyncError::NoUnbind {
                name: Rc::from(name),
            });
        }
        self.inner.host.set_as(&sync_property_name(name), false)?;
        Ok(())
    }

    /// Whether `name` currently follows the parent. Always `false` for a
    /// root host.
    pub fn is_synced_to_parent(&self, name: &str) -> Result<bool, SyncError> {
        self.check_property(name)?;
        if self.inner.parent.is_none() {
            return Ok(false);
        }
        Ok(self.inner.host.get_as::<bool>(&sync_property_name(name))?)
    }

    /// Whether `name` may be bound to the parent.
    #[must_use]
    pub fn can_be_synced_to_parent(&self, name: &str) -> bool {
        !self.inner.nobind.contains(name)
    }

    /// Whether `name` may be unbound from the parent.
    #[must_use]
    pub fn can_be_unsynced_from_parent(&self, name: &str) -> bool {
        !self.inner.nounbind.contains(name)
    }

    /// Registers `callback` to run whenever the sync state of `name` changes.
    ///
    /// The change carries the new state as a `bool`.
    pub fn add_sync_change_listener(
        &self,
        name: &str,
        listener: &str,
        callback: impl Fn(&ErasedChange) -> CallResult + 'static,
    ) -> Result<(), SyncError> {
        self.check_child(name)?;
        self.inner
            .host
            .add_listener(&sync_property_name(name), listener, callback, false)?;
        Ok(())
    }

    /// Removes a listener added with
    /// [`add_sync_change_listener`](Self::add_sync_change_listener).
    pub fn remove_sync_change_listener(&self, name: &str, listener: &str) -> Result<bool, SyncError> {
        self.check_child(name)?;
        Ok(self
            .inner
            .host
            .remove_listener(&sync_property_name(name), listener)?)
    }

    fn check_property(&self, name: &str) -> Result<(), SyncError> {
        if name.starts_with('_') || !self.inner.host.has_property(name) {
            return Err(PropertyError::UnknownProperty {
                name: Rc::from(name),
            }
            .into());
        }
        Ok(())
    }

    fn check_child(&self, name: &str) -> Result<(), SyncError> {
        self.check_property(name)?;
        if self.inner.parent.is_none() {
            return Err(SyncError::NoParent);
        }
        Ok(())
    }

    /// Adds the hidden toggle for `name` and makes the initial binding.
    fn init_sync(&self, name: &Rc<str>, parent: &Self) -> Result<(), SyncError> {
        let bindable = self.can_be_synced_to_parent(name);
        let pinned = bindable && !self.can_be_unsynced_from_parent(name);
        let sync_name = sync_property_name(name);
        let descriptor = Descriptor::builder(Boolean::new())
            .default(bindable)
            .allow_invalid(false)
            .validate(move |_, _, synced: &bool| {
                if *synced && !bindable {
                    Err(ValidationError::new("cannot be bound to the parent"))
                } else if !*synced && pinned {
                    Err(ValidationError::new("cannot be unbound from the parent"))
                } else {
                    Ok(())
                }
            })
            .build();
        self.inner.host.add_property(&sync_name, &descriptor)?;
        if !bindable {
            return Ok(());
        }
        if !pinned {
            let target = parent.inner.host.context();
            let name = name.clone();
            self.inner.host.add_listener(
                &sync_name,
                &format!("{sync_name}{PARENT_LISTENER}"),
                move |change| sync_changed(change, &target, &name),
                false,
            )?;
        }
        self.inner
            .host
            .bind_props(name, &parent.inner.host, name, BindFlags::all())?;
        Ok(())
    }
}

/// Follows a toggle of a hidden sync property.
fn sync_changed(change: &ErasedChange, parent: &Context, name: &str) -> CallResult {
    let (Some(child), Some(parent)) = (change.context.host(), parent.host()) else {
        return Ok(());
    };
    let synced = change.value.get::<bool>().unwrap_or(false);
    let result = if synced {
        child.bind_props(name, &parent, name, BindFlags::all())
    } else {
        child.unbind_props(name, &parent, name, BindFlags::all())
    };
    debug!(property = name, synced, "parent sync changed");
    result.map_err(|err| CallError::msg(err.to_string()))
}

impl Deref for SyncableHost {
    type Target = HasProperties;

    fn deref(&self) -> &HasProperties {
        &self.inner.host
    }
}

impl fmt::Debug for SyncableHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncableHost")
            .field("host", &self.inner.host)
            .field("has_parent", &self.inner.parent.is_some())
            .field("nobind", &self.inner.nobind)
            .field("nounbind", &self.inner.nounbind)
            .finish()
    }
}

/// Builder for [`SyncableHost`].
#[must_use]
pub struct SyncableHostBuilder {
    schema: Schema,
    parent: Option<SyncableHost>,
    nobind: HashSet<Rc<str>>,
    nounbind: HashSet<Rc<str>>,
    options: HostOptions,
}

impl SyncableHostBuilder {
    /// Makes the host a child of `parent`.
    pub fn parent(mut self, parent: &SyncableHost) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Properties that are never bound to the parent.
    pub fn nobind<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.nobind.extend(names.into_iter().map(Rc::from));
        self
    }

    /// Properties that can never be unbound from the parent.
    pub fn nounbind<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.nounbind.extend(names.into_iter().map(Rc::from));
        self
    }

    /// Options for the wrapped host.
    pub fn options(mut self, options: HostOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the host and, for a child, binds every syncable property.
    pub fn build(self) -> Result<SyncableHost, SyncError> {
        if let Some(parent) = &self.parent
            && !parent.schema().ptr_eq(&self.schema)
        {
            return Err(SyncError::ParentMismatch {
                child: Rc::from(self.schema.name()),
                parent: Rc::from(parent.schema().name()),
            });
        }
        let host = SyncableHost {
            inner: Rc::new(SyncInner {
                host: HasProperties::with_options(&self.schema, self.options),
                parent: self.parent,
                nobind: self.nobind,
                nounbind: self.nounbind,
            }),
        };
        if let Some(parent) = host.parent() {
            for name in host.inner.host.all_properties() {
                host.init_sync(&name, parent)?;
            }
            debug!(schema = self.schema.name(), "bound child host to parent");
        }
        Ok(host)
    }
}

impl fmt::Debug for SyncableHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncableHostBuilder")
            .field("schema", &self.schema)
            .field("has_parent", &self.parent.is_some())
            .finish_non_exhaustive()
    }
}
