// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use thiserror::Error;
use understory_property::PropertyError;

/// Errors surfaced by [`SyncableHost`](crate::SyncableHost).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The parent host was built from a different schema.
    #[error("parent is a `{parent}`, expected a `{child}`")]
    ParentMismatch {
        /// Schema of the child.
        child: Rc<str>,
        /// Schema of the rejected parent.
        parent: Rc<str>,
    },
    /// The host has no parent to sync with.
    #[error("host has no parent")]
    NoParent,
    /// The property is in the child's `nobind` set.
    #[error("`{name}` cannot be bound to the parent")]
    NoBind {
        /// Property name.
        name: Rc<str>,
    },
    /// The property is in the child's `nounbind` set.
    #[error("`{name}` cannot be unbound from the parent")]
    NoUnbind {
        /// Property name.
        name: Rc<str>,
    },
    /// An underlying host operation failed.
    #[error("{0}")]
    Property(#[from] PropertyError),
}
