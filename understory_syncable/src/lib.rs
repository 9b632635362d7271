// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Syncable: property hosts that follow a parent.
//!
//! A [`SyncableHost`] wraps a [`HasProperties`](understory_property::HasProperties).
//! Built without a parent it is an ordinary host. Built with a parent of the
//! same [`Schema`](understory_property::Schema), every public property is
//! bound to the parent's property of the same name, and can be released and
//! re-bound one property at a time.
//!
//! - `nobind` names properties that never follow the parent.
//! - `nounbind` names properties that can never be released.
//!
//! The sync state of each property is itself a property: a hidden Boolean
//! named by [`sync_property_name`], so it can be observed with
//! [`SyncableHost::add_sync_change_listener`] or bound like any other value.

mod error;
mod host;

pub use error::SyncError;
pub use host::{SYNC_PREFIX, SyncableHost, SyncableHostBuilder, sync_property_name};
