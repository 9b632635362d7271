// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binding graph and synchronization.
//!
//! Bound containers keep weak back-references to each other. When a bound
//! container notifies, the engine walks every container reachable through
//! edges of the relevant kind, brings each one in line with the container it
//! was reached from, and only then releases the listener calls of the whole
//! component as one batch. No listener ever sees a half-synchronized graph.
//!
//! Traversal is breadth-first with a visited set keyed by [`ValueId`], so
//! cycles (A–B, B–C, C–A) terminate and each container is updated at most once
//! per change. The direct parent of every reached container is recorded
//! because list synchronization follows the item map of a direct edge.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bitflags::bitflags;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use understory_callqueue::{Call, CallQueue};

use crate::attributes::AttributeKey;
use crate::id::ValueId;
use crate::value::ErasedValue;

bitflags! {
    /// What a binding keeps in sync.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct BindFlags: u8 {
        /// Values propagate across the edge.
        const VALUE = 1;
        /// Attributes propagate across the edge.
        const ATTRIBUTES = 1 << 1;
    }
}

impl Default for BindFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Bijection between the items of two bound lists.
///
/// One map is shared by both ends of a list edge. `left` names the list whose
/// items are the forward keys.
#[derive(Debug)]
pub(crate) struct ItemMap {
    left: ValueId,
    forward: HashMap<ValueId, ValueId>,
    reverse: HashMap<ValueId, ValueId>,
}

pub(crate) type SharedItemMap = Rc<RefCell<ItemMap>>;

impl ItemMap {
    pub(crate) fn new(left: ValueId) -> Self {
        Self {
            left,
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    fn sides(&mut self, side: ValueId) -> (&mut HashMap<ValueId, ValueId>, &mut HashMap<ValueId, ValueId>) {
        if side == self.left {
            (&mut self.forward, &mut self.reverse)
        } else {
            (&mut self.reverse, &mut self.forward)
        }
    }

    /// Item of the other list paired with `item` of list `side`.
    pub(crate) fn partner(&self, side: ValueId, item: ValueId) -> Option<ValueId> {
        if side == self.left {
            self.forward.get(&item).copied()
        } else {
            self.reverse.get(&item).copied()
        }
    }

    pub(crate) fn insert(&mut self, side: ValueId, mine: ValueId, theirs: ValueId) {
        let (mine_to_theirs, theirs_to_mine) = self.sides(side);
        mine_to_theirs.insert(mine, theirs);
        theirs_to_mine.insert(theirs, mine);
    }

    pub(crate) fn remove(&mut self, side: ValueId, mine: ValueId) -> Option<ValueId> {
        let (mine_to_theirs, theirs_to_mine) = self.sides(side);
        let theirs = mine_to_theirs.remove(&mine)?;
        theirs_to_mine.remove(&theirs);
        Some(theirs)
    }

    /// Every `(mine, theirs)` pair as seen from list `side`.
    pub(crate) fn pairs(&self, side: ValueId) -> Vec<(ValueId, ValueId)> {
        let map = if side == self.left {
            &self.forward
        } else {
            &self.reverse
        };
        map.iter().map(|(a, b)| (*a, *b)).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.forward.len()
    }
}

pub(crate) struct Edge<H> {
    partner: H,
    partner_id: ValueId,
    flags: BindFlags,
    items: Option<SharedItemMap>,
}

/// The binding edges stored on one container.
pub(crate) struct Edges<H> {
    edges: SmallVec<[Edge<H>; 2]>,
}

impl<H> Default for Edges<H> {
    fn default() -> Self {
        Self {
            edges: SmallVec::new(),
        }
    }
}

impl<H> Edges<H> {
    fn find(&self, partner: ValueId) -> Option<usize> {
        self.edges.iter().position(|e| e.partner_id == partner)
    }

    pub(crate) fn items_with(&self, partner: ValueId) -> Option<SharedItemMap> {
        self.find(partner).and_then(|idx| self.edges[idx].items.clone())
    }

    /// Item maps of every list edge, dead partners included.
    pub(crate) fn item_maps(&self) -> Vec<SharedItemMap> {
        self.edges.iter().filter_map(|e| e.items.clone()).collect()
    }

    fn add(&mut self, partner: H, partner_id: ValueId, flags: BindFlags, items: Option<SharedItemMap>) {
        match self.find(partner_id) {
            Some(idx) => {
                let edge = &mut self.edges[idx];
                edge.flags |= flags;
                if items.is_some() {
                    edge.items = items;
                }
            }
            None => self.edges.push(Edge {
                partner,
                partner_id,
                flags,
                items,
            }),
        }
    }

    fn remove(&mut self, partner: ValueId, flags: BindFlags) -> Option<SharedItemMap> {
        let idx = self.find(partner)?;
        let edge = &mut self.edges[idx];
        edge.flags -= flags;
        let items = if flags.contains(BindFlags::VALUE) {
            edge.items.take()
        } else {
            None
        };
        if edge.flags.is_empty() {
            self.edges.remove(idx);
        }
        items
    }

    fn flags_with(&self, partner: ValueId) -> BindFlags {
        self.find(partner)
            .map_or(BindFlags::empty(), |idx| self.edges[idx].flags)
    }
}

/// A container the engine can synchronize.
pub(crate) trait SyncNode: Clone + 'static {
    /// Non-owning handle stored in partner edges.
    type Handle: Clone;

    fn node_id(&self) -> ValueId;
    fn node_name(&self) -> Rc<str>;
    fn downgrade(&self) -> Self::Handle;
    fn upgrade(handle: &Self::Handle) -> Option<Self>;
    fn edges(&self) -> &RefCell<Edges<Self::Handle>>;
    fn queue(&self) -> CallQueue;
    fn set_syncing(&self, syncing: bool);

    /// Copies `parent`'s value onto this node without notifying.
    ///
    /// Returns `None` if the node already matched. Otherwise returns the
    /// item-level calls to release after the node's own notification.
    fn sync_value_from(&self, parent: &Self) -> Option<Vec<Call>>;
    /// Stores an attribute without notifying. Returns `true` if it changed.
    fn sync_attribute(&self, key: &str, value: &ErasedValue) -> bool;
    fn value_calls(&self) -> Vec<Call>;
    fn attribute_calls(&self, key: &AttributeKey, value: &ErasedValue) -> Vec<Call>;
    /// Follow-up work once an attribute change has been announced.
    fn after_attribute_change(&self, key: &AttributeKey, value: &ErasedValue);
}

/// Live partners of `node` over edges carrying any of `flags`. Dead edges are
/// pruned.
pub(crate) fn partners<N: SyncNode>(node: &N, flags: BindFlags) -> Vec<N> {
    let mut edges = node.edges().borrow_mut();
    let mut live = Vec::new();
    edges.edges.retain(|edge| match N::upgrade(&edge.partner) {
        Some(partner) => {
            if edge.flags.intersects(flags) {
                live.push(partner);
            }
            true
        }
        None => false,
    });
    live
}

pub(crate) fn has_partners<N: SyncNode>(node: &N, flags: BindFlags) -> bool {
    !partners(node, flags).is_empty()
}

/// Adds (or widens) the symmetric edge between `a` and `b`.
pub(crate) fn link<N: SyncNode>(a: &N, b: &N, flags: BindFlags, items: Option<SharedItemMap>) {
    a.edges()
        .borrow_mut()
        .add(b.downgrade(), b.node_id(), flags, items.clone());
    b.edges()
        .borrow_mut()
        .add(a.downgrade(), a.node_id(), flags, items);
    tracing::debug!(left = %a.node_name(), right = %b.node_name(), ?flags, "bound");
}

/// Removes `flags` from the edge between `a` and `b` on both ends. Returns
/// the item map if the value binding was dropped.
pub(crate) fn unlink<N: SyncNode>(a: &N, b: &N, flags: BindFlags) -> Option<SharedItemMap> {
    let items = a.edges().borrow_mut().remove(b.node_id(), flags);
    let other = b.edges().borrow_mut().remove(a.node_id(), flags);
    tracing::debug!(left = %a.node_name(), right = %b.node_name(), ?flags, "unbound");
    items.or(other)
}

/// Drops every edge of `node`, on both ends.
pub(crate) fn unlink_all<N: SyncNode>(node: &N) {
    for partner in partners(node, BindFlags::all()) {
        unlink(node, &partner, BindFlags::all());
    }
}

pub(crate) fn is_linked<N: SyncNode>(a: &N, b: &N, flags: BindFlags) -> bool {
    // Prune first so a dead partner never reports as bound.
    let _ = partners(a, BindFlags::all());
    a.edges().borrow().flags_with(b.node_id()).contains(flags)
}

/// Returns `true` if `b` is reachable from `a` over edges carrying `flags`.
pub(crate) fn is_connected<N: SyncNode>(a: &N, b: &N, flags: BindFlags) -> bool {
    let target = b.node_id();
    reachable(a, flags).iter().any(|(node, _)| node.node_id() == target)
}

/// Every container reachable from `source`, paired with the container it was
/// reached from, in breadth-first order.
fn reachable<N: SyncNode>(source: &N, flags: BindFlags) -> Vec<(N, N)> {
    let mut visited = HashSet::new();
    visited.insert(source.node_id());
    let mut frontier = VecDeque::from([source.clone()]);
    let mut order = Vec::new();
    while let Some(node) = frontier.pop_front() {
        for partner in partners(&node, flags) {
            if visited.insert(partner.node_id()) {
                order.push((partner.clone(), node.clone()));
                frontier.push_back(partner);
            }
        }
    }
    order
}

/// Propagates `source`'s value to its bound component, then notifies.
pub(crate) fn propagate_value<N: SyncNode>(source: &N) {
    let reached = reachable(source, BindFlags::VALUE);
    tracing::debug!(source = %source.node_name(), reached = reached.len(), "propagating value");

    source.set_syncing(true);
    let mut updated = Vec::new();
    for (node, parent) in &reached {
        node.set_syncing(true);
        if let Some(deferred) = node.sync_value_from(parent) {
            updated.push((node.clone(), deferred));
        }
    }
    source.set_syncing(false);
    for (node, _) in &reached {
        node.set_syncing(false);
    }

    let mut calls = source.value_calls();
    for (node, deferred) in updated {
        calls.extend(node.value_calls());
        calls.extend(deferred);
    }
    source.queue().call_all(calls);
}

/// Propagates an attribute change to the attribute-bound component, then
/// notifies.
pub(crate) fn propagate_attribute<N: SyncNode>(source: &N, key: &AttributeKey, value: &ErasedValue) {
    let reached = reachable(source, BindFlags::ATTRIBUTES);
    tracing::debug!(source = %source.node_name(), %key, reached = reached.len(), "propagating attribute");

    source.set_syncing(true);
    let mut updated = Vec::new();
    for (node, _) in reached {
        node.set_syncing(true);
        if node.sync_attribute(key, value) {
            updated.push(node);
        } else {
            node.set_syncing(false);
        }
    }
    source.set_syncing(false);
    for node in &updated {
        node.set_syncing(false);
    }

    let mut calls = source.attribute_calls(key, value);
    for node in &updated {
        calls.extend(node.attribute_calls(key, value));
    }
    source.queue().call_all(calls);

    source.after_attribute_change(key, value);
    for node in &updated {
        node.after_attribute_change(key, value);
    }
}
