// SPDX-License-Identifier: Apache-2.0
//! Waiting set: deferral of patches blocked on an id not yet covered.

use std::collections::{BTreeMap, VecDeque};

use crate::id::AtomId;
use crate::patch::Patch;

/// An ordered container of patches deferred by [`crate::Readiness::Blocked`],
/// keyed by the id each patch is blocked on.
///
/// Backed by a `BTreeMap<AtomId, VecDeque<Patch>>`: an ordered-map
/// equivalent of the reference implementation's JudyL-of-vectors, giving
/// FIFO order per blocking id and ordered traversal over blocking ids in one
/// structure. Patches are owned outright (a `Vec<u8>`-backed value, not a
/// borrowed pointer into caller memory); dropping the set drops every patch
/// still held by it.
#[derive(Debug, Default)]
pub struct WaitingSet {
    by_blocking_id: BTreeMap<AtomId, VecDeque<Patch>>,
}

impl WaitingSet {
    /// An empty waiting set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `patch`, blocked on `blocking_id`.
    pub fn add(&mut self, blocking_id: AtomId, patch: Patch) {
        self.by_blocking_id.entry(blocking_id).or_default().push_back(patch);
    }

    /// Removes and returns every patch blocked on `blocking_id`, in the
    /// order they were added.
    pub fn take_all_blocked_on(&mut self, blocking_id: AtomId) -> Vec<Patch> {
        self.by_blocking_id
            .remove(&blocking_id)
            .map(VecDeque::into_iter)
            .map(Iterator::collect)
            .unwrap_or_default()
    }

    /// Whether any patch is currently deferred.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_blocking_id.is_empty()
    }

    /// The number of patches currently deferred, across all blocking ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_blocking_id.values().map(VecDeque::len).sum()
    }

    /// Every id some patch is currently blocked on, for the applier's
    /// fixed-point unblocking loop to probe against the current weft.
    #[must_use]
    pub fn blocking_ids(&self) -> Vec<AtomId> {
        self.by_blocking_id.keys().copied().collect()
    }
}
