// SPDX-License-Identifier: Apache-2.0
//! The weave: a linearized causal tree of atoms, and the patch applier.

use std::collections::{HashMap, HashSet};

use crate::atom::{Atom, AtomBody, CHAR_DEL};
use crate::error::WeaveError;
use crate::id::{AtomId, END_ID, START_ID};
use crate::memodict::Memodict;
use crate::patch::{patch_blocking_id, ChainKind, Patch, Readiness};
use crate::waiting_set::WaitingSet;
use crate::weft::Weft;

/// One entry of an insertion vector: insert `atoms` immediately before
/// pre-splice position `at`.
#[derive(Debug, Clone, Copy)]
struct InsertionOp<'p> {
    at: usize,
    atoms: &'p [Atom],
}

/// An insertion chain rooted at some atom, keyed by that atom's id.
struct InsRec<'p> {
    atoms: &'p [Atom],
    is_save: bool,
}

/// A linearized causal tree of atoms, with its causal frontier and the
/// patches still waiting on an id they haven't seen yet.
///
/// Backed by two parallel `Vec`s — `ids` (the hot lookup array) and
/// `bodies` (predecessor and code point) — mirroring the reference
/// implementation's `ids[]`/`bodies[]` split rather than one `Vec<Atom>`,
/// so index-building passes that only need an id (deldict/insdict probes)
/// never touch the wider body record.
#[derive(Debug)]
pub struct Weave {
    ids: Vec<AtomId>,
    bodies: Vec<AtomBody>,
    weft: Weft,
    memodict: Memodict,
    waiting: WaitingSet,
}

impl Default for Weave {
    fn default() -> Self {
        Self::new()
    }
}

impl Weave {
    /// A new weave containing only the bootstrap `START`/`END` atoms.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: vec![START_ID, END_ID],
            bodies: vec![
                AtomBody { pred: START_ID, char: crate::atom::CHAR_START },
                AtomBody { pred: START_ID, char: crate::atom::CHAR_END },
            ],
            weft: Weft::new(),
            memodict: Memodict::new(),
            waiting: WaitingSet::new(),
        }
    }

    /// The number of atoms currently in the weave, bootstrap atoms included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the weave holds only its two bootstrap atoms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.len() <= 2
    }

    /// The weave's current causal frontier.
    #[must_use]
    pub const fn weft(&self) -> &Weft {
        &self.weft
    }

    /// The number of patches currently deferred, blocked on an id not yet
    /// seen.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Applies `patch`, or enqueues it if it arrived out of order.
    ///
    /// Returns the patch's own [`Readiness`] (`Ready` once spliced in,
    /// `Blocked` if enqueued, `Duplicate` if dropped). After a successful
    /// splice, any previously-waiting patch newly unblocked by this one is
    /// applied too, recursively, until a fixed point — so the return value
    /// only describes `patch` itself, not the cascade it may trigger.
    ///
    /// # Errors
    /// Returns [`WeaveError::InvariantViolation`] if the insertion walk for
    /// a ready patch fails to place an atom before reaching `END`. The
    /// weave is left in whatever state it reached before the failing
    /// splice; already-applied chains of the same patch, if any, are not
    /// rolled back, since `WeaveError::InvariantViolation` is not expected
    /// to occur for any patch that passed [`patch_blocking_id`].
    pub fn apply_patch(&mut self, patch: Patch) -> Result<Readiness, WeaveError> {
        let readiness = self.apply_or_enqueue(patch)?;
        self.drain_waiting_set()?;
        Ok(readiness)
    }

    fn apply_or_enqueue(&mut self, patch: Patch) -> Result<Readiness, WeaveError> {
        match patch_blocking_id(&patch, &self.weft) {
            Readiness::Duplicate => {
                tracing::debug!(yarn = patch.yarn(), "dropped duplicate patch");
                Ok(Readiness::Duplicate)
            }
            Readiness::Blocked(on) => {
                tracing::debug!(yarn = patch.yarn(), blocking = %on, "deferred patch");
                self.waiting.add(on, patch);
                Ok(Readiness::Blocked(on))
            }
            Readiness::Ready => {
                self.splice_ready_patch(&patch)?;
                tracing::debug!(
                    yarn = patch.yarn(),
                    highest_offset = patch.highest_offset(),
                    "applied patch"
                );
                Ok(Readiness::Ready)
            }
        }
    }

    fn drain_waiting_set(&mut self) -> Result<(), WeaveError> {
        loop {
            let mut unblocked = Vec::new();
            for blocking_id in self.waiting.blocking_ids() {
                if self.weft.covers(blocking_id) {
                    unblocked.extend(self.waiting.take_all_blocked_on(blocking_id));
                }
            }
            if unblocked.is_empty() {
                return Ok(());
            }
            for patch in unblocked {
                self.apply_or_enqueue(patch)?;
            }
        }
    }

    fn splice_ready_patch(&mut self, patch: &Patch) -> Result<(), WeaveError> {
        let (deldict, insdict) = self.build_indexes(patch);
        let ops = self.build_insertion_vector(&deldict, &insdict)?;
        self.splice_insertions(ops);

        let highest = patch.highest_id();
        self.weft.extend(highest.yarn(), highest.offset());
        Ok(())
    }

    /// Builds the deletion and insertion indexes for one pass over
    /// `patch`'s chains, and populates the memodict for every atom with a
    /// cross-yarn predecessor (§4.7 step 1: done here, during index
    /// building, never lazily during the splice itself).
    #[allow(clippy::type_complexity)]
    fn build_indexes<'p>(
        &mut self,
        patch: &'p Patch,
    ) -> (HashMap<AtomId, Atom>, HashMap<AtomId, InsRec<'p>>) {
        let mut deldict = HashMap::new();
        let mut insdict = HashMap::new();

        for chain in patch.chains() {
            match chain.kind() {
                ChainKind::Deletion => {
                    for atom in chain.atoms() {
                        deldict.insert(atom.pred, *atom);
                        self.memoize_if_cross_yarn(atom);
                    }
                }
                ChainKind::SaveAwareness => {
                    for atom in chain.atoms() {
                        self.memoize_if_cross_yarn(atom);
                    }
                    insdict.insert(
                        END_ID,
                        InsRec { atoms: chain.atoms(), is_save: true },
                    );
                }
                ChainKind::Insertion => {
                    let head = chain.head();
                    self.memoize_if_cross_yarn(head);
                    for atom in &chain.atoms()[1..] {
                        self.memoize_if_cross_yarn(atom);
                    }
                    insdict.insert(
                        head.pred,
                        InsRec { atoms: chain.atoms(), is_save: false },
                    );
                }
            }
        }

        (deldict, insdict)
    }

    /// Records `pull(atom.id, atom.pred)` in the memodict iff `atom.pred`
    /// crosses yarns (a same-yarn predecessor never needs a memoized
    /// awareness weft: its position in the yarn already orders it).
    fn memoize_if_cross_yarn(&mut self, atom: &Atom) {
        if atom.pred.yarn() != atom.id.yarn() {
            let weft = self.memodict.pull(atom.id, atom.pred);
            self.memodict.add(atom.id, weft);
        }
    }

    /// The one-pass traversal of §4.7 step 2: walks the existing weave and
    /// decides, for every atom that is a deletion or insertion target, where
    /// the new chain lands.
    fn build_insertion_vector<'p>(
        &self,
        deldict: &HashMap<AtomId, Atom>,
        insdict: &HashMap<AtomId, InsRec<'p>>,
    ) -> Result<Vec<InsertionOp<'p>>, WeaveError> {
        let len = self.ids.len();
        let mut ops = Vec::new();

        for i in 0..len {
            let a_id = self.ids[i];

            if let Some(tombstone) = deldict.get(&a_id) {
                ops.push(InsertionOp {
                    at: i + 1,
                    atoms: std::slice::from_ref(tombstone),
                });
                continue;
            }

            let Some(rec) = insdict.get(&a_id) else {
                continue;
            };

            if rec.is_save {
                ops.push(InsertionOp { at: i + 1, atoms: rec.atoms });
                continue;
            }

            let head = &rec.atoms[0];
            let head_weft = self.memodict.pull(head.id, head.pred);

            let mut neighbor_pos = i + 1;
            while neighbor_pos < len
                && self.bodies[neighbor_pos].pred == a_id
                && self.bodies[neighbor_pos].char == CHAR_DEL
            {
                neighbor_pos += 1;
            }

            let at = self.place_among_siblings(a_id, head_weft, neighbor_pos, len)?;
            ops.push(InsertionOp { at, atoms: rec.atoms });
        }

        Ok(ops)
    }

    /// Finds the splice position for an insertion chain rooted at `a_id`,
    /// given its awareness weft and the position of its first candidate
    /// right-neighbor sibling.
    fn place_among_siblings(
        &self,
        a_id: AtomId,
        head_weft: Weft,
        mut neighbor_pos: usize,
        len: usize,
    ) -> Result<usize, WeaveError> {
        loop {
            if neighbor_pos >= len {
                return Err(WeaveError::InvariantViolation {
                    anchor: a_id,
                    detail: "insertion walk ran past the end of the weave".to_owned(),
                });
            }

            let neighbor_id = self.ids[neighbor_pos];
            if head_weft.covers(neighbor_id) {
                return Ok(neighbor_pos);
            }

            let neighbor_weft = self.memodict.pull(neighbor_id, AtomId::from_raw(0));
            if head_weft.gt(&neighbor_weft) {
                return Ok(neighbor_pos);
            }

            // Skip this neighbor's entire causal block: track the block's
            // exact membership as a set of ids, not a weft. `Weft::covers`
            // special-cases yarn 0 to always answer `true` (the bootstrap
            // atoms are implicitly covered by every weft), so testing
            // membership with `covers` would silently absorb `END` (whose
            // `pred` is `START`, yarn 0) into every block and walk the
            // cursor past the end of the weave.
            let mut block_members: HashSet<AtomId> = HashSet::new();
            block_members.insert(neighbor_id);
            let mut p = neighbor_pos + 1;
            while p < len {
                let pred = self.bodies[p].pred;
                if block_members.contains(&pred) {
                    block_members.insert(self.ids[p]);
                    p += 1;
                } else {
                    break;
                }
            }
            neighbor_pos = p;
        }
    }

    /// Applies an insertion vector to the weave's storage.
    ///
    /// Picks in-place growth or a reallocate-sized reserve by consulting
    /// `Vec::capacity()` (§4.6): when the new length already fits inside
    /// the current capacity the existing buffer is shifted in place by
    /// `Vec::insert`; otherwise capacity is grown to the next power of two
    /// first, matching the reference implementation's doubling policy
    /// rather than relying on the standard library's unspecified growth
    /// factor. Both paths produce identical content and order.
    fn splice_insertions(&mut self, mut ops: Vec<InsertionOp<'_>>) {
        if ops.is_empty() {
            return;
        }
        ops.sort_by_key(|op| op.at);

        let atom_count: usize = ops.iter().map(|op| op.atoms.len()).sum();
        let new_len = self.ids.len() + atom_count;

        if new_len > self.ids.capacity() {
            let target = new_len.next_power_of_two();
            self.ids.reserve_exact(target - self.ids.len());
            self.bodies.reserve_exact(target - self.bodies.len());
        }

        let mut shift = 0usize;
        for op in &ops {
            let at = op.at + shift;
            for (k, atom) in op.atoms.iter().enumerate() {
                self.ids.insert(at + k, atom.id);
                self.bodies.insert(at + k, AtomBody { pred: atom.pred, char: atom.char });
            }
            shift += op.atoms.len();
        }
    }

    /// Iterates the weave's visible text, left to right, skipping control
    /// atoms and any atom immediately followed by a tombstone targeting it.
    #[must_use]
    pub fn scour(&self) -> crate::scour::Scour<'_> {
        crate::scour::Scour::new(self)
    }

    /// Collects [`Weave::scour`] into an owned `String`.
    #[must_use]
    pub fn scour_to_string(&self) -> String {
        self.scour().collect()
    }

    pub(crate) fn ids(&self) -> &[AtomId] {
        &self.ids
    }

    pub(crate) fn bodies(&self) -> &[AtomBody] {
        &self.bodies
    }
}
