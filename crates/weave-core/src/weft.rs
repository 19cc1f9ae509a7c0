// SPDX-License-Identifier: Apache-2.0
//! Wefts: the causal frontier, `yarn -> max covered offset`.

use std::collections::BTreeMap;

use crate::id::AtomId;

/// A total mapping `yarn -> offset`, read as "the set of ids `(y, o)` such
/// that `o <= weft[y]`".
///
/// Yarn 0 is special: every weft implicitly covers `(0, 1)` and `(0, 2)`
/// (the bootstrap atoms), and [`Weft::get`] always answers `2` for yarn 0
/// regardless of any stored mapping, matching the reference weft's
/// `weft_get` special case. `set`/`extend` accept yarn 0 without error but
/// have no observable effect on `get(0)`.
///
/// Wefts form a join-semilattice under componentwise max ([`Weft::merge_into`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weft {
    entries: BTreeMap<u32, u32>,
}

impl Weft {
    /// An empty weft (implicitly `(0) -> 2`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The maximum offset covered in `yarn`. Always `2` for yarn 0.
    #[must_use]
    pub fn get(&self, yarn: u32) -> u32 {
        if yarn == 0 {
            return 2;
        }
        self.entries.get(&yarn).copied().unwrap_or(0)
    }

    /// Assigns the top of `yarn` outright, replacing any prior value.
    pub fn set(&mut self, yarn: u32, offset: u32) {
        self.entries.insert(yarn, offset);
    }

    /// Replaces the top of `yarn` with `max(current, offset)`.
    pub fn extend(&mut self, yarn: u32, offset: u32) {
        let entry = self.entries.entry(yarn).or_insert(0);
        if offset > *entry {
            *entry = offset;
        }
    }

    /// Whether this weft covers `id`, i.e. `offset(id) <= get(yarn(id))`.
    #[must_use]
    pub fn covers(&self, id: AtomId) -> bool {
        id.offset() <= self.get(id.yarn())
    }

    /// Merges `other` into `self`, taking the componentwise max (join).
    pub fn merge_into(&mut self, other: &Self) {
        for (&yarn, &offset) in &other.entries {
            self.extend(yarn, offset);
        }
    }

    /// Total ordering used for sibling tie-break during insertion placement.
    ///
    /// Compares entries in **descending** yarn order, lockstep: the weft
    /// reaching into the higher-numbered yarn at the first point of
    /// divergence is greater (an entry at a higher yarn number signals
    /// awareness of a later-registered author's edits, so that author's
    /// concurrent child sorts left of an anchor's existing, less-aware
    /// children); if both have an entry at the same yarn, the larger offset
    /// wins. If one weft's entries are exhausted before the other's, the
    /// weft with entries remaining is greater — this tie-break rule is this
    /// crate's own resolution of an ambiguity the reference implementation
    /// never settled; any two implementations that agree on this rule
    /// converge identically, which is all correctness requires of it.
    #[must_use]
    pub fn gt(&self, other: &Self) -> bool {
        let mut a = self.entries.iter().rev();
        let mut b = other.entries.iter().rev();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return false,
                (Some(_), None) => return true,
                (None, Some(_)) => return false,
                (Some((&ya, &oa)), Some((&yb, &ob))) => {
                    if ya != yb {
                        return ya > yb;
                    }
                    if oa != ob {
                        return oa > ob;
                    }
                }
            }
        }
    }
}
