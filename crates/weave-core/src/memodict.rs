// SPDX-License-Identifier: Apache-2.0
//! Memoization dictionary: per-atom awareness wefts for O(1) `pull`.

use std::collections::BTreeMap;

use crate::id::AtomId;
use crate::weft::Weft;

/// Maps each atom id with a cross-yarn predecessor to the awareness weft of
/// its causal ancestors.
///
/// Represented as `yarn -> (offset -> weft)`: an outer map keyed by yarn, an
/// inner map keyed by offset. Offsets within a yarn are monotonic, so a
/// lookup for an unmapped offset returns the weft stored at the nearest
/// mapped offset at or below it ([`BTreeMap::range`] in place of the
/// reference implementation's `JLL` "find or predecessor" Judy operation).
#[derive(Clone, Debug, Default)]
pub struct Memodict {
    yarns: BTreeMap<u32, BTreeMap<u32, Weft>>,
}

impl Memodict {
    /// An empty memoization dict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `weft` as the awareness weft of `id`, replacing any existing
    /// entry at the same `(yarn, offset)`.
    pub fn add(&mut self, id: AtomId, weft: Weft) {
        self.yarns.entry(id.yarn()).or_default().insert(id.offset(), weft);
    }

    /// Returns the awareness weft stored at the largest offset `<=
    /// offset(id)` within `yarn(id)`, or an empty weft if none is stored.
    #[must_use]
    pub fn get(&self, id: AtomId) -> Weft {
        self.yarns
            .get(&id.yarn())
            .and_then(|offsets| offsets.range(..=id.offset()).next_back())
            .map(|(_, weft)| weft.clone())
            .unwrap_or_default()
    }

    /// Computes the awareness weft of `id`, given its predecessor `pred`.
    ///
    /// Starts from a copy of `get(id)`, extends it to cover `id` itself,
    /// and — if `pred` is not the sentinel zero id — merges in `get(pred)`
    /// and extends to cover `pred` as well. This is the sole entry point
    /// the patch applier uses to determine sibling placement order; it
    /// relies on the memodict having already been populated for every
    /// cross-yarn predecessor in the weave (by [`Memodict::add`] during
    /// index building, never lazily during splice).
    #[must_use]
    pub fn pull(&self, id: AtomId, pred: AtomId) -> Weft {
        let mut weft = self.get(id);
        weft.extend(id.yarn(), id.offset());

        if pred.raw() != 0 {
            let pred_weft = self.get(pred);
            weft.merge_into(&pred_weft);
            weft.extend(pred.yarn(), pred.offset());
        }

        weft
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn demo_weft() -> Weft {
        let mut weft = Weft::new();
        weft.set(3, 33);
        weft.set(0, 108);
        weft.extend(7, 2);
        weft.extend(7, 77);
        weft.extend(7, 32);
        weft
    }

    // ── 1. lookup on an unmapped yarn returns empty ──────────────────────
    #[test]
    fn lookup_on_unmapped_yarn_is_empty() {
        let memodict = Memodict::new();
        assert_eq!(memodict.get(AtomId::pack(1, 30)), Weft::new());
    }

    // ── 2. exact offset lookup returns the stored weft ───────────────────
    #[test]
    fn exact_offset_lookup() {
        let mut memodict = Memodict::new();
        memodict.add(AtomId::pack(1, 119), demo_weft());
        assert_eq!(memodict.get(AtomId::pack(1, 119)), demo_weft());
    }

    // ── 3. lookup past the stored offset returns the nearest predecessor ─
    #[test]
    fn lookup_falls_back_to_predecessor_offset() {
        let mut memodict = Memodict::new();
        memodict.add(AtomId::pack(1, 119), demo_weft());
        assert_eq!(memodict.get(AtomId::pack(1, 125)), demo_weft());
    }

    // ── 4. a different yarn at the same offset stays unmapped ────────────
    #[test]
    fn different_yarn_is_unaffected() {
        let mut memodict = Memodict::new();
        memodict.add(AtomId::pack(1, 119), demo_weft());
        assert_eq!(memodict.get(AtomId::pack(3, 33)), Weft::new());
    }

    // ── 5. add replaces an existing mapping at the same id ───────────────
    #[test]
    fn add_replaces_existing_entry() {
        let mut memodict = Memodict::new();
        let mut first = Weft::new();
        first.set(2, 2222);
        memodict.add(AtomId::pack(2, 229), first);

        let mut second = demo_weft();
        second.set(9, 1);
        memodict.add(AtomId::pack(2, 229), second.clone());

        assert_eq!(memodict.get(AtomId::pack(2, 230)), second);
    }

    // ── 6. pull extends to cover id and, if given, pred ──────────────────
    #[test]
    fn pull_covers_id_and_pred() {
        let memodict = Memodict::new();
        let pulled = memodict.pull(AtomId::pack(1, 4), AtomId::pack(2, 7));
        assert!(pulled.covers(AtomId::pack(1, 4)));
        assert!(pulled.covers(AtomId::pack(2, 7)));
    }

    // ── 7. pull with a zero predecessor ignores it ───────────────────────
    #[test]
    fn pull_with_zero_pred_ignores_it() {
        let memodict = Memodict::new();
        let pulled = memodict.pull(AtomId::pack(1, 4), AtomId::from_raw(0));
        assert!(pulled.covers(AtomId::pack(1, 4)));
        assert_eq!(pulled.get(2), 0);
    }
}
