// SPDX-License-Identifier: Apache-2.0
//! Scouring: the read-side projection from a weave to its visible text.

use crate::atom::{is_visible, CHAR_DEL};
use crate::weave::Weave;

/// Iterates a [`Weave`]'s visible text, left to right.
///
/// A borrowing iterator over the weave's storage, the idiomatic
/// replacement for the reference implementation's caller-supplied output
/// buffer plus cursor state: advancing the iterator needs no separate
/// teardown call, and dropping it releases the borrow.
pub struct Scour<'w> {
    ids: &'w [crate::id::AtomId],
    bodies: &'w [crate::atom::AtomBody],
    pos: usize,
}

impl<'w> Scour<'w> {
    pub(crate) fn new(weave: &'w Weave) -> Self {
        Self { ids: weave.ids(), bodies: weave.bodies(), pos: 0 }
    }
}

impl Iterator for Scour<'_> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.bodies.len() {
            let body = self.bodies[self.pos];
            let id = self.ids[self.pos];
            let next_pos = self.pos + 1;

            if !is_visible(body.char) {
                self.pos = next_pos;
                continue;
            }

            let hidden = self
                .bodies
                .get(next_pos)
                .is_some_and(|next| next.char == CHAR_DEL && next.pred == id);

            self.pos = next_pos;
            if hidden {
                continue;
            }

            // A visible, non-tombstoned code point can still fail to be a
            // valid Unicode scalar (e.g. a lone surrogate half slipped in
            // through an untrusted patch); skip it rather than treating it
            // as end-of-iteration.
            if let Some(c) = char::from_u32(body.char) {
                return Some(c);
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::atom::Atom;
    use crate::id::AtomId;
    use crate::patch::PatchBuilder;
    use crate::weave::Weave;

    fn atom(id: (u32, u32), pred: (u32, u32), char: u32) -> Atom {
        Atom { id: AtomId::pack(id.0, id.1), pred: AtomId::pack(pred.0, pred.1), char }
    }

    // ── 1. an empty weave scours to the empty string ─────────────────────
    #[test]
    fn empty_weave_scours_empty() {
        assert_eq!(Weave::new().scour_to_string(), "");
    }

    // ── 2. visible text survives scouring untouched ──────────────────────
    #[test]
    fn visible_text_round_trips() {
        let mut weave = Weave::new();
        weave
            .apply_patch(
                PatchBuilder::new()
                    .insertion_chain(vec![
                        atom((1, 1), (0, 1), 'o' as u32),
                        atom((1, 2), (1, 1), 'k' as u32),
                    ])
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(weave.scour_to_string(), "ok");
    }

    // ── 3. a tombstoned atom is skipped, not its neighbors ────────────────
    #[test]
    fn tombstoned_atom_is_hidden() {
        let mut weave = Weave::new();
        weave
            .apply_patch(
                PatchBuilder::new()
                    .insertion_chain(vec![
                        atom((1, 1), (0, 1), 'a' as u32),
                        atom((1, 2), (1, 1), 'b' as u32),
                        atom((1, 3), (1, 2), 'c' as u32),
                    ])
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        weave
            .apply_patch(
                PatchBuilder::new()
                    .deletion_chain(vec![atom((2, 1), (1, 2), crate::atom::CHAR_DEL)])
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(weave.scour_to_string(), "ac");
    }

    // ── 4. an invalid scalar value is skipped, not treated as end-of-text ─
    #[test]
    fn invalid_scalar_value_is_skipped_not_terminating() {
        let mut weave = Weave::new();
        weave
            .apply_patch(
                PatchBuilder::new()
                    .insertion_chain(vec![
                        atom((1, 1), (0, 1), 'a' as u32),
                        atom((1, 2), (1, 1), 0xD800), // lone surrogate half
                        atom((1, 3), (1, 2), 'b' as u32),
                    ])
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(weave.scour_to_string(), "ab");
    }
}
