// SPDX-License-Identifier: Apache-2.0
//! Atoms: the unit of edit, and the four reserved control code points.

use crate::id::AtomId;

/// Marks the bootstrap start of a weave. Never visible in scoured text.
pub const CHAR_START: u32 = 0xE000;
/// Marks the bootstrap end of a weave. Never visible in scoured text.
pub const CHAR_END: u32 = 0xE001;
/// A tombstone, recording that its `pred` atom has been deleted.
pub const CHAR_DEL: u32 = 0xE002;
/// A save-awareness marker, recording that one yarn has observed another.
pub const CHAR_SAVE: u32 = 0xE003;

/// Returns whether a code point is a visible character, i.e. none of the
/// four reserved control codes.
#[must_use]
pub const fn is_visible(char: u32) -> bool {
    !matches!(char, CHAR_START | CHAR_END | CHAR_DEL | CHAR_SAVE)
}

/// One edit unit: an id, its causal predecessor, and a code point.
///
/// Atoms are immutable once created. `pred` names the causal parent in the
/// tree; for insertion atoms after the first in a chain, `pred` is the
/// previous atom in the chain (a strand). For deletion and save-awareness
/// atoms, `pred` names the independently-located atom being acted on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom {
    /// This atom's own id.
    pub id: AtomId,
    /// The causal predecessor.
    pub pred: AtomId,
    /// The code point, or one of the `CHAR_*` control constants.
    pub char: u32,
}

/// Size in bytes of one atom in the wire format: `id:8, pred:8, char:4`.
pub const ATOM_WIRE_LEN: usize = 20;

impl Atom {
    /// Whether this atom is a visible character (not a control atom).
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        is_visible(self.char)
    }

    /// Whether this atom is a tombstone.
    #[must_use]
    pub const fn is_deletion(&self) -> bool {
        self.char == CHAR_DEL
    }

    /// Whether this atom is a save-awareness marker.
    #[must_use]
    pub const fn is_save(&self) -> bool {
        self.char == CHAR_SAVE
    }

    /// Appends this atom's 20-byte big-endian wire encoding to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.id.raw().to_be_bytes());
        buf.extend_from_slice(&self.pred.raw().to_be_bytes());
        buf.extend_from_slice(&self.char.to_be_bytes());
    }

    /// Parses one atom from the first 20 bytes of `bytes`, big-endian.
    ///
    /// Returns `None` if fewer than [`ATOM_WIRE_LEN`] bytes are available.
    #[must_use]
    pub fn read_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < ATOM_WIRE_LEN {
            return None;
        }
        let id = u64::from_be_bytes(bytes[0..8].try_into().ok()?);
        let pred = u64::from_be_bytes(bytes[8..16].try_into().ok()?);
        let char = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
        Some(Self {
            id: AtomId::from_raw(id),
            pred: AtomId::from_raw(pred),
            char,
        })
    }
}

/// An atom's body, stored alongside its id in the weave's parallel arrays.
///
/// Splitting `id` from `(pred, char)` mirrors the source's `ids[]`/`bodies[]`
/// split, which keeps the hot id-lookup array densely packed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AtomBody {
    /// The causal predecessor.
    pub pred: AtomId,
    /// The code point, or one of the `CHAR_*` control constants.
    pub char: u32,
}

impl AtomBody {
    /// Whether this atom is a visible character (not a control atom).
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        is_visible(self.char)
    }

    /// Whether this atom is a tombstone.
    #[must_use]
    pub const fn is_deletion(&self) -> bool {
        self.char == CHAR_DEL
    }

    /// Whether this atom is a save-awareness marker.
    #[must_use]
    pub const fn is_save(&self) -> bool {
        self.char == CHAR_SAVE
    }
}
