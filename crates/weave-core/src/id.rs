// SPDX-License-Identifier: Apache-2.0
//! Atom identifiers: packed `(yarn, offset)` pairs.

use std::fmt;

/// A globally unique atom identifier.
///
/// Packed as `(yarn << 32) | offset`, following the source format's
/// `PACK_ID`/`YARN`/`OFFSET` macros. `yarn` names the author timeline an atom
/// was produced on; `offset` is that atom's position within the timeline,
/// starting at 1.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtomId(pub u64);

/// Yarn reserved for the two bootstrap atoms every weave starts with.
pub const BOOTSTRAP_YARN: u32 = 0;

/// Id of the bootstrap `START` atom, `(0, 1)`.
pub const START_ID: AtomId = AtomId::pack(BOOTSTRAP_YARN, 1);

/// Id of the bootstrap `END` atom, `(0, 2)`.
pub const END_ID: AtomId = AtomId::pack(BOOTSTRAP_YARN, 2);

impl AtomId {
    /// Packs a `(yarn, offset)` pair into an id.
    #[must_use]
    pub const fn pack(yarn: u32, offset: u32) -> Self {
        Self(((yarn as u64) << 32) | offset as u64)
    }

    /// The yarn component.
    #[must_use]
    pub const fn yarn(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The offset component.
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0 as u32
    }

    /// The raw packed representation, as written on the wire.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Reconstructs an id from its raw packed representation.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.yarn(), self.offset())
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.yarn(), self.offset())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // ── 1. pack/unpack round-trip ────────────────────────────────────────
    #[test]
    fn pack_unpack_round_trip() {
        let id = AtomId::pack(7, 42);
        assert_eq!(id.yarn(), 7);
        assert_eq!(id.offset(), 42);
    }

    // ── 2. bootstrap ids are fixed ───────────────────────────────────────
    #[test]
    fn bootstrap_ids_are_fixed() {
        assert_eq!(START_ID, AtomId::pack(0, 1));
        assert_eq!(END_ID, AtomId::pack(0, 2));
    }

    // ── 3. ordering follows yarn then offset ─────────────────────────────
    #[test]
    fn ordering_is_yarn_major() {
        assert!(AtomId::pack(1, 9999) < AtomId::pack(2, 0));
        assert!(AtomId::pack(2, 1) < AtomId::pack(2, 2));
    }

    // ── 4. raw round-trips through from_raw ──────────────────────────────
    #[test]
    fn raw_round_trips() {
        let id = AtomId::pack(3, 5);
        assert_eq!(AtomId::from_raw(id.raw()), id);
    }

    // ── 5. display renders yarn.offset ────────────────────────────────────
    #[test]
    fn display_renders_yarn_dot_offset() {
        assert_eq!(format!("{}", AtomId::pack(1, 4)), "1.4");
    }
}
