// SPDX-License-Identifier: Apache-2.0
//! Patch wire format: a set of chains from one yarn, and the readiness
//! predicate that decides whether a patch may be applied yet.

use crate::atom::{Atom, ATOM_WIRE_LEN};
use crate::error::WeaveError;
use crate::id::AtomId;
use crate::weft::Weft;

/// Byte offset of the chain-count field in the wire header.
const HEADER_LEN: usize = 5;
/// Byte size of one chain descriptor: `offset_bytes:u32, len_atoms:u16`.
const CHAIN_DESCRIPTOR_LEN: usize = 6;

/// What kind of edit a [`Chain`]'s atoms perform.
///
/// Determined by the chain's head atom's code point: a chain is homogeneous
/// in kind, never mixing visible characters with control atoms.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChainKind {
    /// A strand of visible characters; atom `i+1`'s predecessor is atom `i`.
    Insertion,
    /// A run of tombstones; each atom's predecessor names its target.
    Deletion,
    /// A run of save-awareness markers; each names a target at `(0, 2)`.
    SaveAwareness,
}

/// A maximal run of atoms within a patch sharing one [`ChainKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    kind: ChainKind,
    atoms: Vec<Atom>,
}

impl Chain {
    /// Builds a chain, inferring its kind from the head atom and validating
    /// internal consistency (homogeneous control codes; for an insertion
    /// chain, each atom's predecessor is the previous atom in the chain).
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if `atoms` is empty or is not
    /// internally consistent for the inferred kind.
    pub fn new(atoms: Vec<Atom>) -> Result<Self, WeaveError> {
        let Some(head) = atoms.first() else {
            return Err(WeaveError::MalformedPatch {
                reason: "chain has no atoms".to_owned(),
            });
        };

        let kind = if head.is_deletion() {
            ChainKind::Deletion
        } else if head.is_save() {
            ChainKind::SaveAwareness
        } else if head.is_visible() {
            ChainKind::Insertion
        } else {
            return Err(WeaveError::MalformedPatch {
                reason: format!("chain head {} has a bootstrap control char", head.id),
            });
        };

        match kind {
            ChainKind::Deletion => {
                if atoms.iter().any(|a| !a.is_deletion()) {
                    return Err(WeaveError::MalformedPatch {
                        reason: "deletion chain mixes atom kinds".to_owned(),
                    });
                }
            }
            ChainKind::SaveAwareness => {
                if atoms.iter().any(|a| !a.is_save()) {
                    return Err(WeaveError::MalformedPatch {
                        reason: "save-awareness chain mixes atom kinds".to_owned(),
                    });
                }
            }
            ChainKind::Insertion => {
                if atoms.iter().any(|a| !a.is_visible()) {
                    return Err(WeaveError::MalformedPatch {
                        reason: "insertion chain mixes atom kinds".to_owned(),
                    });
                }
                for pair in atoms.windows(2) {
                    if pair[1].pred != pair[0].id {
                        return Err(WeaveError::MalformedPatch {
                            reason: format!(
                                "insertion chain atom {} does not follow {} as a strand",
                                pair[1].id, pair[0].id
                            ),
                        });
                    }
                }
            }
        }

        Ok(Self { kind, atoms })
    }

    /// This chain's kind.
    #[must_use]
    pub const fn kind(&self) -> ChainKind {
        self.kind
    }

    /// This chain's atoms, in strand/patch order.
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// This chain's head atom.
    #[must_use]
    pub fn head(&self) -> &Atom {
        // A chain is never empty; enforced by `Chain::new`.
        &self.atoms[0]
    }
}

/// A bundle of chains from a single yarn, with offsets contiguous across the
/// whole patch when taken in yarn order (chains may appear in any order
/// within the wire buffer; only the offsets of the resulting atom set need
/// be contiguous).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    yarn: u32,
    head_offset: u32,
    length_atoms: u32,
    chains: Vec<Chain>,
}

impl Patch {
    /// The yarn every atom in this patch belongs to.
    #[must_use]
    pub const fn yarn(&self) -> u32 {
        self.yarn
    }

    /// The lowest offset among this patch's atoms.
    #[must_use]
    pub const fn head_offset(&self) -> u32 {
        self.head_offset
    }

    /// The id of this patch's head atom, `(yarn, head_offset)`.
    #[must_use]
    pub const fn head_id(&self) -> AtomId {
        AtomId::pack(self.yarn, self.head_offset)
    }

    /// The total number of atoms across all chains, computed and cached once
    /// at construction time (never recomputed, and never the reference
    /// implementation's stubbed `-1`).
    #[must_use]
    pub const fn length_atoms(&self) -> u32 {
        self.length_atoms
    }

    /// The highest offset among this patch's atoms.
    #[must_use]
    pub const fn highest_offset(&self) -> u32 {
        self.head_offset + self.length_atoms - 1
    }

    /// The id of this patch's highest atom, used to extend a weft after a
    /// successful application.
    #[must_use]
    pub const fn highest_id(&self) -> AtomId {
        AtomId::pack(self.yarn, self.highest_offset())
    }

    /// This patch's chains, in the order they were supplied or parsed.
    #[must_use]
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Validates and assembles a finished patch from chains already parsed
    /// or built, shared by [`Patch::from_bytes`] and [`PatchBuilder::build`].
    fn assemble(chains: Vec<Chain>) -> Result<Self, WeaveError> {
        if chains.is_empty() {
            return Err(WeaveError::MalformedPatch {
                reason: "patch has no chains".to_owned(),
            });
        }
        if chains.len() > 255 {
            return Err(WeaveError::MalformedPatch {
                reason: format!("patch has {} chains, more than 255", chains.len()),
            });
        }

        let yarn = chains[0].head().id.yarn();
        let mut offsets: Vec<u32> = Vec::new();
        for chain in &chains {
            for atom in chain.atoms() {
                if atom.id.yarn() != yarn {
                    return Err(WeaveError::MalformedPatch {
                        reason: format!(
                            "patch spans more than one yarn ({} and {})",
                            yarn,
                            atom.id.yarn()
                        ),
                    });
                }
                offsets.push(atom.id.offset());
            }
        }

        offsets.sort_unstable();
        let head_offset = offsets[0];
        for (i, &offset) in offsets.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let expected = head_offset + i as u32;
            if offset != expected {
                return Err(WeaveError::MalformedPatch {
                    reason: format!(
                        "patch offsets are not contiguous: expected {expected}, found {offset}"
                    ),
                });
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let length_atoms = offsets.len() as u32;

        Ok(Self {
            yarn,
            head_offset,
            length_atoms,
            chains,
        })
    }

    /// Computes the buffer size, in bytes, needed to hold a patch with the
    /// given chain and atom counts (including the header and descriptors).
    #[must_use]
    pub const fn necessary_buffer_length(chain_count: u8, atom_count: u32) -> u32 {
        #[allow(clippy::cast_lossless)]
        let header = HEADER_LEN as u32;
        #[allow(clippy::cast_lossless)]
        let descriptors = CHAIN_DESCRIPTOR_LEN as u32 * chain_count as u32;
        #[allow(clippy::cast_lossless)]
        let atoms = ATOM_WIRE_LEN as u32 * atom_count;
        header + descriptors + atoms
    }

    /// Parses a patch from its wire encoding.
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if `bytes` is too short for
    /// its declared length, a chain descriptor points outside the atom
    /// region, or the parsed atoms fail [`Patch::assemble`]'s checks.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WeaveError> {
        if bytes.len() < HEADER_LEN {
            return Err(WeaveError::MalformedPatch {
                reason: format!("buffer of {} bytes shorter than the header", bytes.len()),
            });
        }

        let length_bytes =
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let chain_count = bytes[4];

        if chain_count == 0 {
            return Err(WeaveError::MalformedPatch {
                reason: "chain count is zero".to_owned(),
            });
        }
        if length_bytes > bytes.len() {
            return Err(WeaveError::MalformedPatch {
                reason: format!(
                    "declared length {length_bytes} exceeds buffer of {} bytes",
                    bytes.len()
                ),
            });
        }

        let descriptors_len = CHAIN_DESCRIPTOR_LEN * chain_count as usize;
        let atom_region_start = HEADER_LEN + descriptors_len;
        if atom_region_start > length_bytes {
            return Err(WeaveError::MalformedPatch {
                reason: "chain descriptors overrun the declared patch length".to_owned(),
            });
        }

        let atom_region = &bytes[atom_region_start..length_bytes];

        let mut chains = Vec::with_capacity(chain_count as usize);
        let mut cursor = HEADER_LEN;
        for _ in 0..chain_count {
            let offset_bytes = u32::from_be_bytes([
                bytes[cursor],
                bytes[cursor + 1],
                bytes[cursor + 2],
                bytes[cursor + 3],
            ]) as usize;
            let len_atoms =
                u16::from_be_bytes([bytes[cursor + 4], bytes[cursor + 5]]) as usize;
            cursor += CHAIN_DESCRIPTOR_LEN;

            let chain_byte_len = len_atoms * ATOM_WIRE_LEN;
            let chain_bytes = atom_region
                .get(offset_bytes..offset_bytes + chain_byte_len)
                .ok_or_else(|| WeaveError::MalformedPatch {
                    reason: "chain descriptor points outside the atom region".to_owned(),
                })?;

            let mut atoms = Vec::with_capacity(len_atoms);
            for i in 0..len_atoms {
                let start = i * ATOM_WIRE_LEN;
                let atom = Atom::read_from(&chain_bytes[start..start + ATOM_WIRE_LEN])
                    .ok_or_else(|| WeaveError::MalformedPatch {
                        reason: "truncated atom in chain region".to_owned(),
                    })?;
                atoms.push(atom);
            }

            chains.push(Chain::new(atoms)?);
        }

        Self::assemble(chains)
    }

    /// Serializes this patch to its wire encoding, writing chains in the
    /// order returned by [`Patch::chains`].
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        #[allow(clippy::cast_possible_truncation)]
        let chain_count = self.chains.len() as u8;
        let total_len = Self::necessary_buffer_length(chain_count, self.length_atoms);

        let mut buf = Vec::with_capacity(total_len as usize);
        buf.extend_from_slice(&total_len.to_be_bytes());
        buf.push(chain_count);

        let mut offset_bytes: u32 = 0;
        for chain in &self.chains {
            #[allow(clippy::cast_possible_truncation)]
            let len_atoms = chain.atoms().len() as u16;
            buf.extend_from_slice(&offset_bytes.to_be_bytes());
            buf.extend_from_slice(&len_atoms.to_be_bytes());
            #[allow(clippy::cast_lossless)]
            let chain_byte_len = ATOM_WIRE_LEN as u32 * u32::from(len_atoms);
            offset_bytes += chain_byte_len;
        }

        for chain in &self.chains {
            for atom in chain.atoms() {
                atom.write_to(&mut buf);
            }
        }

        debug_assert_eq!(buf.len(), total_len as usize);
        buf
    }
}

/// Incrementally assembles a [`Patch`] from typed chains, the in-process
/// counterpart to hand-writing the wire format with `write_patch_header`/
/// `write_chain_descriptor`.
#[derive(Debug, Default)]
pub struct PatchBuilder {
    chains: Vec<Chain>,
}

impl PatchBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chain, inferring its kind from the head atom (see
    /// [`Chain::new`]). The kind-named variants below are equivalent; they
    /// exist so call sites that already know what they're building can say
    /// so.
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if `atoms` is empty or not
    /// internally consistent for its inferred kind.
    pub fn chain(mut self, atoms: Vec<Atom>) -> Result<Self, WeaveError> {
        self.chains.push(Chain::new(atoms)?);
        Ok(self)
    }

    /// Appends an insertion chain (a strand of visible characters).
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if `atoms` is empty, contains
    /// a control character, or its atoms do not form a strand.
    pub fn insertion_chain(self, atoms: Vec<Atom>) -> Result<Self, WeaveError> {
        self.chain(atoms)
    }

    /// Appends a deletion chain (a run of tombstones).
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if `atoms` is empty or mixes
    /// non-tombstone atoms in.
    pub fn deletion_chain(self, atoms: Vec<Atom>) -> Result<Self, WeaveError> {
        self.chain(atoms)
    }

    /// Appends a save-awareness chain.
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if `atoms` is empty or mixes
    /// non-save atoms in.
    pub fn save_awareness_chain(self, atoms: Vec<Atom>) -> Result<Self, WeaveError> {
        self.chain(atoms)
    }

    /// Validates the accumulated chains and produces a finished patch.
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPatch`] if the chains don't share one
    /// yarn or their offsets aren't contiguous.
    pub fn build(self) -> Result<Patch, WeaveError> {
        Patch::assemble(self.chains)
    }
}

/// The outcome of checking whether a patch may be applied against a weft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every predecessor this patch requires is already covered; it may be
    /// applied now.
    Ready,
    /// Some atom in this patch is already covered by the weft; the patch is
    /// a duplicate and should be dropped without modifying the weave.
    Duplicate,
    /// This patch depends on an atom not yet covered by the weft; it should
    /// be enqueued in the waiting set until that id is covered.
    Blocked(AtomId),
}

/// Determines whether `patch` may be applied against `weft` (see
/// [`Readiness`]), replacing the reference implementation's sentinel-`u64`
/// return (`0` for ready, `1` for duplicate, any other value a blocking id)
/// with an explicit three-variant enum.
#[must_use]
pub fn patch_blocking_id(patch: &Patch, weft: &Weft) -> Readiness {
    let yarn = patch.yarn();
    let head_offset = patch.head_offset();

    if weft.get(yarn) + 1 != head_offset {
        let first_id = patch.head_id();
        if weft.covers(first_id) {
            return Readiness::Duplicate;
        }
        return Readiness::Blocked(AtomId::pack(yarn, head_offset - 1));
    }

    for chain in patch.chains() {
        match chain.kind() {
            ChainKind::Insertion => {
                let head = chain.head();
                if !weft.covers(head.pred) {
                    return Readiness::Blocked(head.pred);
                }
            }
            ChainKind::Deletion | ChainKind::SaveAwareness => {
                for atom in chain.atoms() {
                    if !weft.covers(atom.pred) {
                        return Readiness::Blocked(atom.pred);
                    }
                }
            }
        }
    }

    for chain in patch.chains() {
        for atom in chain.atoms() {
            if weft.covers(atom.id) {
                return Readiness::Duplicate;
            }
        }
    }

    Readiness::Ready
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::atom::{CHAR_DEL, CHAR_SAVE};

    fn atom(id: (u32, u32), pred: (u32, u32), char: u32) -> Atom {
        Atom {
            id: AtomId::pack(id.0, id.1),
            pred: AtomId::pack(pred.0, pred.1),
            char,
        }
    }

    fn typing_test_patch() -> Patch {
        PatchBuilder::new()
            .insertion_chain(vec![
                atom((1, 1), (0, 1), 'T' as u32),
                atom((1, 2), (1, 1), 'e' as u32),
                atom((1, 3), (1, 2), 's' as u32),
                atom((1, 4), (1, 3), 't' as u32),
            ])
            .unwrap()
            .build()
            .unwrap()
    }

    // ── 1. wire round-trip preserves chains and header fields ───────────
    #[test]
    fn wire_round_trip() {
        let patch = typing_test_patch();
        let bytes = patch.to_bytes();
        let parsed = Patch::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, patch);
        assert_eq!(parsed.length_atoms(), 4);
        assert_eq!(parsed.yarn(), 1);
        assert_eq!(parsed.head_offset(), 1);
    }

    // ── 2. multi-chain patch: delete + insert ────────────────────────────
    #[test]
    fn delete_and_insert_patch() {
        let patch = PatchBuilder::new()
            .deletion_chain(vec![atom((2, 1), (1, 3), CHAR_DEL)])
            .unwrap()
            .insertion_chain(vec![atom((2, 2), (1, 2), 'x' as u32)])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(patch.length_atoms(), 2);
        assert_eq!(patch.highest_id(), AtomId::pack(2, 2));
    }

    // ── 3. save-awareness chain ───────────────────────────────────────────
    #[test]
    fn save_awareness_patch() {
        let patch = PatchBuilder::new()
            .save_awareness_chain(vec![atom((1, 5), (2, 2), CHAR_SAVE)])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(patch.highest_id(), AtomId::pack(1, 5));
    }

    // ── 4. non-contiguous offsets are rejected ───────────────────────────
    #[test]
    fn non_contiguous_offsets_rejected() {
        let result = PatchBuilder::new()
            .insertion_chain(vec![atom((1, 1), (0, 1), 'a' as u32)])
            .unwrap()
            .insertion_chain(vec![atom((1, 3), (0, 1), 'b' as u32)])
            .unwrap()
            .build();
        assert!(matches!(result, Err(WeaveError::MalformedPatch { .. })));
    }

    // ── 5. cross-yarn patch is rejected ──────────────────────────────────
    #[test]
    fn cross_yarn_patch_rejected() {
        let result = PatchBuilder::new()
            .insertion_chain(vec![atom((1, 1), (0, 1), 'a' as u32)])
            .unwrap()
            .insertion_chain(vec![atom((2, 2), (0, 1), 'b' as u32)])
            .unwrap()
            .build();
        assert!(matches!(result, Err(WeaveError::MalformedPatch { .. })));
    }

    // ── 6. broken strand is rejected ─────────────────────────────────────
    #[test]
    fn broken_strand_rejected() {
        let result = Chain::new(vec![
            atom((1, 1), (0, 1), 'a' as u32),
            atom((1, 2), (1, 9), 'b' as u32),
        ]);
        assert!(matches!(result, Err(WeaveError::MalformedPatch { .. })));
    }

    // ── 7. readiness: ready when the predecessor is already covered ─────
    #[test]
    fn readiness_ready() {
        let patch = typing_test_patch();
        let weft = Weft::new();
        assert_eq!(patch_blocking_id(&patch, &weft), Readiness::Ready);
    }

    // ── 8. readiness: blocked on an uncovered yarn predecessor ───────────
    #[test]
    fn readiness_blocked() {
        let patch = PatchBuilder::new()
            .deletion_chain(vec![atom((2, 1), (1, 3), CHAR_DEL)])
            .unwrap()
            .build()
            .unwrap();
        let weft = Weft::new();
        assert_eq!(
            patch_blocking_id(&patch, &weft),
            Readiness::Blocked(AtomId::pack(1, 3))
        );
    }

    // ── 9. readiness: duplicate when already covered ─────────────────────
    #[test]
    fn readiness_duplicate() {
        let patch = typing_test_patch();
        let mut weft = Weft::new();
        weft.set(1, 4);
        assert_eq!(patch_blocking_id(&patch, &weft), Readiness::Duplicate);
    }

    // ── 10. necessary_buffer_length matches a hand round-trip ────────────
    #[test]
    fn necessary_buffer_length_matches_to_bytes() {
        let patch = typing_test_patch();
        let bytes = patch.to_bytes();
        assert_eq!(
            bytes.len() as u32,
            Patch::necessary_buffer_length(1, 4)
        );
    }
}
