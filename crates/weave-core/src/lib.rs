// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]
//! Causal-tree text CRDT engine: atoms, wefts, a linearized weave, and the
//! patches that grow it.
//!
//! An atom is a single edit unit: an id `(yarn, offset)`, a causal
//! predecessor, and a code point. A patch bundles one or more contiguous
//! chains of atoms from a single yarn; applying a patch to a [`Weave`]
//! either splices it into the linearization immediately, defers it until
//! its predecessor arrives, or drops it as a duplicate. [`Weave::scour`]
//! projects the linearization down to its visible text.

mod atom;
mod error;
mod id;
mod memodict;
mod patch;
mod scour;
mod waiting_set;
mod weave;
mod weft;

pub use atom::{Atom, AtomBody, CHAR_DEL, CHAR_END, CHAR_SAVE, CHAR_START};
pub use error::WeaveError;
pub use id::{AtomId, BOOTSTRAP_YARN, END_ID, START_ID};
pub use memodict::Memodict;
pub use patch::{patch_blocking_id, Chain, ChainKind, Patch, PatchBuilder, Readiness};
pub use scour::Scour;
pub use waiting_set::WaitingSet;
pub use weave::Weave;
pub use weft::Weft;
