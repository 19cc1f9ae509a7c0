// SPDX-License-Identifier: Apache-2.0
//! Error types surfaced by patch parsing and application.

use crate::id::AtomId;

/// Errors surfaced by patch parsing and application.
///
/// Out-of-order arrival ([`crate::Readiness::Blocked`]) and duplicate
/// rejection ([`crate::Readiness::Duplicate`]) are not represented here —
/// they are expected outcomes of `apply_patch`, not failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeaveError {
    /// A patch's bytes are internally inconsistent: a declared length that
    /// doesn't match its content, a chain whose atoms aren't contiguous in
    /// offset, a patch spanning more than one yarn, or an input buffer
    /// shorter than its own declared `length_bytes`. The weave is left
    /// unmodified.
    #[error("malformed patch: {reason}")]
    MalformedPatch {
        /// What about the patch was inconsistent.
        reason: String,
    },

    /// The insertion walk failed to place an atom before reaching `END`.
    ///
    /// This is a fatal, non-recoverable condition distinct from
    /// [`WeaveError::MalformedPatch`]: it indicates either a bug in the
    /// applier or a hand-crafted adversarial patch that passed readiness
    /// but violated an invariant the walk depends on. It is not expected to
    /// occur for any patch that passed [`crate::patch::patch_blocking_id`].
    #[error("invariant violation while placing atom near {anchor}: {detail}")]
    InvariantViolation {
        /// The atom near which placement failed.
        anchor: AtomId,
        /// What invariant was violated.
        detail: String,
    },
}
