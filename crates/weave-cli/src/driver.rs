// SPDX-License-Identifier: Apache-2.0
//! Text-ingest driver: reads whitespace-separated integers describing a
//! stream of patches, applies each to a fresh [`Weave`], and scours the
//! result.
//!
//! Wire format (§6 of the design): one block per patch, repeated to EOF —
//! `<chain_count> <len_1> .. <len_C>` followed by `chain_count` chains of
//! atoms, each atom five integers: `<char> <pred_yarn> <pred_offset>
//! <id_yarn> <id_offset>`.

use std::fs;
use std::str::{FromStr, SplitWhitespace};

use anyhow::{bail, Context, Result};
use weave_core::{Atom, AtomId, PatchBuilder, Weave};

/// Reads `path`, applies every patch block it describes, and returns the
/// scoured text of the resulting weave.
///
/// # Errors
/// Returns an error if `path` cannot be read, the token stream is
/// malformed (wrong token count, an unparseable integer, out-of-range
/// chain count), or a well-formed patch fails [`Weave::apply_patch`] with
/// a fatal [`weave_core::WeaveError`].
pub fn run(path: &str) -> Result<String> {
    let contents = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let mut tokens = contents.split_whitespace();
    let mut weave = Weave::new();
    let mut patch_count = 0usize;

    while let Some(chain_count_tok) = tokens.next() {
        let patch = read_patch(chain_count_tok, &mut tokens)
            .with_context(|| format!("malformed patch #{}", patch_count + 1))?;
        weave
            .apply_patch(patch)
            .with_context(|| format!("failed to apply patch #{}", patch_count + 1))?;
        patch_count += 1;
    }

    tracing::info!(patch_count, "processed input file");
    Ok(weave.scour_to_string())
}

fn read_patch(
    chain_count_tok: &str,
    tokens: &mut SplitWhitespace<'_>,
) -> Result<weave_core::Patch> {
    let chain_count: usize = parse_token(chain_count_tok)?;
    if chain_count == 0 || chain_count > 255 {
        bail!("chain count {chain_count} out of range 1..=255");
    }

    let mut lens = Vec::with_capacity(chain_count);
    for _ in 0..chain_count {
        let tok = tokens.next().context("unexpected end of input reading chain length")?;
        lens.push(parse_token::<usize>(tok)?);
    }

    let mut builder = PatchBuilder::new();
    for len in lens {
        let atoms = read_atoms(len, tokens)?;
        builder = builder.chain(atoms).context("chain failed validation")?;
    }

    builder.build().context("patch failed validation")
}

fn read_atoms(len: usize, tokens: &mut SplitWhitespace<'_>) -> Result<Vec<Atom>> {
    let mut atoms = Vec::with_capacity(len);
    for _ in 0..len {
        let char: u32 = parse_next(tokens, "atom char")?;
        let pred_yarn: u32 = parse_next(tokens, "atom pred yarn")?;
        let pred_offset: u32 = parse_next(tokens, "atom pred offset")?;
        let id_yarn: u32 = parse_next(tokens, "atom id yarn")?;
        let id_offset: u32 = parse_next(tokens, "atom id offset")?;
        atoms.push(Atom {
            id: AtomId::pack(id_yarn, id_offset),
            pred: AtomId::pack(pred_yarn, pred_offset),
            char,
        });
    }
    Ok(atoms)
}

fn parse_next<T>(tokens: &mut SplitWhitespace<'_>, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let tok = tokens.next().with_context(|| format!("unexpected end of input reading {what}"))?;
    parse_token(tok)
}

fn parse_token<T>(tok: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    tok.parse::<T>().map_err(|e| anyhow::anyhow!("invalid integer token {tok:?}: {e}"))
}
