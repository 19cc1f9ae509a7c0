// SPDX-License-Identifier: Apache-2.0
//! Batch driver for the weave engine.
//!
//! `weave <file>` reads a stream of patches in the text-ingest format (see
//! [`driver`]), applies each to a fresh weave in order, and prints the
//! scoured text to stdout. Exits `0` on success, `1` on a usage error, an
//! unopenable file, or a malformed/invariant-violating patch.

mod driver;

use std::env;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "weave".to_owned());
    let Some(path) = args.next() else {
        tracing::error!("usage: {program} <file>");
        return ExitCode::FAILURE;
    };

    match driver::run(&path) {
        Ok(text) => {
            emit(&text);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// The driver's one sanctioned write to stdout: the scoured text itself,
/// never a diagnostic.
#[allow(clippy::print_stdout)]
fn emit(text: &str) {
    print!("{text}");
}
