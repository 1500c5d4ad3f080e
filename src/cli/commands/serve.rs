//! `keycraft serve` — run the JSON-RPC command surface over stdio.
//!
//! stdout carries only responses; diagnostics go to stderr.

use std::io;

use crate::cli::{open_store, vault_dir, Cli};
use crate::errors::Result;
use crate::surface::CommandSurface;

/// Execute the `serve` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let surface = CommandSurface::new(&store).with_audit(vault_dir(store.path()));

    tracing::info!(path = %store.path().display(), "serving on stdio");
    let stdin = io::stdin();
    surface.serve(stdin.lock(), io::stdout().lock())
}
