//! `keycraft show` — display one entry's metadata.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `show` command.
pub fn execute(cli: &Cli, id: &str) -> Result<()> {
    let store = open_store(cli)?;
    let entry = store.get(id)?;
    output::print_entry_detail(&entry);
    Ok(())
}
