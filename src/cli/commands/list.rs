//! `keycraft list` — display all entries with masked keys.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let entries = store.list()?;

    output::info(&format!(
        "{} — {} key(s)",
        store.path().display(),
        entries.len()
    ));
    output::print_entries_table(&entries);

    Ok(())
}
