//! `keycraft add` — store a new API key.

use crate::cli::commands::read_secret;
use crate::cli::output;
use crate::cli::{open_store, vault_dir, Cli, EntryArgs};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(cli: &Cli, meta: EntryArgs, value: Option<String>) -> Result<()> {
    let label = meta.name.clone().unwrap_or_else(|| "new entry".to_string());
    let secret = read_secret(value, &label)?;

    let store = open_store(cli)?;
    let view = store.add(meta.into_fields(secret))?;

    crate::audit::log_audit(&vault_dir(store.path()), "add", Some(&view.id), None);
    output::success(&format!(
        "Added '{}' ({}) as {}  [{}]",
        view.name, view.vendor, view.masked_value, view.id
    ));
    output::tip(&format!("Run `keycraft reveal {}` to copy it later.", view.id));

    Ok(())
}
