//! `keycraft delete` — remove an entry from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, vault_dir, Cli};
use crate::errors::{KeycraftError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let store = open_store(cli)?;
    let entry = store.get(id)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete '{}' ({})?", entry.name, entry.vendor))
            .default(false)
            .interact()
            .map_err(|e| KeycraftError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    store.delete(id)?;

    crate::audit::log_audit(&vault_dir(store.path()), "delete", Some(id), None);
    output::success(&format!("Deleted '{}'", entry.name));

    Ok(())
}
