//! `keycraft reveal` — hand out a raw secret.
//!
//! By default the secret goes to the system clipboard and never touches
//! the terminal; `--stdout` prints it for piping.

use crate::cli::output;
use crate::cli::{open_store, vault_dir, Cli};
use crate::errors::{KeycraftError, Result};

/// Execute the `reveal` command.
pub fn execute(cli: &Cli, id: &str, stdout: bool) -> Result<()> {
    let store = open_store(cli)?;
    let secret = store.reveal(id)?;
    let dir = vault_dir(store.path());

    if stdout {
        println!("{}", secret.as_str());
        crate::audit::log_audit(&dir, "reveal", Some(id), Some("stdout"));
        return Ok(());
    }

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| KeycraftError::ClipboardError(e.to_string()))?;
    clipboard
        .set_text(secret.as_str())
        .map_err(|e| KeycraftError::ClipboardError(e.to_string()))?;

    crate::audit::log_audit(&dir, "reveal", Some(id), Some("clipboard"));
    output::success("Key copied to clipboard.");
    Ok(())
}
