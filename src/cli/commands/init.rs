//! `keycraft init` — create a new, empty vault.

use std::fs;

use crate::cli::output;
use crate::cli::{prompt_new_password, settings, vault_dir, Cli};
use crate::errors::{KeycraftError, Result};
use crate::vault::PersistenceLog;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = settings(cli)?;
    let path = settings.vault_path(&cwd);
    let dir = vault_dir(&path);

    if path.exists() {
        output::tip("Use `keycraft add` to store keys in the existing vault.");
        return Err(KeycraftError::VaultAlreadyExists(path));
    }

    let password = prompt_new_password()?;

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        output::info(&format!("Created vault directory: {}", dir.display()));
    }

    PersistenceLog::create(
        &path,
        password.as_bytes(),
        &settings.argon2_params(),
        settings.io_timeout(),
    )?;

    crate::audit::log_audit(&dir, "init", None, Some("vault created"));
    output::success(&format!("Vault created at {}", path.display()));
    output::tip("Run `keycraft add --name <NAME> --vendor <VENDOR>` to store a key.");
    output::tip("Run `keycraft list` to see all keys.");

    Ok(())
}
