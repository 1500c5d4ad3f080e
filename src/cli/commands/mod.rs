//! Command implementations, one module per subcommand.

pub mod add;
pub mod audit_cmd;
pub mod completions;
pub mod delete;
pub mod init;
pub mod list;
pub mod reveal;
pub mod serve;
pub mod show;
pub mod update;
pub mod version;

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::errors::{KeycraftError, Result};

/// Read a secret value from one of three sources: the `--value` flag,
/// piped stdin, or an interactive hidden prompt.
pub(crate) fn read_secret(value: Option<String>, label: &str) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        output::warning("Value provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Enter key for {label}"))
        .interact()
        .map_err(|e| KeycraftError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}
