//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{KeycraftError, Result};
use crate::vault::{CredentialStore, EntryFields, PersistenceLog};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Keycraft CLI: local encrypted store for API keys.
#[derive(Parser)]
#[command(
    name = "keycraft",
    about = "Local encrypted vault for API keys and their metadata",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: from .keycraft.toml, else .keycraft)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,

    /// Vault file name inside the vault directory (default: keys.kcv)
    #[arg(long, global = true)]
    pub vault: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Store a new API key
    Add {
        #[command(flatten)]
        meta: EntryArgs,

        /// Secret value (omit to read from stdin or an interactive prompt)
        #[arg(long)]
        value: Option<String>,
    },

    /// Replace an entry's fields, keeping its id and creation time
    Update {
        /// Entry id
        id: String,

        #[command(flatten)]
        meta: EntryArgs,

        /// New secret value (omit to keep the current one)
        #[arg(long)]
        value: Option<String>,

        /// Prompt for a new secret value
        #[arg(long, conflicts_with = "value")]
        new_secret: bool,
    },

    /// List all entries with masked keys
    List,

    /// Show one entry's metadata
    Show {
        /// Entry id
        id: String,
    },

    /// Copy an entry's secret to the clipboard
    Reveal {
        /// Entry id
        id: String,

        /// Print the secret to stdout instead
        #[arg(long)]
        stdout: bool,
    },

    /// Delete an entry
    Delete {
        /// Entry id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Answer JSON-RPC requests on stdin/stdout, one per line
    Serve,

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show version information
    Version,
}

/// Metadata flags shared by `add` and `update`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct EntryArgs {
    /// Display name (e.g. "OpenAI prod")
    #[arg(long)]
    pub name: Option<String>,

    /// Provider of the key (e.g. OpenAI)
    #[arg(long)]
    pub vendor: Option<String>,

    /// API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Documentation URL
    #[arg(long)]
    pub doc_url: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Usage snippet
    #[arg(long)]
    pub snippet: Option<String>,
}

impl EntryArgs {
    /// Build request fields from the flags. Missing required flags become
    /// empty strings so the store reports them as validation errors.
    pub fn into_fields(self, secret: Zeroizing<String>) -> EntryFields {
        EntryFields {
            name: self.name.unwrap_or_default(),
            vendor: self.vendor.unwrap_or_default(),
            secret_value: secret,
            base_url: self.base_url,
            doc_url: self.doc_url,
            code_snippets: self.snippet,
            tags: self.tags,
            notes: self.notes,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault password from `KEYCRAFT_PASSWORD`, falling back to an
/// interactive prompt.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| KeycraftError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used during `init`).
///
/// Also respects `KEYCRAFT_PASSWORD` for scripted usage.
/// Enforces a minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        if pw.chars().count() < MIN_PASSWORD_LEN {
            return Err(KeycraftError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault password")
                .with_confirmation(
                    "Confirm vault password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| KeycraftError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if password.chars().count() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(password);
    }
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var("KEYCRAFT_PASSWORD")
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Settings for the current directory with CLI overrides applied.
pub fn settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(dir) = &cli.vault_dir {
        settings.vault_dir = dir.clone();
    }
    if let Some(file) = &cli.vault {
        settings.vault_file = file.clone();
    }
    Ok(settings)
}

/// Full path to the vault file, e.g. `<cwd>/.keycraft/keys.kcv`.
pub fn vault_path(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(settings(cli)?.vault_path(&cwd))
}

/// Directory holding the vault file; the audit database lives here too.
pub fn vault_dir(vault_path: &Path) -> PathBuf {
    vault_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Unlock the vault and load every entry.
pub fn open_store(cli: &Cli) -> Result<CredentialStore> {
    let settings = settings(cli)?;
    let path = settings.vault_path(&std::env::current_dir()?);
    if !path.exists() {
        output::tip("Run `keycraft init` to create a vault.");
        return Err(KeycraftError::VaultNotFound(path));
    }

    let password = prompt_password()?;
    let log = PersistenceLog::open(&path, password.as_bytes(), settings.io_timeout())?;
    CredentialStore::open(log)
}
