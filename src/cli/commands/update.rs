//! `keycraft update` — replace an entry's fields.
//!
//! Flags that are not given keep their current value, including the
//! secret unless `--value` or `--new-secret` is passed.

use crate::cli::commands::read_secret;
use crate::cli::output;
use crate::cli::{open_store, vault_dir, Cli, EntryArgs};
use crate::errors::Result;
use crate::vault::MaskedView;

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    id: &str,
    meta: EntryArgs,
    value: Option<String>,
    new_secret: bool,
) -> Result<()> {
    let store = open_store(cli)?;
    let current = store.get(id)?;

    let secret = if value.is_some() || new_secret {
        read_secret(value, &current.name)?
    } else {
        store.reveal(id)?
    };

    let fields = merge(meta, &current).into_fields(secret);
    let view = store.update(id, fields)?;

    crate::audit::log_audit(&vault_dir(store.path()), "update", Some(id), None);
    output::success(&format!("Updated '{}' ({})", view.name, view.id));

    Ok(())
}

/// Fill every flag that was not given from the current entry.
fn merge(meta: EntryArgs, current: &MaskedView) -> EntryArgs {
    EntryArgs {
        name: meta.name.or_else(|| Some(current.name.clone())),
        vendor: meta.vendor.or_else(|| Some(current.vendor.clone())),
        base_url: meta.base_url.or_else(|| current.base_url.clone()),
        doc_url: meta.doc_url.or_else(|| current.doc_url.clone()),
        tags: meta.tags.or_else(|| current.tags.clone()),
        notes: meta.notes.or_else(|| current.notes.clone()),
        snippet: meta.snippet.or_else(|| current.code_snippets.clone()),
    }
}
