//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::MaskedView;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of entries (ID, Name, Vendor, Key, Tags, Updated).
pub fn print_entries_table(entries: &[MaskedView]) {
    if entries.is_empty() {
        info("No keys in this vault yet.");
        tip("Run `keycraft add --name <NAME> --vendor <VENDOR>` to store your first key.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Name", "Vendor", "Key", "Tags", "Updated"]);

    for e in entries {
        table.add_row(vec![
            e.id.clone(),
            e.name.clone(),
            e.vendor.clone(),
            e.masked_value.clone(),
            e.tags.clone().unwrap_or_default(),
            e.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print every field of one entry as a two-column table.
pub fn print_entry_detail(entry: &MaskedView) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let rows = [
        ("ID", entry.id.clone()),
        ("Name", entry.name.clone()),
        ("Vendor", entry.vendor.clone()),
        ("Key", entry.masked_value.clone()),
        ("Base URL", optional(&entry.base_url)),
        ("Docs", optional(&entry.doc_url)),
        ("Tags", optional(&entry.tags)),
        ("Notes", optional(&entry.notes)),
        ("Snippet", optional(&entry.code_snippets)),
        ("Created", entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ("Updated", entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![style(label).bold().to_string(), value]);
    }

    println!("{table}");
}
