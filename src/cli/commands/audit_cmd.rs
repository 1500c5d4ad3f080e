//! `keycraft audit` — display the audit log.
//!
//! Usage:
//!   keycraft audit               # show last 50 entries
//!   keycraft audit --last 20     # show last 20
//!   keycraft audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Duration, Utc};

use crate::cli::Cli;
use crate::errors::{KeycraftError, Result};

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    use crate::audit::AuditLog;
    use crate::cli::{output, vault_dir, vault_path};

    let dir = vault_dir(&vault_path(cli)?);
    let audit = AuditLog::open(&dir)
        .ok_or_else(|| KeycraftError::AuditError("failed to open audit database".into()))?;

    let since_dt = since.map(parse_duration).transpose()?;
    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(_cli: &Cli, _last: usize, _since: Option<&str>) -> Result<()> {
    Err(KeycraftError::AuditError(
        "keycraft was built without the audit-log feature".into(),
    ))
}

/// Parse a relative duration like "7d", "24h" or "30m" into the instant
/// that far in the past.
fn parse_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        KeycraftError::CommandFailed(format!(
            "invalid duration '{input}' — use a form like 7d, 24h or 30m"
        ))
    };

    let split = input.len().checked_sub(1).ok_or_else(invalid)?;
    if !input.is_char_boundary(split) {
        return Err(invalid());
    }
    let (num, unit) = input.split_at(split);
    let num: i64 = num.parse().map_err(|_| invalid())?;
    if num < 0 {
        return Err(invalid());
    }

    let span = match unit {
        "d" => Duration::days(num),
        "h" => Duration::hours(num),
        "m" => Duration::minutes(num),
        _ => return Err(invalid()),
    };
    Ok(Utc::now() - span)
}

#[cfg(feature = "audit-log")]
fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Entry", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.entry_id.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

#[cfg(feature = "audit-log")]
fn colorize_operation(op: &str) -> String {
    use console::style;

    match op {
        "init" | "add" => style(op).green().to_string(),
        "update" => style(op).blue().to_string(),
        "delete" => style(op).red().to_string(),
        "reveal" => style(op).yellow().to_string(),
        _ => op.to_string(),
    }
}
