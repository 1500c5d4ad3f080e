//! `keycraft version` — display version and enabled features.

use console::style;

use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    let current = env!("CARGO_PKG_VERSION");
    println!("keycraft {current}");

    let audit = if cfg!(feature = "audit-log") {
        "enabled"
    } else {
        "disabled"
    };
    println!("{}", style(format!("audit log: {audit}")).dim());

    Ok(())
}
