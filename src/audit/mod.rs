//! Audit log — SQLite-based operation history.
//!
//! Records every vault operation (add, update, delete, reveal, ...) in
//! `<vault_dir>/audit.db`.  Only entry ids and operation names are stored;
//! secret values never reach this table.
//!
//! Logging is best effort: if the database can't be opened or written,
//! the operation itself still succeeds.  Without the `audit-log` feature
//! `log_audit` is a no-op.

use std::path::Path;

#[cfg(feature = "audit-log")]
pub use sqlite::{AuditEntry, AuditLog};

/// Record an operation, ignoring any audit failure.
pub fn log_audit(vault_dir: &Path, operation: &str, entry_id: Option<&str>, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    {
        if let Some(audit) = AuditLog::open(vault_dir) {
            audit.log(operation, entry_id, details);
        }
    }

    #[cfg(not(feature = "audit-log"))]
    let _ = (vault_dir, operation, entry_id, details);
}

#[cfg(feature = "audit-log")]
mod sqlite {
    use std::path::{Path, PathBuf};

    use chrono::{DateTime, Utc};
    use rusqlite::Connection;

    use crate::errors::{KeycraftError, Result};

    /// A single audit log row.
    #[derive(Debug, Clone)]
    pub struct AuditEntry {
        pub id: i64,
        pub timestamp: DateTime<Utc>,
        pub operation: String,
        pub entry_id: Option<String>,
        pub details: Option<String>,
    }

    /// SQLite-backed audit log.
    pub struct AuditLog {
        conn: Connection,
    }

    impl AuditLog {
        /// Open (or create) `<vault_dir>/audit.db`.
        ///
        /// Returns `None` when the database is unusable; callers treat that
        /// as "audit logging unavailable".
        pub fn open(vault_dir: &Path) -> Option<Self> {
            let db_path = Self::db_path(vault_dir);
            let conn = Connection::open(&db_path).ok()?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                let _ = std::fs::set_permissions(&db_path, perms);
            }

            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS audit_log (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp   TEXT NOT NULL,
                    operation   TEXT NOT NULL,
                    entry_id    TEXT,
                    details     TEXT
                );",
            )
            .ok()?;

            Some(Self { conn })
        }

        /// Record an operation. Errors are ignored.
        pub fn log(&self, operation: &str, entry_id: Option<&str>, details: Option<&str>) {
            let now = Utc::now().to_rfc3339();
            if let Err(e) = self.conn.execute(
                "INSERT INTO audit_log (timestamp, operation, entry_id, details)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![now, operation, entry_id, details],
            ) {
                tracing::debug!(error = %e, operation, "audit write skipped");
            }
        }

        /// Most recent entries first, at most `limit`, optionally only those
        /// at or after `since`.
        pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            // RFC 3339 strings in UTC sort chronologically.
            let since = since.map_or_else(String::new, |ts| ts.to_rfc3339());

            let mut stmt = self
                .conn
                .prepare(
                    "SELECT id, timestamp, operation, entry_id, details
                     FROM audit_log
                     WHERE timestamp >= ?1
                     ORDER BY id DESC
                     LIMIT ?2",
                )
                .map_err(|e| KeycraftError::AuditError(format!("query prepare: {e}")))?;

            let rows = stmt
                .query_map(rusqlite::params![since, limit], |row| {
                    let ts: String = row.get(1)?;
                    let timestamp = DateTime::parse_from_rfc3339(&ts)
                        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));
                    Ok(AuditEntry {
                        id: row.get(0)?,
                        timestamp,
                        operation: row.get(2)?,
                        entry_id: row.get(3)?,
                        details: row.get(4)?,
                    })
                })
                .map_err(|e| KeycraftError::AuditError(format!("query exec: {e}")))?;

            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| KeycraftError::AuditError(format!("row parse: {e}")))
        }

        pub fn db_path(vault_dir: &Path) -> PathBuf {
            vault_dir.join("audit.db")
        }
    }

}
