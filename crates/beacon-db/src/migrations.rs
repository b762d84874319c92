//! Versioned schema migrations.
//!
//! The schema is a numbered sequence of SQL scripts compiled into the
//! binary. `_beacon_migrations` records each applied version; on startup
//! every version above the highest recorded one is applied in order, each
//! in its own transaction together with its bookkeeping row.

use rusqlite::{params, Connection};
use thiserror::Error;

/// One schema version.
#[derive(Debug, Clone, Copy)]
struct SchemaVersion {
    version: i64,
    label: &'static str,
    script: &'static str,
}

const SCHEMA: &[SchemaVersion] = &[
    SchemaVersion {
        version: 0,
        label: "event_log",
        script: include_str!("migrations/000_event_log.sql"),
    },
    SchemaVersion {
        version: 1,
        label: "timeseries",
        script: include_str!("migrations/001_timeseries.sql"),
    },
];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS _beacon_migrations (
    version INTEGER PRIMARY KEY,
    label TEXT NOT NULL,
    applied_at INTEGER NOT NULL
);";

/// Failure while bringing the schema up to date.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The bookkeeping table could not be created or read.
    #[error("cannot read schema version: {0}")]
    Bookkeeping(#[source] rusqlite::Error),

    /// A schema script failed; nothing from it was kept.
    #[error("schema version {version} ({label}) failed: {source}")]
    Script {
        /// Version that failed.
        version: i64,
        /// Its label.
        label: &'static str,
        /// The SQLite error.
        #[source]
        source: rusqlite::Error,
    },
}

/// Applies every schema version newer than the recorded one and returns
/// how many were applied.
///
/// # Errors
///
/// Returns `MigrationError` when the bookkeeping table is unusable or a
/// script fails. Versions applied before the failure stay applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_pending(conn, SCHEMA)
}

fn apply_pending(conn: &Connection, schema: &[SchemaVersion]) -> Result<usize, MigrationError> {
    let current = current_version(conn)?;
    let pending: Vec<&SchemaVersion> = schema
        .iter()
        .filter(|step| current.map_or(true, |v| step.version > v))
        .collect();

    if pending.is_empty() {
        tracing::debug!(version = ?current, "schema is up to date");
        return Ok(0);
    }

    for step in &pending {
        apply(conn, step).map_err(|source| MigrationError::Script {
            version: step.version,
            label: step.label,
            source,
        })?;
        tracing::info!(version = step.version, label = step.label, "applied schema version");
    }
    Ok(pending.len())
}

fn current_version(conn: &Connection) -> Result<Option<i64>, MigrationError> {
    conn.execute_batch(BOOKKEEPING)
        .map_err(MigrationError::Bookkeeping)?;
    conn.query_row("SELECT MAX(version) FROM _beacon_migrations", [], |row| row.get(0))
        .map_err(MigrationError::Bookkeeping)
}

fn apply(conn: &Connection, step: &SchemaVersion) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(step.script)?;
    tx.execute(
        "INSERT INTO _beacon_migrations (version, label, applied_at)
         VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)",
        params![step.version, step.label],
    )?;
    tx.commit()
}
