//! Bookkeeping schema.
//!
//! DBC tables themselves are created on demand from meta documents
//! ([`crate::storage::table`]); the only fixed schema is the checksum
//! table that backs change-detected export.

use rusqlite::{Connection, Result};

/// Bookkeeping DDL. One row per exported table; `checksum` holds the
/// i64 bit pattern of the 64-bit content fingerprint.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS export_checksums (
    table_name TEXT PRIMARY KEY,
    checksum INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);
";

/// Apply pragmas and the bookkeeping schema.
///
/// Idempotent: all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
