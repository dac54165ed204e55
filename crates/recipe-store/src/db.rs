//! Database connection management
//!
//! Opens SQLite connections from a `ConnectionString` and applies the
//! per-connection settings it carries.

use crate::connection_string::ConnectionString;
use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open the store named by a connection string and configure it
pub fn open(cs: &ConnectionString) -> Result<Connection> {
    let (target, flags) = cs.open_target();
    let conn = Connection::open_with_flags(&target, flags).map_err(|e| {
        from_rusqlite(e)
            .with_op("open")
            .with_entity(cs.to_string())
    })?;
    configure(&conn, cs)?;
    Ok(conn)
}

/// Open a SQLite database file with default settings
pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let cs = ConnectionString::file(path.as_ref().to_string_lossy().into_owned());
    open(&cs)
}

/// Open a private in-memory database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    open(&ConnectionString::memory())
}

/// Apply connection settings
///
/// Foreign keys and busy timeout come from the connection string. File
/// stores opened for writing switch to WAL; in-memory stores keep their
/// default journal.
pub fn configure(conn: &Connection, cs: &ConnectionString) -> Result<()> {
    if let Some(password) = cs.password() {
        conn.pragma_update(None, "key", password.expose())
            .map_err(from_rusqlite)?;
    }

    conn.pragma_update(None, "foreign_keys", cs.foreign_keys())
        .map_err(from_rusqlite)?;

    conn.busy_timeout(cs.default_timeout())
        .map_err(from_rusqlite)?;

    if !cs.is_memory() && !cs.is_read_only() {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(from_rusqlite)?;
        tracing::debug!(journal_mode = %mode, "journal mode set");
    }

    Ok(())
}
