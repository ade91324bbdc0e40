//! SQLite schema for rwho-server
//!
//! Two independent tables related only by the `host` string: `hosts` is the
//! registry of reporting machines, `utmp` holds their logged-in sessions.

use rusqlite::{Connection, Result};

/// Initialize the database with required tables
pub fn init_db(conn: &Connection) -> Result<()> {
    // Host registry - one row per reporting machine
    conn.execute(
        "CREATE TABLE IF NOT EXISTS hosts (
            host TEXT PRIMARY KEY,
            last_update INTEGER NOT NULL,
            last_addr TEXT NOT NULL
        )",
        [],
    )?;

    // Session table - one row per (host, user, line)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS utmp (
            host TEXT NOT NULL,
            user TEXT NOT NULL,
            uid INTEGER NOT NULL,
            rhost TEXT NOT NULL,
            line TEXT NOT NULL,
            time INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            PRIMARY KEY (host, user, line)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_utmp_user ON utmp(user)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(init_db(&conn).is_ok());

        let table_count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('hosts', 'utmp')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 2);
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        assert!(init_db(&conn).is_ok());
    }
}
