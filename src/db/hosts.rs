//! Host registry: one row per reporting machine with its last-seen time and address.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

/// A reporting machine as stored in the `hosts` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Host {
    pub host: String,
    /// Unix seconds of the last successful report
    pub last_update: i64,
    /// Network address the last report came from
    pub last_addr: String,
}

/// Host row plus the number of sessions currently stored for it
#[derive(Debug, Clone, Serialize)]
pub struct HostSummary {
    #[serde(flatten)]
    pub host: Host,
    pub session_count: i64,
}

impl Host {
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Host {
            host: row.get(0)?,
            last_update: row.get(1)?,
            last_addr: row.get(2)?,
        })
    }
}

/// Create the host row or refresh its last_update/last_addr
pub fn upsert_host(conn: &Connection, host: &str, now: i64, addr: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO hosts (host, last_update, last_addr) VALUES (?1, ?2, ?3)
         ON CONFLICT(host) DO UPDATE SET
            last_update = excluded.last_update,
            last_addr = excluded.last_addr",
        params![host, now, addr],
    )?;
    Ok(())
}

/// Remove the host row. Returns the number of rows removed (0 or 1).
pub fn delete_host(conn: &Connection, host: &str) -> Result<usize> {
    conn.execute("DELETE FROM hosts WHERE host = ?1", [host])
}

/// Look up a single host
pub fn get_host(conn: &Connection, host: &str) -> Result<Option<Host>> {
    conn.query_row(
        "SELECT host, last_update, last_addr FROM hosts WHERE host = ?1",
        [host],
        Host::from_row,
    )
    .optional()
}

/// All hosts with their session counts, most recently updated first
pub fn list_hosts(conn: &Connection) -> Result<Vec<HostSummary>> {
    let mut stmt = conn.prepare(
        "SELECT h.host, h.last_update, h.last_addr,
                (SELECT COUNT(*) FROM utmp u WHERE u.host = h.host)
         FROM hosts h
         ORDER BY h.last_update DESC, h.host ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(HostSummary {
            host: Host::from_row(row)?,
            session_count: row.get(3)?,
        })
    })?;

    rows.collect()
}
