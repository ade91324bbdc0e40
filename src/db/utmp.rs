//! Session store: the `utmp` table of logged-in sessions per reporting host.

use rusqlite::{params, Connection, Result, Row};
use serde::{Deserialize, Serialize};

/// One login session as reported by a client host.
///
/// On the wire the remote origin is called `host`; it is stored as `rhost`
/// so it cannot be confused with the reporting host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub user: String,
    pub uid: i64,
    #[serde(rename = "host")]
    pub rhost: String,
    pub line: String,
    /// Session start time (unix seconds) as reported by the client
    pub time: i64,
}

/// A stored session row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSession {
    pub host: String,
    pub user: String,
    pub uid: i64,
    pub rhost: String,
    pub line: String,
    pub time: i64,
    /// Server time of the write that created this row
    pub updated: i64,
}

impl StoredSession {
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(StoredSession {
            host: row.get(0)?,
            user: row.get(1)?,
            uid: row.get(2)?,
            rhost: row.get(3)?,
            line: row.get(4)?,
            time: row.get(5)?,
            updated: row.get(6)?,
        })
    }
}

/// Insert a new session row. Fails with a constraint violation if the
/// (host, user, line) identity already exists.
pub fn insert_entry(conn: &Connection, host: &str, entry: &SessionEntry, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO utmp (host, user, uid, rhost, line, time, updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            host,
            entry.user,
            entry.uid,
            entry.rhost,
            entry.line,
            entry.time,
            now
        ],
    )?;
    Ok(())
}

/// Delete the session matching (host, user, line).
///
/// `time` is deliberately not part of the match, so a stale or mismatched
/// start time reported by the client still removes the row.
// TODO: decide whether delete should also match on `time` once clients are
// known to report stable start times.
pub fn delete_entry(conn: &Connection, host: &str, entry: &SessionEntry) -> Result<usize> {
    conn.execute(
        "DELETE FROM utmp WHERE host = ?1 AND user = ?2 AND line = ?3",
        params![host, entry.user, entry.line],
    )
}

/// Delete every session of a host
pub fn delete_host_entries(conn: &Connection, host: &str) -> Result<usize> {
    conn.execute("DELETE FROM utmp WHERE host = ?1", [host])
}

const SELECT_COLUMNS: &str = "SELECT host, user, uid, rhost, line, time, updated FROM utmp";

/// Sessions of one host, ordered by user and line
pub fn list_for_host(conn: &Connection, host: &str) -> Result<Vec<StoredSession>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE host = ?1 ORDER BY user, line",
        SELECT_COLUMNS
    ))?;
    let rows = stmt.query_map([host], StoredSession::from_row)?;
    rows.collect()
}

/// All sessions across the fleet, optionally restricted to one user
pub fn list_sessions(conn: &Connection, user: Option<&str>) -> Result<Vec<StoredSession>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE (?1 IS NULL OR user = ?1) ORDER BY host, user, line",
        SELECT_COLUMNS
    ))?;
    let rows = stmt.query_map([user], StoredSession::from_row)?;
    rows.collect()
}
