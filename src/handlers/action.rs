//! The four report actions and how each one mutates the host's rows

use super::{payload, RequestContext};
use crate::db::{hosts, utmp};
use crate::error::Result;
use rusqlite::Connection;
use std::fmt;

/// A report action named by the `action` form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Add the reported sessions
    Insert,
    /// Remove the reported sessions
    Delete,
    /// Replace the host's whole session table with the reported one
    Put,
    /// Forget the host and all of its sessions
    Destroy,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Insert, Action::Delete, Action::Put, Action::Destroy];

    /// Look up an action by its wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Delete => "delete",
            Action::Put => "put",
            Action::Destroy => "destroy",
        }
    }

    /// Apply this action for `ctx.host` inside a single transaction.
    ///
    /// The payload is validated before the transaction is opened, so a
    /// payload error never touches storage. Any storage error rolls back
    /// every statement of the batch.
    pub fn apply(self, conn: &mut Connection, ctx: &RequestContext, now: i64) -> Result<()> {
        let host = ctx.host.as_str();
        let payload = ctx.payload.as_deref();

        match self {
            Action::Insert => {
                let entries = payload::decode_non_empty(payload)?;
                let tx = conn.transaction()?;
                for entry in &entries {
                    utmp::insert_entry(&tx, host, entry, now)?;
                }
                hosts::upsert_host(&tx, host, now, &ctx.remote_addr)?;
                tx.commit()?;
            }
            Action::Delete => {
                let entries = payload::decode_non_empty(payload)?;
                let tx = conn.transaction()?;
                for entry in &entries {
                    utmp::delete_entry(&tx, host, entry)?;
                }
                hosts::upsert_host(&tx, host, now, &ctx.remote_addr)?;
                tx.commit()?;
            }
            Action::Put => {
                let entries = payload::decode(payload)?;
                let tx = conn.transaction()?;
                let cleared = utmp::delete_host_entries(&tx, host)?;
                for entry in &entries {
                    utmp::insert_entry(&tx, host, entry, now)?;
                }
                hosts::upsert_host(&tx, host, now, &ctx.remote_addr)?;
                tx.commit()?;
                tracing::debug!(host, cleared, inserted = entries.len(), "replaced session table");
            }
            Action::Destroy => {
                let tx = conn.transaction()?;
                utmp::delete_host_entries(&tx, host)?;
                hosts::delete_host(&tx, host)?;
                tx.commit()?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::error::CoreError;

    const ALICE: &str = r#"[{"user":"alice","uid":1000,"host":"client1","line":"pts/0","time":1000}]"#;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    fn ctx(host: &str, payload: Option<&str>) -> RequestContext {
        RequestContext {
            host: host.to_string(),
            remote_addr: "192.0.2.7".to_string(),
            payload: payload.map(str::to_string),
        }
    }

    fn session_count(conn: &Connection, host: &str) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM utmp WHERE host = ?1", [host], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Action::from_name("insert"), Some(Action::Insert));
        assert_eq!(Action::from_name("destroy"), Some(Action::Destroy));
        assert_eq!(Action::from_name("INSERT"), None);
        assert_eq!(Action::from_name("drop"), None);
        for action in Action::ALL {
            assert_eq!(Action::from_name(&action.to_string()), Some(action));
        }
    }

    #[test]
    fn test_insert_creates_entry_and_host() {
        let mut conn = setup();
        Action::Insert.apply(&mut conn, &ctx("h1", Some(ALICE)), 5000).unwrap();

        let rows = utmp::list_for_host(&conn, "h1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user, "alice");
        assert_eq!(rows[0].uid, 1000);
        assert_eq!(rows[0].rhost, "client1");
        assert_eq!(rows[0].line, "pts/0");
        assert_eq!(rows[0].time, 1000);
        assert_eq!(rows[0].updated, 5000);

        let host = hosts::get_host(&conn, "h1").unwrap().unwrap();
        assert_eq!(host.last_update, 5000);
        assert_eq!(host.last_addr, "192.0.2.7");
    }

    #[test]
    fn test_insert_without_data_touches_nothing() {
        let mut conn = setup();
        for payload in [None, Some("[]"), Some("garbage")] {
            let err = Action::Insert.apply(&mut conn, &ctx("h1", payload), 5000).unwrap_err();
            assert!(err.is_payload_error());
        }
        let err = Action::Delete.apply(&mut conn, &ctx("h1", Some("[]")), 5000).unwrap_err();
        assert!(matches!(err, CoreError::NoData));

        assert!(hosts::get_host(&conn, "h1").unwrap().is_none());
    }

    #[test]
    fn test_put_empty_clears_host() {
        let mut conn = setup();
        let two = r#"[
            {"user":"alice","uid":1000,"host":"client1","line":"pts/0","time":1000},
            {"user":"bob","uid":1001,"host":"","line":"tty1","time":1200}
        ]"#;
        Action::Put.apply(&mut conn, &ctx("h1", Some(two)), 5000).unwrap();
        assert_eq!(session_count(&conn, "h1"), 2);

        Action::Put.apply(&mut conn, &ctx("h1", Some("[]")), 6000).unwrap();
        assert_eq!(session_count(&conn, "h1"), 0);
        assert_eq!(hosts::get_host(&conn, "h1").unwrap().unwrap().last_update, 6000);
    }

    #[test]
    fn test_put_malformed_keeps_existing_rows() {
        let mut conn = setup();
        Action::Put.apply(&mut conn, &ctx("h1", Some(ALICE)), 5000).unwrap();

        let err = Action::Put.apply(&mut conn, &ctx("h1", Some("{oops")), 6000).unwrap_err();
        assert!(matches!(err, CoreError::MalformedPayload(_)));
        assert_eq!(session_count(&conn, "h1"), 1);
    }

    #[test]
    fn test_delete_matches_without_time() {
        let mut conn = setup();
        Action::Insert.apply(&mut conn, &ctx("h1", Some(ALICE)), 5000).unwrap();

        let stale = r#"[{"user":"alice","uid":1000,"host":"client1","line":"pts/0","time":4242}]"#;
        Action::Delete.apply(&mut conn, &ctx("h1", Some(stale)), 6000).unwrap();

        assert_eq!(session_count(&conn, "h1"), 0);
        assert_eq!(hosts::get_host(&conn, "h1").unwrap().unwrap().last_update, 6000);
    }

    #[test]
    fn test_destroy_removes_everything_and_is_idempotent() {
        let mut conn = setup();
        Action::Put.apply(&mut conn, &ctx("h1", Some(ALICE)), 5000).unwrap();
        Action::Put.apply(&mut conn, &ctx("h2", Some(ALICE)), 5000).unwrap();

        Action::Destroy.apply(&mut conn, &ctx("h1", None), 6000).unwrap();
        assert_eq!(session_count(&conn, "h1"), 0);
        assert!(hosts::get_host(&conn, "h1").unwrap().is_none());
        assert_eq!(session_count(&conn, "h2"), 1);

        Action::Destroy.apply(&mut conn, &ctx("h1", None), 7000).unwrap();

        Action::Put.apply(&mut conn, &ctx("h1", Some("[]")), 8000).unwrap();
        let fresh = hosts::get_host(&conn, "h1").unwrap().unwrap();
        assert_eq!(fresh.last_update, 8000);
        assert_eq!(session_count(&conn, "h1"), 0);
    }

    #[test]
    fn test_put_then_insert_never_duplicates() {
        let mut conn = setup();
        Action::Put.apply(&mut conn, &ctx("h1", Some(ALICE)), 5000).unwrap();

        let err = Action::Insert.apply(&mut conn, &ctx("h1", Some(ALICE)), 5001).unwrap_err();
        assert!(matches!(err, CoreError::Database(_)));

        assert_eq!(session_count(&conn, "h1"), 1);
        // The failed batch rolled back, including its host upsert
        assert_eq!(hosts::get_host(&conn, "h1").unwrap().unwrap().last_update, 5000);
    }

    #[test]
    fn test_failed_batch_rolls_back_earlier_inserts() {
        let mut conn = setup();
        let dup = r#"[
            {"user":"bob","uid":1001,"host":"c","line":"tty1","time":1},
            {"user":"bob","uid":1001,"host":"c","line":"tty1","time":2}
        ]"#;
        assert!(Action::Insert.apply(&mut conn, &ctx("h1", Some(dup)), 5000).is_err());
        assert_eq!(session_count(&conn, "h1"), 0);
        assert!(hosts::get_host(&conn, "h1").unwrap().is_none());
    }
}
